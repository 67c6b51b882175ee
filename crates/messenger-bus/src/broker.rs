//! # Capability Broker
//!
//! Hands out [`ScopedHandle`]s: the only view of the bus a module gets.
//!
//! A handle carries its module's namespace and two frozen allow-lists. It may
//! register actions and publish events under its own namespace, and call or
//! subscribe to foreign names only if they are listed. Everything a handle
//! registers or subscribes is undone when it is dropped.
//!
//! ```rust,ignore
//! let messenger = bus
//!     .handle_builder("RewardsDataService")
//!     .delegate(Delegation::actions(&["PreferencesController:getState"]))
//!     .build()?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use messenger_types::{
    ActionDescriptor, Capabilities, Delegation, EventDescriptor, MessengerError, MessengerResult,
    Namespace, Payload,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::bus::{decode, encode, stream_subscription, typed_handler, Bus, BusInner};
use crate::handler::ActionHandler;
use crate::subscriber::{Delivery, EventStream, Listener, SubscriptionId};

/// Create a handle with fixed allow-lists in one step.
///
/// # Errors
///
/// `InvalidName` for a malformed namespace or allow-list entry,
/// `NamespaceCollision` if a live handle already holds `namespace`.
pub fn create_scoped_handle(
    bus: &Bus,
    namespace: &str,
    allowed_actions: &[&str],
    allowed_events: &[&str],
) -> MessengerResult<ScopedHandle> {
    bus.handle_builder(namespace)
        .delegate(Delegation::new(allowed_actions, allowed_events))
        .build()
}

/// Pending handle that accumulates delegations.
///
/// Grants are merged by union; the allow-lists freeze at [`build`](Self::build).
/// The first invalid grant is remembered and reported by `build`.
#[must_use = "a handle builder does nothing until built"]
pub struct HandleBuilder<'a> {
    bus: &'a Bus,
    namespace: String,
    capabilities: Capabilities,
    error: Option<MessengerError>,
}

impl<'a> HandleBuilder<'a> {
    pub(crate) fn new(bus: &'a Bus, namespace: &str) -> Self {
        Self {
            bus,
            namespace: namespace.to_string(),
            capabilities: Capabilities::none(),
            error: None,
        }
    }

    /// Merge a grant into the pending allow-lists.
    pub fn delegate(mut self, delegation: Delegation) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.capabilities.grant(&delegation) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn allow_actions(self, actions: &[&str]) -> Self {
        self.delegate(Delegation::actions(actions))
    }

    pub fn allow_events(self, events: &[&str]) -> Self {
        self.delegate(Delegation::events(events))
    }

    /// Freeze the allow-lists and claim the namespace.
    ///
    /// Nothing else on the bus changes: no actions are registered and no
    /// subscriptions are made.
    ///
    /// # Errors
    ///
    /// The first invalid delegation, `InvalidName` for the namespace, or
    /// `NamespaceCollision`.
    pub fn build(self) -> MessengerResult<ScopedHandle> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let namespace = Namespace::new(self.namespace)?;
        self.bus.inner().claim_namespace(&namespace)?;

        debug!(
            namespace = %namespace,
            actions = self.capabilities.action_count(),
            events = self.capabilities.event_count(),
            "Scoped messenger created"
        );

        Ok(ScopedHandle {
            namespace,
            capabilities: self.capabilities,
            bus: self.bus.downgrade(),
            registered: Mutex::new(Vec::new()),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

/// A module's restricted view of the bus.
pub struct ScopedHandle {
    namespace: Namespace,
    capabilities: Capabilities,
    bus: Weak<BusInner>,
    /// Actions registered through this handle.
    registered: Mutex<Vec<String>>,
    /// Live subscriptions created through this handle. Shared with the
    /// handle's streams, which remove their own id on drop.
    subscriptions: Arc<Mutex<Vec<SubscriptionId>>>,
}

impl ScopedHandle {
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The frozen allow-lists.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Actions this handle has registered and not yet removed.
    #[must_use]
    pub fn registered_actions(&self) -> Vec<String> {
        self.registered.lock().clone()
    }

    fn bus(&self) -> MessengerResult<Arc<BusInner>> {
        self.bus.upgrade().ok_or(MessengerError::BusUnavailable)
    }

    fn ensure_owned(&self, name: &str) -> MessengerResult<()> {
        if self.namespace.owns(name) {
            return Ok(());
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.record_denial();
        }
        warn!(namespace = %self.namespace, name, "Foreign namespace rejected");
        Err(MessengerError::NamespaceViolation {
            namespace: self.namespace.to_string(),
            name: name.to_string(),
        })
    }

    fn ensure_action_allowed(&self, action: &str) -> MessengerResult<()> {
        if self.capabilities.allows_action(action) {
            return Ok(());
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.record_denial();
        }
        warn!(namespace = %self.namespace, action, "Action call denied");
        Err(MessengerError::ActionNotAllowed {
            namespace: self.namespace.to_string(),
            action: action.to_string(),
        })
    }

    fn ensure_event_allowed(&self, event: &str) -> MessengerResult<()> {
        if self.capabilities.allows_event(event) {
            return Ok(());
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.record_denial();
        }
        warn!(namespace = %self.namespace, event, "Event subscription denied");
        Err(MessengerError::EventNotAllowed {
            namespace: self.namespace.to_string(),
            event: event.to_string(),
        })
    }

    // =========================================================================
    // FOREIGN ACCESS
    // =========================================================================

    /// Call an allowed action.
    ///
    /// # Errors
    ///
    /// `ActionNotAllowed`, `BusUnavailable`, or whatever the bus returns.
    pub async fn call(&self, action: &str, args: Payload) -> MessengerResult<Payload> {
        self.ensure_action_allowed(action)?;
        let bus = self.bus()?;
        bus.call_action(action, args).await
    }

    /// Call an allowed action through its typed descriptor.
    ///
    /// # Errors
    ///
    /// As [`ScopedHandle::call`], plus `PayloadCodec`.
    pub async fn call_typed<A: ActionDescriptor>(&self, request: A::Request) -> MessengerResult<A::Response> {
        self.ensure_action_allowed(A::NAME)?;
        let bus = self.bus()?;
        let args = encode(A::NAME, &request)?;
        let response = bus.call_action(A::NAME, args).await?;
        decode(A::NAME, response)
    }

    /// Subscribe to an allowed event.
    ///
    /// # Errors
    ///
    /// `EventNotAllowed`, `BusUnavailable`, or `UnknownEvent` on a strict bus.
    pub fn subscribe<F>(&self, event: &str, listener: F) -> MessengerResult<SubscriptionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.ensure_event_allowed(event)?;
        let listener: Listener = Arc::new(listener);
        let bus = self.bus()?;
        let id = bus.subscribe(event, Delivery::Plain(listener))?;
        self.track(&bus, id);
        Ok(id)
    }

    /// Subscribe to changes of a projection of an allowed event.
    ///
    /// # Errors
    ///
    /// As [`ScopedHandle::subscribe`].
    pub fn subscribe_with_selector<S, F>(&self, event: &str, selector: S, listener: F) -> MessengerResult<SubscriptionId>
    where
        S: Fn(&Payload) -> Payload + Send + Sync + 'static,
        F: Fn(&Payload, Option<&Payload>) + Send + Sync + 'static,
    {
        self.ensure_event_allowed(event)?;
        let bus = self.bus()?;
        let id = bus.subscribe_with_selector(event, Arc::new(selector), Arc::new(listener))?;
        self.track(&bus, id);
        Ok(id)
    }

    /// Subscribe to an allowed event through a stream.
    ///
    /// # Errors
    ///
    /// As [`ScopedHandle::subscribe`].
    pub fn subscribe_stream(&self, event: &str) -> MessengerResult<EventStream> {
        self.ensure_event_allowed(event)?;
        let bus = self.bus()?;
        let stream = stream_subscription(&bus, self.bus.clone(), event)?
            .owned_by(Arc::downgrade(&self.subscriptions));
        self.track(&bus, stream.id());
        Ok(stream)
    }

    /// Number of live subscriptions this handle created.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        if let Ok(bus) = self.bus() {
            bus.retain_live(&mut subscriptions);
        }
        subscriptions.len()
    }

    /// Record a new subscription, forgetting ones the bus already removed.
    fn track(&self, bus: &BusInner, id: SubscriptionId) {
        let mut subscriptions = self.subscriptions.lock();
        bus.retain_live(&mut subscriptions);
        subscriptions.push(id);
    }

    /// Remove a subscription made through this handle.
    ///
    /// # Errors
    ///
    /// `UnknownSubscription` for ids this handle did not create (or already
    /// removed), `BusUnavailable`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> MessengerResult<()> {
        {
            let mut subscriptions = self.subscriptions.lock();
            let Some(position) = subscriptions.iter().position(|s| *s == id) else {
                return Err(MessengerError::UnknownSubscription { id: id.as_u64() });
            };
            subscriptions.remove(position);
        }
        self.bus()?.unsubscribe(id)
    }

    // =========================================================================
    // OWN NAMESPACE
    // =========================================================================

    /// Register a handler for one of this module's actions.
    ///
    /// # Errors
    ///
    /// `NamespaceViolation`, `BusUnavailable`, `InvalidName`,
    /// `DuplicateRegistration`.
    pub fn register_action<H>(&self, name: &str, handler: H) -> MessengerResult<()>
    where
        H: ActionHandler + 'static,
    {
        self.ensure_owned(name)?;
        self.bus()?.register_action(name, Arc::new(handler))?;
        self.registered.lock().push(name.to_string());
        Ok(())
    }

    /// Register a typed handler for one of this module's actions.
    ///
    /// # Errors
    ///
    /// As [`ScopedHandle::register_action`].
    pub fn register_typed<A, F, Fut>(&self, handler: F) -> MessengerResult<()>
    where
        A: ActionDescriptor,
        F: Fn(A::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<A::Response>> + Send + 'static,
    {
        self.ensure_owned(A::NAME)?;
        self.bus()?
            .register_action(A::NAME, typed_handler::<A, F, Fut>(handler))?;
        self.registered.lock().push(A::NAME.to_string());
        Ok(())
    }

    /// Remove one of this module's actions. Returns whether it was registered.
    ///
    /// # Errors
    ///
    /// `NamespaceViolation`, `BusUnavailable`.
    pub fn unregister_action(&self, name: &str) -> MessengerResult<bool> {
        self.ensure_owned(name)?;
        let bus = self.bus()?;
        self.registered.lock().retain(|a| a != name);
        Ok(bus.unregister_action(name))
    }

    /// Declare one of this module's events.
    ///
    /// # Errors
    ///
    /// `NamespaceViolation`, `BusUnavailable`, `InvalidName`.
    pub fn register_event(&self, name: &str) -> MessengerResult<()> {
        self.ensure_owned(name)?;
        self.bus()?.register_event(name)
    }

    /// Provide the current payload of one of this module's events.
    ///
    /// # Errors
    ///
    /// `NamespaceViolation`, `BusUnavailable`, `InvalidName`.
    pub fn register_initial_event_payload<F>(&self, name: &str, provider: F) -> MessengerResult<()>
    where
        F: Fn() -> Payload + Send + Sync + 'static,
    {
        self.ensure_owned(name)?;
        self.bus()?.register_initial_event_payload(name, Arc::new(provider))
    }

    /// Publish one of this module's events. Returns listeners notified.
    ///
    /// # Errors
    ///
    /// `NamespaceViolation`, `BusUnavailable`.
    pub fn publish(&self, event: &str, payload: Payload) -> MessengerResult<usize> {
        self.ensure_owned(event)?;
        Ok(self.bus()?.publish(event, &payload))
    }

    /// Publish through a typed descriptor.
    ///
    /// # Errors
    ///
    /// As [`ScopedHandle::publish`], plus `PayloadCodec`.
    pub fn publish_typed<E: EventDescriptor>(&self, payload: &E::Payload) -> MessengerResult<usize> {
        self.ensure_owned(E::NAME)?;
        let bus = self.bus()?;
        let payload = encode(E::NAME, payload)?;
        Ok(bus.publish(E::NAME, &payload))
    }
}

impl fmt::Debug for ScopedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedHandle")
            .field("namespace", &self.namespace)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        for action in self.registered.get_mut().drain(..) {
            bus.unregister_action(&action);
        }
        let subscriptions: Vec<_> = self.subscriptions.lock().drain(..).collect();
        for id in subscriptions {
            // Streams may have removed themselves already.
            let _ = bus.unsubscribe(id);
        }
        bus.release_namespace(self.namespace.as_str());
        debug!(namespace = %self.namespace, "Scoped messenger released");
    }
}
