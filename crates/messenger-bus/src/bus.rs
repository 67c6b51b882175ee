//! # Message Bus
//!
//! The root registry. It owns every action handler, declared event,
//! subscriber list and initial-payload provider in the process, plus the set
//! of namespaces currently held by scoped handles.
//!
//! The `Bus` itself is unrestricted and is meant for the composition root
//! and for tests. Modules only ever see a [`ScopedHandle`](crate::ScopedHandle).
//!
//! ## Locking
//!
//! All registries sit behind `parking_lot::RwLock`; every mutation takes the
//! write lock. Dispatch clones the handler `Arc` (or the subscriber list)
//! under the read lock and releases it before awaiting or invoking user
//! code, so handlers and listeners may call back into the bus.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use messenger_types::{
    ActionDescriptor, ActionName, EventDescriptor, EventName, MessengerError, MessengerResult,
    Namespace, Payload,
};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::broker::HandleBuilder;
use crate::handler::{ActionHandler, DynActionHandler};
use crate::subscriber::{
    Delivery, EventStream, Listener, Selector, SelectorListener, Subscriber, SubscriptionId,
};

/// Function producing the current payload of an event.
pub type InitialPayloadProvider = Arc<dyn Fn() -> Payload + Send + Sync>;

/// Bus-wide policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Reject subscriptions to events nobody declared.
    pub require_event_registration: bool,
}

/// Snapshot of the bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub actions_called: u64,
    pub action_failures: u64,
    pub events_published: u64,
    pub deliveries: u64,
    pub capability_denials: u64,
    pub live_handles: u64,
}

#[derive(Default)]
struct Counters {
    actions_called: AtomicU64,
    action_failures: AtomicU64,
    events_published: AtomicU64,
    deliveries: AtomicU64,
    capability_denials: AtomicU64,
}

#[derive(Default)]
struct EventRegistry {
    declared: HashSet<String>,
    initial_payloads: HashMap<String, InitialPayloadProvider>,
    subscribers: HashMap<String, Vec<Arc<Subscriber>>>,
    /// Subscription id to event name.
    index: HashMap<SubscriptionId, String>,
}

impl EventRegistry {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(event) = self.index.remove(&id) else {
            return false;
        };
        if let Some(list) = self.subscribers.get_mut(&event) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                self.subscribers.remove(&event);
            }
        }
        true
    }
}

/// Shared state behind a `Bus`. Handles keep a `Weak` to it.
pub(crate) struct BusInner {
    config: BusConfig,
    actions: RwLock<HashMap<String, DynActionHandler>>,
    events: RwLock<EventRegistry>,
    namespaces: Mutex<HashSet<String>>,
    next_subscription: AtomicU64,
    counters: Counters,
}

impl BusInner {
    fn new(config: BusConfig) -> Self {
        Self {
            config,
            actions: RwLock::new(HashMap::new()),
            events: RwLock::new(EventRegistry::default()),
            namespaces: Mutex::new(HashSet::new()),
            next_subscription: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    pub(crate) fn register_action(&self, name: &str, handler: DynActionHandler) -> MessengerResult<()> {
        ActionName::new(name)?;
        let mut actions = self.actions.write();
        if actions.contains_key(name) {
            return Err(MessengerError::DuplicateRegistration {
                action: name.to_string(),
            });
        }
        actions.insert(name.to_string(), handler);
        debug!(action = name, "Action registered");
        Ok(())
    }

    pub(crate) fn unregister_action(&self, name: &str) -> bool {
        let removed = self.actions.write().remove(name).is_some();
        if removed {
            debug!(action = name, "Action unregistered");
        }
        removed
    }

    pub(crate) fn is_action_registered(&self, name: &str) -> bool {
        self.actions.read().contains_key(name)
    }

    pub(crate) async fn call_action(&self, action: &str, args: Payload) -> MessengerResult<Payload> {
        let handler = self.actions.read().get(action).cloned();
        let Some(handler) = handler else {
            self.counters.action_failures.fetch_add(1, Ordering::Relaxed);
            return Err(MessengerError::UnknownAction {
                action: action.to_string(),
            });
        };

        self.counters.actions_called.fetch_add(1, Ordering::Relaxed);
        debug!(action, "Dispatching action");

        handler.handle(args).await.map_err(|e| {
            self.counters.action_failures.fetch_add(1, Ordering::Relaxed);
            debug!(action, error = %e, "Action handler failed");
            MessengerError::Handler(e)
        })
    }

    pub(crate) fn register_event(&self, name: &str) -> MessengerResult<()> {
        EventName::new(name)?;
        if self.events.write().declared.insert(name.to_string()) {
            debug!(event = name, "Event declared");
        }
        Ok(())
    }

    pub(crate) fn register_initial_event_payload(
        &self,
        name: &str,
        provider: InitialPayloadProvider,
    ) -> MessengerResult<()> {
        EventName::new(name)?;
        let mut events = self.events.write();
        events.declared.insert(name.to_string());
        events.initial_payloads.insert(name.to_string(), provider);
        debug!(event = name, "Initial event payload registered");
        Ok(())
    }

    pub(crate) fn publish(&self, event: &str, payload: &Payload) -> usize {
        self.counters.events_published.fetch_add(1, Ordering::Relaxed);

        // Snapshot: listeners may (un)subscribe while we deliver.
        let subscribers = self
            .events
            .read()
            .subscribers
            .get(event)
            .cloned()
            .unwrap_or_default();

        if subscribers.is_empty() {
            debug!(event, "Event published with no subscribers");
            return 0;
        }

        let mut notified = 0;
        for subscriber in &subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.deliver(payload))) {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(_) => warn!(
                    event,
                    subscription = %subscriber.id,
                    "Event listener panicked; remaining listeners still notified"
                ),
            }
        }

        self.counters
            .deliveries
            .fetch_add(notified as u64, Ordering::Relaxed);
        debug!(event, listeners = notified, "Event published");
        notified
    }

    pub(crate) fn subscribe(&self, event: &str, delivery: Delivery) -> MessengerResult<SubscriptionId> {
        EventName::new(event)?;
        let mut events = self.events.write();
        if self.config.require_event_registration && !events.declared.contains(event) {
            return Err(MessengerError::UnknownEvent {
                event: event.to_string(),
            });
        }

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        events
            .subscribers
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(Subscriber::new(id, delivery)));
        events.index.insert(id, event.to_string());

        debug!(event, subscription = %id, "Subscribed");
        Ok(id)
    }

    pub(crate) fn subscribe_with_selector(
        &self,
        event: &str,
        selector: Selector,
        listener: SelectorListener,
    ) -> MessengerResult<SubscriptionId> {
        let provider = self.events.read().initial_payloads.get(event).cloned();
        // Provider runs without any lock held.
        let seed = provider.map(|provide| selector(&provide()));

        self.subscribe(
            event,
            Delivery::Selected {
                selector,
                listener,
                previous: Mutex::new(seed),
            },
        )
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> MessengerResult<()> {
        if self.events.write().remove(id) {
            debug!(subscription = %id, "Unsubscribed");
            Ok(())
        } else {
            Err(MessengerError::UnknownSubscription { id: id.0 })
        }
    }

    /// Drop ids from `ids` that no longer name a live subscription.
    pub(crate) fn retain_live(&self, ids: &mut Vec<SubscriptionId>) {
        let events = self.events.read();
        ids.retain(|id| events.index.contains_key(id));
    }

    pub(crate) fn clear_event_subscriptions(&self, event: &str) -> usize {
        let mut events = self.events.write();
        let Some(list) = events.subscribers.remove(event) else {
            return 0;
        };
        for subscriber in &list {
            events.index.remove(&subscriber.id);
        }
        debug!(event, removed = list.len(), "Event subscriptions cleared");
        list.len()
    }

    pub(crate) fn subscriber_count(&self, event: &str) -> usize {
        self.events.read().subscribers.get(event).map_or(0, Vec::len)
    }

    pub(crate) fn claim_namespace(&self, namespace: &Namespace) -> MessengerResult<()> {
        if self.namespaces.lock().insert(namespace.as_str().to_string()) {
            Ok(())
        } else {
            Err(MessengerError::NamespaceCollision {
                namespace: namespace.as_str().to_string(),
            })
        }
    }

    pub(crate) fn release_namespace(&self, namespace: &str) {
        self.namespaces.lock().remove(namespace);
    }

    pub(crate) fn record_denial(&self) {
        self.counters.capability_denials.fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> BusStats {
        BusStats {
            actions_called: self.counters.actions_called.load(Ordering::Relaxed),
            action_failures: self.counters.action_failures.load(Ordering::Relaxed),
            events_published: self.counters.events_published.load(Ordering::Relaxed),
            deliveries: self.counters.deliveries.load(Ordering::Relaxed),
            capability_denials: self.counters.capability_denials.load(Ordering::Relaxed),
            live_handles: self.namespaces.lock().len() as u64,
        }
    }
}

/// Root registry for actions and events.
///
/// Not `Clone`: there is exactly one owner, normally the composition root.
/// Handles created from it hold only a weak reference and start failing with
/// `BusUnavailable` once it is dropped.
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// Bus with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner::new(config)),
        }
    }

    #[must_use]
    pub fn config(&self) -> BusConfig {
        self.inner.config
    }

    pub(crate) fn downgrade(&self) -> Weak<BusInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &BusInner {
        &self.inner
    }

    /// Start building a scoped handle for `namespace`.
    pub fn handle_builder(&self, namespace: &str) -> HandleBuilder<'_> {
        HandleBuilder::new(self, namespace)
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Register the handler for an action.
    ///
    /// # Errors
    ///
    /// `InvalidName` for a malformed name, `DuplicateRegistration` if a
    /// handler is already present.
    pub fn register_action<H>(&self, name: &str, handler: H) -> MessengerResult<()>
    where
        H: ActionHandler + 'static,
    {
        self.inner.register_action(name, Arc::new(handler))
    }

    /// Register a handler taking and returning the descriptor's types.
    ///
    /// # Errors
    ///
    /// As [`Bus::register_action`].
    pub fn register_typed<A, F, Fut>(&self, handler: F) -> MessengerResult<()>
    where
        A: ActionDescriptor,
        F: Fn(A::Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<A::Response>> + Send + 'static,
    {
        self.inner.register_action(A::NAME, typed_handler::<A, F, Fut>(handler))
    }

    /// Remove an action handler. Returns whether one was registered.
    pub fn unregister_action(&self, name: &str) -> bool {
        self.inner.unregister_action(name)
    }

    #[must_use]
    pub fn is_action_registered(&self, name: &str) -> bool {
        self.inner.is_action_registered(name)
    }

    /// Invoke an action.
    ///
    /// # Errors
    ///
    /// `UnknownAction` if nothing is registered, `Handler` with the handler's
    /// own error if it fails.
    pub async fn call_action(&self, name: &str, args: Payload) -> MessengerResult<Payload> {
        self.inner.call_action(name, args).await
    }

    /// Invoke an action through its typed descriptor.
    ///
    /// # Errors
    ///
    /// As [`Bus::call_action`], plus `PayloadCodec` on conversion failure.
    pub async fn call_typed<A: ActionDescriptor>(&self, request: A::Request) -> MessengerResult<A::Response> {
        let args = encode(A::NAME, &request)?;
        let response = self.inner.call_action(A::NAME, args).await?;
        decode(A::NAME, response)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Declare an event. Idempotent.
    ///
    /// # Errors
    ///
    /// `InvalidName` for a malformed name.
    pub fn register_event(&self, name: &str) -> MessengerResult<()> {
        self.inner.register_event(name)
    }

    /// Declare an event together with a provider of its current payload.
    ///
    /// # Errors
    ///
    /// `InvalidName` for a malformed name.
    pub fn register_initial_event_payload<F>(&self, name: &str, provider: F) -> MessengerResult<()>
    where
        F: Fn() -> Payload + Send + Sync + 'static,
    {
        self.inner.register_initial_event_payload(name, Arc::new(provider))
    }

    /// Deliver a payload to every subscriber of `name`, in subscription order.
    ///
    /// Returns how many listeners were notified.
    pub fn publish_event(&self, name: &str, payload: Payload) -> usize {
        self.inner.publish(name, &payload)
    }

    /// Publish through a typed descriptor.
    ///
    /// # Errors
    ///
    /// `PayloadCodec` if the payload does not serialize.
    pub fn publish_typed<E: EventDescriptor>(&self, payload: &E::Payload) -> MessengerResult<usize> {
        let payload = encode(E::NAME, payload)?;
        Ok(self.inner.publish(E::NAME, &payload))
    }

    /// Subscribe a listener to every payload of `name`.
    ///
    /// # Errors
    ///
    /// `InvalidName`, or `UnknownEvent` when the bus requires declaration.
    pub fn subscribe<F>(&self, name: &str, listener: F) -> MessengerResult<SubscriptionId>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.subscribe(name, Delivery::Plain(listener))
    }

    /// Subscribe to changes of a projection of the payload.
    ///
    /// # Errors
    ///
    /// As [`Bus::subscribe`].
    pub fn subscribe_with_selector<S, F>(&self, name: &str, selector: S, listener: F) -> MessengerResult<SubscriptionId>
    where
        S: Fn(&Payload) -> Payload + Send + Sync + 'static,
        F: Fn(&Payload, Option<&Payload>) + Send + Sync + 'static,
    {
        self.inner
            .subscribe_with_selector(name, Arc::new(selector), Arc::new(listener))
    }

    /// Subscribe through a channel-backed stream.
    ///
    /// # Errors
    ///
    /// As [`Bus::subscribe`].
    pub fn subscribe_stream(&self, name: &str) -> MessengerResult<EventStream> {
        stream_subscription(&self.inner, self.downgrade(), name)
    }

    /// # Errors
    ///
    /// `UnknownSubscription` if the id is not live.
    pub fn unsubscribe(&self, id: SubscriptionId) -> MessengerResult<()> {
        self.inner.unsubscribe(id)
    }

    /// Drop every subscriber of one event. Returns how many were removed.
    pub fn clear_event_subscriptions(&self, name: &str) -> usize {
        self.inner.clear_event_subscriptions(name)
    }

    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner.subscriber_count(name)
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    /// Namespaces currently held by live handles, sorted.
    #[must_use]
    pub fn live_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.inner.namespaces.lock().iter().cloned().collect();
        namespaces.sort();
        namespaces
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        self.inner.stats()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("config", &self.inner.config)
            .field("live_namespaces", &self.live_namespaces())
            .finish_non_exhaustive()
    }
}

pub(crate) fn stream_subscription(
    inner: &BusInner,
    weak: Weak<BusInner>,
    name: &str,
) -> MessengerResult<EventStream> {
    let (sender, receiver) = EventStream::channel();
    let listener: Listener = Arc::new(move |payload: &Payload| {
        // Receiver gone: the stream is being dropped and will unsubscribe.
        let _ = sender.send(payload.clone());
    });
    let id = inner.subscribe(name, Delivery::Plain(listener))?;
    Ok(EventStream::new(name.to_string(), id, receiver, weak))
}

pub(crate) fn typed_handler<A, F, Fut>(handler: F) -> DynActionHandler
where
    A: ActionDescriptor,
    F: Fn(A::Request) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<A::Response>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |args: Payload| {
        let handler = Arc::clone(&handler);
        async move {
            let request: A::Request = decode(A::NAME, args)?;
            let response = (*handler)(request).await?;
            let payload = encode(A::NAME, &response)?;
            Ok::<_, anyhow::Error>(payload)
        }
    })
}

pub(crate) fn encode<T: Serialize + ?Sized>(name: &str, value: &T) -> MessengerResult<Payload> {
    serde_json::to_value(value).map_err(|e| MessengerError::PayloadCodec {
        name: name.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(name: &str, payload: Payload) -> MessengerResult<T> {
    serde_json::from_value(payload).map_err(|e| MessengerError::PayloadCodec {
        name: name.to_string(),
        message: e.to_string(),
    })
}
