//! # Capabilities
//!
//! The allow-lists that define a module's trust boundary.
//!
//! A module may call an action, or subscribe to an event, only if its name
//! appears here. Lists are built from literals in wiring code and validated
//! for shape when granted; whether the named action or event exists on the
//! bus is deliberately not checked, because modules register in any order.
//!
//! ## Delegation
//!
//! Grants arrive as `Delegation`s. Several delegations to the same pending
//! messenger are merged by union: a later grant never narrows an earlier one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::descriptor::{ActionDescriptor, ActionName, EventDescriptor, EventName};
use crate::errors::MessengerResult;

/// One grant of foreign actions and events, as written in wiring code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delegation {
    actions: Vec<String>,
    events: Vec<String>,
}

impl Delegation {
    /// Grant from literal name lists.
    #[must_use]
    pub fn new(actions: &[&str], events: &[&str]) -> Self {
        Self {
            actions: actions.iter().map(|s| (*s).to_string()).collect(),
            events: events.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Grant only actions.
    #[must_use]
    pub fn actions(actions: &[&str]) -> Self {
        Self::new(actions, &[])
    }

    /// Grant only events.
    #[must_use]
    pub fn events(events: &[&str]) -> Self {
        Self::new(&[], events)
    }

    /// Add a typed action to the grant.
    #[must_use]
    pub fn with_action<A: ActionDescriptor>(mut self) -> Self {
        self.actions.push(A::NAME.to_string());
        self
    }

    /// Add a typed event to the grant.
    #[must_use]
    pub fn with_event<E: EventDescriptor>(mut self) -> Self {
        self.events.push(E::NAME.to_string());
        self
    }
}

/// Frozen allow-lists of one scoped messenger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    actions: BTreeSet<ActionName>,
    events: BTreeSet<EventName>,
}

impl Capabilities {
    /// Empty allow-lists: the module may only use its own namespace.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from literal name lists.
    ///
    /// # Errors
    ///
    /// `InvalidName` for the first malformed entry.
    pub fn from_lists(actions: &[&str], events: &[&str]) -> MessengerResult<Self> {
        let mut capabilities = Self::none();
        capabilities.grant(&Delegation::new(actions, events))?;
        Ok(capabilities)
    }

    /// Merge a delegation into these allow-lists (set union).
    ///
    /// Validation happens before anything is merged, so a failed grant leaves
    /// the capabilities unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidName` for the first malformed entry.
    pub fn grant(&mut self, delegation: &Delegation) -> MessengerResult<()> {
        let actions = delegation
            .actions
            .iter()
            .map(|name| ActionName::new(name.as_str()))
            .collect::<MessengerResult<Vec<_>>>()?;
        let events = delegation
            .events
            .iter()
            .map(|name| EventName::new(name.as_str()))
            .collect::<MessengerResult<Vec<_>>>()?;

        self.actions.extend(actions);
        self.events.extend(events);
        Ok(())
    }

    /// Exact membership test on the action allow-list.
    #[must_use]
    pub fn allows_action(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// Exact membership test on the event allow-list.
    #[must_use]
    pub fn allows_event(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionName> {
        self.actions.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventName> {
        self.events.iter()
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.events.is_empty()
    }

    /// Distinct foreign namespaces this module depends on.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.actions
            .iter()
            .map(ActionName::namespace)
            .chain(self.events.iter().map(EventName::namespace))
            .collect()
    }
}
