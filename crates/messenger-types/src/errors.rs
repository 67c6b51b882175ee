//! # Error Types
//!
//! Every failure the messenger can report. All variants except `Handler` are
//! configuration or programming errors: they are raised during wiring or at
//! call time, should never be retried, and are expected to abort startup when
//! they reach the composition root.

use thiserror::Error;

/// Result alias used throughout the messenger crates.
pub type MessengerResult<T> = Result<T, MessengerError>;

/// Errors raised by the bus, the broker and scoped handles.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// An action handler is already registered under this name.
    #[error("A handler for action {action} is already registered")]
    DuplicateRegistration { action: String },

    /// No handler is registered under this name.
    #[error("Action {action} is not registered")]
    UnknownAction { action: String },

    /// The event was never declared and the bus requires declaration.
    #[error("Event {event} is not registered")]
    UnknownEvent { event: String },

    /// The subscription id is not live (or belongs to another handle).
    #[error("Subscription {id} not found for this messenger")]
    UnknownSubscription { id: u64 },

    /// A live handle already owns this namespace on the same bus.
    #[error("Namespace {namespace} is already held by a live messenger")]
    NamespaceCollision { namespace: String },

    /// The action is outside the handle's allow-list.
    #[error("Messenger {namespace} is not allowed to call action {action}")]
    ActionNotAllowed { namespace: String, action: String },

    /// The event is outside the handle's allow-list.
    #[error("Messenger {namespace} is not allowed to subscribe to event {event}")]
    EventNotAllowed { namespace: String, event: String },

    /// A module tried to register or publish under a foreign namespace.
    #[error("Messenger {namespace} cannot register or publish {name}: foreign namespace")]
    NamespaceViolation { namespace: String, name: String },

    /// A namespace, action or event name is malformed.
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The bus a handle points to has been dropped.
    #[error("Message bus is no longer available")]
    BusUnavailable,

    /// A typed payload could not be converted to or from its wire form.
    #[error("Payload for {name} could not be converted: {message}")]
    PayloadCodec { name: String, message: String },

    /// The action handler itself failed. Passed through untouched.
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl MessengerError {
    /// Whether this error is an access-control or registration policy
    /// violation (as opposed to a domain failure inside a handler).
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        !matches!(self, Self::Handler(_) | Self::PayloadCodec { .. })
    }

    /// Short, stable label for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateRegistration { .. } => "duplicate_registration",
            Self::UnknownAction { .. } => "unknown_action",
            Self::UnknownEvent { .. } => "unknown_event",
            Self::UnknownSubscription { .. } => "unknown_subscription",
            Self::NamespaceCollision { .. } => "namespace_collision",
            Self::ActionNotAllowed { .. } => "action_not_allowed",
            Self::EventNotAllowed { .. } => "event_not_allowed",
            Self::NamespaceViolation { .. } => "namespace_violation",
            Self::InvalidName { .. } => "invalid_name",
            Self::BusUnavailable => "bus_unavailable",
            Self::PayloadCodec { .. } => "payload_codec",
            Self::Handler(_) => "handler",
        }
    }
}
