//! # Messenger Bus - Scoped Capability Messaging
//!
//! An in-process publish/subscribe and request/response bus, plus the broker
//! that hands each module a restricted view of it.
//!
//! ## Trust Boundary
//!
//! - **Own namespace:** a module registers actions and publishes events only
//!   under `"<Namespace>:..."`.
//! - **Foreign names:** a module calls actions and subscribes to events only
//!   if they appear in its allow-lists.
//! - **Root access:** the unrestricted [`Bus`] stays with the composition root.
//!
//! ```text
//! ┌──────────────┐   call / subscribe    ┌──────────────┐
//! │ ScopedHandle │ ───── (allow-list) ──▶│              │
//! │  (Module A)  │                       │     Bus      │
//! └──────────────┘                       │ (root owner) │
//! ┌──────────────┐ register / publish    │              │
//! │ ScopedHandle │ ───── (own ns) ──────▶│              │
//! │  (Module B)  │                       └──────────────┘
//! └──────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod bus;
pub mod handler;
pub mod subscriber;

// Re-export main types
pub use broker::{create_scoped_handle, HandleBuilder, ScopedHandle};
pub use bus::{Bus, BusConfig, BusStats, InitialPayloadProvider};
pub use handler::{ActionHandler, DynActionHandler};
pub use subscriber::{EventStream, Listener, Selector, SelectorListener, SubscriptionError, SubscriptionId};

pub use messenger_types::{
    define_action, define_event, ActionDescriptor, Capabilities, Delegation, EventDescriptor,
    MessengerError, MessengerResult, Payload,
};
