//! # Messenger Types Crate
//!
//! Shared vocabulary for the scoped capability messenger.
//!
//! ## Design Principles
//!
//! - **Names are contracts**: every action and event is addressed by a
//!   `"<Namespace>:<verb>"` string. That string is the only thing two
//!   independently developed modules agree on, so it is validated once, here.
//! - **Allow-lists are data**: a module's trust boundary is a pair of literal
//!   name sets (`Capabilities`) that can be audited without running anything.
//! - **One error taxonomy**: every policy violation is a `MessengerError`
//!   variant; none of them is retryable.

pub mod capability;
pub mod descriptor;
pub mod errors;

pub use capability::{Capabilities, Delegation};
pub use descriptor::{ActionDescriptor, ActionName, EventDescriptor, EventName, Namespace};
pub use errors::{MessengerError, MessengerResult};

/// Separator between the namespace and the verb of a descriptor name.
pub const NAME_SEPARATOR: char = ':';

/// Payload type carried on the bus for requests, responses and events.
pub type Payload = serde_json::Value;
