//! # Wallet Runtime Library
//!
//! This library exposes the wiring and container modules of the wallet
//! runtime for testing. The main entry point is the `main.rs` binary.
//!
//! ## Layout
//!
//! - `container/` - runtime configuration and the composed runtime
//! - `wiring/` - one messenger wiring function per module

pub mod container;
pub mod wiring;

pub use container::{ConfigError, RuntimeConfig, WalletRuntime};
pub use wiring::{wire_all, AuditEntry, AuditReport, WiredModules, WIRING_ORDER};
