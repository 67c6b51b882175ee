//! # Module Wiring
//!
//! One function per module that turns the root bus into that module's scoped
//! messenger. Allow-lists are `const` literal slices so the whole trust graph
//! can be read off this directory without running anything.
//!
//! ## Wiring Order
//!
//! ```text
//! ExecutionService ──► SnapControllerInit ──► SnapController
//!                                                   │
//! RateLimitControllerInit ──► RateLimitController   │ SnapController:handleRequest
//!                                                   ▼
//! BackendWebSocketService   RewardsDataService ──► RewardsController
//!                                                   │
//!                                                   ▼
//!                                           SubscriptionService
//! ```
//!
//! Order does not affect correctness (allow-list entries are not checked
//! against the bus) but keeps startup logs readable. The first failure aborts
//! wiring.

pub mod backend_websocket;
pub mod rate_limit;
pub mod rewards;
pub mod snaps;
pub mod subscription;

pub use backend_websocket::get_backend_websocket_service_messenger;
pub use rate_limit::{get_rate_limit_controller_init_messenger, get_rate_limit_controller_messenger};
pub use rewards::{get_rewards_controller_messenger, get_rewards_data_service_messenger};
pub use snaps::{
    get_execution_service_messenger, get_snap_controller_init_messenger,
    get_snap_controller_messenger,
};
pub use subscription::get_subscription_service_messenger;

use messenger_bus::{Bus, MessengerResult, ScopedHandle};
use serde::Serialize;
use tracing::{error, info};

/// Wiring function signature shared by every module.
pub type WiringFn = fn(&Bus) -> MessengerResult<ScopedHandle>;

/// Every module's wiring function, in startup order.
pub const WIRING_ORDER: &[(&str, WiringFn)] = &[
    (snaps::EXECUTION_SERVICE, get_execution_service_messenger),
    (snaps::SNAP_CONTROLLER_INIT, get_snap_controller_init_messenger),
    (snaps::SNAP_CONTROLLER, get_snap_controller_messenger),
    (rate_limit::RATE_LIMIT_CONTROLLER_INIT, get_rate_limit_controller_init_messenger),
    (rate_limit::RATE_LIMIT_CONTROLLER, get_rate_limit_controller_messenger),
    (backend_websocket::BACKEND_WEBSOCKET_SERVICE, get_backend_websocket_service_messenger),
    (rewards::REWARDS_DATA_SERVICE, get_rewards_data_service_messenger),
    (rewards::REWARDS_CONTROLLER, get_rewards_controller_messenger),
    (subscription::SUBSCRIPTION_SERVICE, get_subscription_service_messenger),
];

/// Every messenger created at startup, in wiring order.
///
/// Dropping this releases all namespaces and everything the modules
/// registered through their handles.
#[derive(Debug)]
pub struct WiredModules {
    handles: Vec<ScopedHandle>,
}

impl WiredModules {
    /// Look up a module's messenger by namespace.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&ScopedHandle> {
        self.handles
            .iter()
            .find(|h| h.namespace().as_str() == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopedHandle> {
        self.handles.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Snapshot of every module's allow-lists.
    #[must_use]
    pub fn audit(&self) -> AuditReport {
        AuditReport {
            modules: self.handles.iter().map(AuditEntry::from_handle).collect(),
        }
    }
}

/// Serializable view of the trust graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub modules: Vec<AuditEntry>,
}

/// One module's row in the audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub namespace: String,
    pub actions: Vec<String>,
    pub events: Vec<String>,
    /// Foreign namespaces reached through the allow-lists.
    pub depends_on: Vec<String>,
}

impl AuditEntry {
    fn from_handle(handle: &ScopedHandle) -> Self {
        let caps = handle.capabilities();
        Self {
            namespace: handle.namespace().to_string(),
            actions: caps.actions().map(ToString::to_string).collect(),
            events: caps.events().map(ToString::to_string).collect(),
            depends_on: caps.dependencies().into_iter().map(str::to_string).collect(),
        }
    }
}

impl AuditReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn entry(&self, namespace: &str) -> Option<&AuditEntry> {
        self.modules.iter().find(|m| m.namespace == namespace)
    }
}

/// Create every module's messenger in [`WIRING_ORDER`].
///
/// # Errors
///
/// The first wiring failure. Messengers created before it are dropped, so
/// the bus is left with no claimed namespaces from this call.
pub fn wire_all(bus: &Bus) -> MessengerResult<WiredModules> {
    info!(modules = WIRING_ORDER.len(), "Wiring module messengers");

    let mut handles = Vec::with_capacity(WIRING_ORDER.len());
    for (namespace, wire) in WIRING_ORDER {
        match wire(bus) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                error!(namespace, kind = e.kind(), error = %e, "Module wiring failed");
                messenger_telemetry::record_error(&e);
                return Err(e);
            }
        }
    }

    info!(modules = handles.len(), "All module messengers wired");
    Ok(WiredModules { handles })
}
