//! # Runtime Container
//!
//! Holds the root bus and every wired module messenger with the right drop
//! order: messengers are released before the bus that backs them.

pub mod config;

pub use config::{ConfigError, RuntimeConfig};

use messenger_bus::{Bus, BusStats, MessengerResult};
use tracing::info;

use crate::wiring::{wire_all, AuditReport, WiredModules};

/// The composed runtime.
pub struct WalletRuntime {
    // Declared before `bus` so handles drop first.
    modules: WiredModules,
    bus: Bus,
}

impl WalletRuntime {
    /// Create the bus and wire every module.
    ///
    /// # Errors
    ///
    /// The first wiring failure.
    pub fn new(config: &RuntimeConfig) -> MessengerResult<Self> {
        let bus = Bus::with_config(config.bus);
        let modules = wire_all(&bus)?;
        Ok(Self { modules, bus })
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    #[must_use]
    pub fn modules(&self) -> &WiredModules {
        &self.modules
    }

    #[must_use]
    pub fn audit(&self) -> AuditReport {
        self.modules.audit()
    }

    /// Copy the bus counters into the Prometheus registry.
    pub fn publish_metrics(&self) -> BusStats {
        let stats = self.bus.stats();
        messenger_telemetry::record_bus_stats(&stats);
        stats
    }

    /// Release every messenger, then the bus.
    pub fn shutdown(self) {
        let stats = self.publish_metrics();
        info!(
            actions_called = stats.actions_called,
            events_published = stats.events_published,
            capability_denials = stats.capability_denials,
            "Shutting down wallet runtime"
        );
        drop(self);
    }
}
