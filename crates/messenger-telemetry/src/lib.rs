//! # Messenger Telemetry
//!
//! Observability for the wallet messenger runtime.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters mirroring the bus statistics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use messenger_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // Log lines and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WM_SERVICE_NAME` | `wallet-messenger` | Service name in log lines |
//! | `WM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `WM_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `WM_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, record_bus_stats, record_error, register_metrics, ACTIONS_CALLED,
    ACTION_FAILURES, CAPABILITY_DENIALS, EVENTS_PUBLISHED, EVENT_DELIVERIES, LIVE_HANDLES,
    MESSENGER_ERRORS, REGISTRY,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
