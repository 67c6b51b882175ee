//! # Wallet Runtime
//!
//! Composition root for the wallet's controller modules.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from env)
//! 2. Initialize logging and metrics
//! 3. Create the root bus
//! 4. Wire every module messenger (abort on the first misconfiguration)
//! 5. Optionally print the capability audit
//! 6. Run until Ctrl+C, then release messengers and the bus

use anyhow::{Context, Result};
use tracing::{debug, info};

use wallet_runtime::{RuntimeConfig, WalletRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;

    messenger_telemetry::init_telemetry(&config.telemetry)
        .context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Wallet Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let runtime = WalletRuntime::new(&config).context("Module wiring failed")?;

    if config.print_audit {
        let report = runtime
            .audit()
            .to_json()
            .context("Failed to encode capability audit")?;
        println!("{report}");
    }

    runtime.publish_metrics();
    if let Ok(metrics) = messenger_telemetry::encode_metrics() {
        debug!(%metrics, "Initial metrics");
    }

    info!(
        modules = runtime.modules().len(),
        "Runtime is ready. Press Ctrl+C to stop."
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    runtime.shutdown();
    Ok(())
}
