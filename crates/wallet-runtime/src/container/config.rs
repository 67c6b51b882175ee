//! # Runtime Configuration
//!
//! Unified configuration for the bus, telemetry and startup audit.
//!
//! Everything comes from environment variables with sane defaults; an
//! unparseable value is an error rather than a silent default.

use std::env;

use messenger_bus::BusConfig;
use messenger_telemetry::TelemetryConfig;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Bus policy.
    pub bus: BusConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
    /// Print the capability audit as JSON after wiring.
    pub print_audit: bool,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable held something other than true/false/1/0.
    #[error("{var} must be true, false, 1 or 0 (got {value:?})")]
    InvalidBool { var: &'static str, value: String },
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    ///
    /// - `WM_REQUIRE_EVENT_REGISTRATION`: reject subscriptions to undeclared
    ///   events (default: false)
    /// - `WM_PRINT_AUDIT`: print the capability audit after wiring
    ///   (default: false)
    /// - telemetry variables, see [`TelemetryConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            bus: BusConfig {
                require_event_registration: parse_bool(
                    &lookup,
                    "WM_REQUIRE_EVENT_REGISTRATION",
                    false,
                )?,
            },
            telemetry: TelemetryConfig::from_lookup(&lookup),
            print_audit: parse_bool(&lookup, "WM_PRINT_AUDIT", false)?,
        })
    }
}

fn parse_bool<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value }),
    }
}
