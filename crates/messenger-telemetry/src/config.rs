//! Telemetry configuration from environment variables.

use std::env;

use serde::Serialize;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `messenger_bus=debug,info`
    pub log_level: String,

    /// Whether to enable console output (for development)
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "wallet-messenger".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WM_SERVICE_NAME`: Service name (default: wallet-messenger)
    /// - `WM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `WM_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `WM_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: lookup("WM_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("WM_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("WM_CONSOLE_OUTPUT")
                .map_or(defaults.console_output, |v| !is_false(&v)),

            json_logs: lookup("WM_JSON_LOGS").map_or(is_container, |v| is_true(&v)),
        }
    }
}

pub(crate) fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

pub(crate) fn is_false(value: &str) -> bool {
    value.eq_ignore_ascii_case("false") || value == "0"
}
