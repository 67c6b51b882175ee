//! Prometheus metrics for the message bus.
//!
//! All metrics follow the naming convention: `wm_<component>_<metric>_<unit>`
//!
//! The bus keeps its own atomic counters (`BusStats`) so that it does not
//! depend on this crate. The runtime copies a snapshot in with
//! [`record_bus_stats`] before each scrape.

use lazy_static::lazy_static;
use messenger_bus::BusStats;
use messenger_types::MessengerError;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ACTION METRICS
    // =========================================================================

    /// Actions dispatched to a handler
    pub static ref ACTIONS_CALLED: IntCounter = IntCounter::new(
        "wm_bus_actions_called_total",
        "Total action calls dispatched to a registered handler"
    ).expect("metric creation failed");

    /// Calls that failed (unknown action or handler error)
    pub static ref ACTION_FAILURES: IntCounter = IntCounter::new(
        "wm_bus_action_failures_total",
        "Total action calls that returned an error"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Events published
    pub static ref EVENTS_PUBLISHED: IntCounter = IntCounter::new(
        "wm_bus_events_published_total",
        "Total events published"
    ).expect("metric creation failed");

    /// Listener invocations
    pub static ref EVENT_DELIVERIES: IntCounter = IntCounter::new(
        "wm_bus_event_deliveries_total",
        "Total listener invocations across all published events"
    ).expect("metric creation failed");

    // =========================================================================
    // CAPABILITY METRICS
    // =========================================================================

    /// Calls, subscriptions and registrations rejected by a scoped messenger
    pub static ref CAPABILITY_DENIALS: IntCounter = IntCounter::new(
        "wm_broker_capability_denials_total",
        "Operations rejected by an allow-list or namespace check"
    ).expect("metric creation failed");

    /// Scoped messengers currently alive
    pub static ref LIVE_HANDLES: IntGauge = IntGauge::new(
        "wm_broker_live_handles",
        "Number of scoped messengers currently holding a namespace"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Messenger errors surfaced to the runtime, by kind
    pub static ref MESSENGER_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("wm_messenger_errors_total", "Messenger errors by kind"),
        &["kind"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIONS_CALLED.clone()),
        Box::new(ACTION_FAILURES.clone()),
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(EVENT_DELIVERIES.clone()),
        Box::new(CAPABILITY_DENIALS.clone()),
        Box::new(LIVE_HANDLES.clone()),
        Box::new(MESSENGER_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Copy a bus snapshot into the Prometheus metrics.
///
/// Counters only move forward: each is advanced by the difference between
/// the snapshot and its current value. Assumes one bus per process.
pub fn record_bus_stats(stats: &BusStats) {
    advance(&ACTIONS_CALLED, stats.actions_called);
    advance(&ACTION_FAILURES, stats.action_failures);
    advance(&EVENTS_PUBLISHED, stats.events_published);
    advance(&EVENT_DELIVERIES, stats.deliveries);
    advance(&CAPABILITY_DENIALS, stats.capability_denials);
    LIVE_HANDLES.set(i64::try_from(stats.live_handles).unwrap_or(i64::MAX));
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

/// Count one messenger error under its kind label.
pub fn record_error(error: &MessengerError) {
    MESSENGER_ERRORS.with_label_values(&[error.kind()]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
