//! Prometheus metrics for the Trackk client.
//!
//! Covers:
//! - Connection state and reconnect attempts
//! - Inbound frames by message kind and decode failures
//! - Router listener failures
//! - Outbound wire ops and the active subscription count
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error surfaced on first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_int_gauge, Counter, CounterVec, Encoder, Gauge, GaugeVec, IntGauge, TextEncoder,
};
use std::path::Path;

/// WebSocket connection state (1 = open, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("trackk_ws_connected", "WebSocket connection open (1=open)").unwrap()
});

/// Connection state machine current state.
/// Labels: state (disconnected/connecting/open/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "trackk_ws_state",
        "Connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Reconnect attempts by outcome (scheduled/succeeded/failed/exhausted).
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trackk_ws_reconnect_total",
        "WebSocket reconnect attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Decoded inbound frames by message kind.
pub static WS_FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trackk_ws_frames_total",
        "Decoded inbound frames by message kind",
        &["kind"]
    )
    .unwrap()
});

/// Inbound frames dropped because they failed to decode.
pub static WS_DECODE_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "trackk_ws_decode_errors_total",
        "Inbound frames dropped on decode failure"
    )
    .unwrap()
});

/// Outbound wire ops by type (subscribe/unsubscribe/...).
pub static WS_OPS_SENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trackk_ws_ops_sent_total",
        "Outbound wire operations by type",
        &["op"]
    )
    .unwrap()
});

/// Listener invocations that returned an error or panicked.
pub static ROUTER_LISTENER_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "trackk_router_listener_failures_total",
        "Message listener failures isolated by the router"
    )
    .unwrap()
});

/// Number of active symbol subscriptions.
pub static SUBSCRIPTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "trackk_subscriptions_active",
        "Active symbol subscriptions"
    )
    .unwrap()
});

const WS_STATES: [&str; 4] = ["disconnected", "connecting", "open", "reconnecting"];

/// Facade over the metric statics.
pub struct Metrics;

impl Metrics {
    /// Set the connection state. Only the active state is 1.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "open" { 1.0 } else { 0.0 });
    }

    /// Record a reconnect event.
    pub fn ws_reconnect(outcome: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a decoded inbound frame.
    pub fn ws_frame(kind: &str) {
        WS_FRAMES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a frame dropped on decode failure.
    pub fn ws_decode_error() {
        WS_DECODE_ERRORS_TOTAL.inc();
    }

    /// Record an outbound wire op.
    pub fn ws_op_sent(op: &str) {
        WS_OPS_SENT_TOTAL.with_label_values(&[op]).inc();
    }

    /// Record an isolated listener failure.
    pub fn listener_failure() {
        ROUTER_LISTENER_FAILURES_TOTAL.inc();
    }

    /// Set the active subscription count.
    pub fn subscriptions_active(count: usize) {
        SUBSCRIPTIONS_ACTIVE.set(count as i64);
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }

    /// Write [`Metrics::render`] output to `path` for a textfile collector.
    ///
    /// The file is replaced atomically, so a scraper never reads a partial
    /// exposition.
    pub fn write_textfile(path: &Path) -> TelemetryResult<()> {
        let text = Self::render()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
