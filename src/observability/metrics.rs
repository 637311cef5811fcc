//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted connections
//! - `proxy_active_connections` (gauge): connections currently tracked
//! - `proxy_connections_closed_total` (counter): closed connections by final state
//! - `proxy_requests_total` (counter): parsed request lines by method
//! - `proxy_blocked_requests_total` (counter): requests answered with 403
//! - `proxy_injected_headers_total` (counter): requests rewritten with the inject header
//! - `proxy_upstream_errors_total` (counter): failed upstream connects by reason
//! - `proxy_relayed_bytes_total` (counter): bytes relayed by direction
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::net::ConnectionState;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("proxy_connections_total").increment(1);
    gauge!("proxy_active_connections").increment(1.0);
}

pub fn record_connection_released() {
    gauge!("proxy_active_connections").decrement(1.0);
}

pub fn record_connection_closed(state: ConnectionState) {
    counter!("proxy_connections_closed_total", "state" => state.as_str()).increment(1);
}

pub fn record_request(method: &str) {
    counter!("proxy_requests_total", "method" => method_label(method)).increment(1);
}

/// Label for a request method; anything outside the standard set shares `other`.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "PATCH" => "PATCH",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "other",
    }
}

pub fn record_blocked() {
    counter!("proxy_blocked_requests_total").increment(1);
}

pub fn record_injected() {
    counter!("proxy_injected_headers_total").increment(1);
}

pub fn record_upstream_error(reason: &'static str) {
    counter!("proxy_upstream_errors_total", "reason" => reason).increment(1);
}

pub fn record_relayed_bytes(direction: &'static str, bytes: u64) {
    counter!("proxy_relayed_bytes_total", "direction" => direction).increment(bytes);
}
