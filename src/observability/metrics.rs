//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (invocations, latency, misses, backend errors)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): invocations by rule, status
//! - `gateway_request_duration_seconds` (histogram): time to response head by rule
//! - `gateway_unmatched_total` (counter): requests passed on to the application
//! - `gateway_backend_errors_total` (counter): failed invocations by rule, kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for rule and status code only; targets would explode cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// One finished invocation.
pub fn record_invocation(rule: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "rule" => rule.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "rule" => rule.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_unmatched() {
    counter!("gateway_unmatched_total").increment(1);
}

pub fn record_backend_error(rule: &str, kind: &'static str) {
    counter!(
        "gateway_backend_errors_total",
        "rule" => rule.to_string(),
        "kind" => kind
    )
    .increment(1);
}
