//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): latency per backend
//! - `lb_backend_active_connections` (gauge): in-flight requests per backend
//! - `lb_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `lb_probe_failures_total` (counter): failed probes by backend, reason
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Backend label used when no backend was selected.
pub const NO_BACKEND: &str = "none";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    histogram!("lb_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_active_connections(backend: &str, active: usize) {
    gauge!("lb_backend_active_connections", "backend" => backend.to_string()).set(active as f64);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!("lb_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_probe_failure(backend: &str, reason: &'static str) {
    counter!(
        "lb_probe_failures_total",
        "backend" => backend.to_string(),
        "reason" => reason
    )
    .increment(1);
}
