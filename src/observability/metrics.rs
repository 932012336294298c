//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by service, status
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency by service
//! - `gateway_service_health` (gauge): 1=healthy, 0.5=degraded, 0=down
//! - `gateway_bridge_sessions_active` (gauge): open bridge sessions by endpoint
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op, so tests need no setup
//! - Labels are logical service names, never upstream addresses

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::ServiceStatus;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// One proxied request. `latency` is absent when no upstream call was made.
pub fn record_request(service: &str, status: u16, latency: Option<Duration>) {
    counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if let Some(latency) = latency {
        histogram!("gateway_upstream_duration_seconds", "service" => service.to_string())
            .record(latency.as_secs_f64());
    }
}

/// Latest probe result for a service.
pub fn record_service_health(service: &str, status: ServiceStatus) {
    gauge!("gateway_service_health", "service" => service.to_string()).set(status.as_gauge());
}

/// Adjust the open-session gauge for a bridge endpoint by `delta`.
pub fn record_bridge_session(endpoint: &str, delta: f64) {
    gauge!("gateway_bridge_sessions_active", "endpoint" => endpoint.to_string()).increment(delta);
}
