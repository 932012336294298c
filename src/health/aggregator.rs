//! Health aggregation.
//!
//! # Responsibilities
//! - Probe every registered service concurrently
//! - Bound each probe by its own timeout
//! - Settle all probes into a report; never fail the aggregate

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::health::state::{HealthReport, ServiceHealth, ServiceStatus};
use crate::observability::metrics;
use crate::registry::{Registry, ServiceEndpoint};

pub struct HealthAggregator {
    registry: Arc<Registry>,
    probe_timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HealthAggregator {
    pub fn new(registry: Arc<Registry>, probe_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            probe_timeout,
            client,
        }
    }

    /// Probe every service once. Returns after the slowest probe settles,
    /// which is at most one probe timeout.
    pub async fn check_all(&self) -> HealthReport {
        let probes = self.registry.iter().map(|endpoint| async move {
            let health = self.probe(endpoint).await;
            (endpoint.name().to_string(), health)
        });

        let services: BTreeMap<String, ServiceHealth> = join_all(probes).await.into_iter().collect();
        let report = HealthReport::from_services(services);

        tracing::info!(
            services = report.services.len(),
            unhealthy = report.unhealthy_count(),
            "Health aggregation complete"
        );
        report
    }

    async fn probe(&self, endpoint: &ServiceEndpoint) -> ServiceHealth {
        let name = endpoint.name();
        let url = endpoint.health_url();
        let start = Instant::now();

        let request = match Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("user-agent", "edge-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(service = %name, error = %e, "Failed to build health check request");
                return self.settle(name, ServiceStatus::Down, start);
            }
        };

        let status = match time::timeout(self.probe_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    ServiceStatus::Healthy
                } else {
                    tracing::warn!(service = %name, url = %url, status = %response.status(), "Health check failed: non-success status");
                    ServiceStatus::Degraded
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(service = %name, url = %url, error = %e, "Health check failed: connection error");
                ServiceStatus::Down
            }
            Err(_) => {
                tracing::warn!(service = %name, url = %url, "Health check failed: timeout");
                ServiceStatus::Down
            }
        };

        self.settle(name, status, start)
    }

    fn settle(&self, name: &str, status: ServiceStatus, start: Instant) -> ServiceHealth {
        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(service = %name, status = ?status, latency_ms, "Probe settled");
        metrics::record_service_health(name, status);
        ServiceHealth { status, latency_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_registry_settles_as_down() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let registry = Registry::from_lookup(|key| {
            if key.ends_with("_HOST") {
                Some("127.0.0.1".to_string())
            } else if key.ends_with("_PORT") {
                Some(port.clone())
            } else {
                None
            }
        })
        .unwrap();
        let total = registry.len();

        let aggregator = HealthAggregator::new(Arc::new(registry), Duration::from_millis(500));
        let report = aggregator.check_all().await;

        assert_eq!(report.services.len(), total);
        assert!(report
            .services
            .values()
            .all(|s| s.status == ServiceStatus::Down));
    }
}
