//! Service health states.
//!
//! # States
//! - Healthy: probe answered with a 2xx status
//! - Degraded: probe answered, but with a non-success status
//! - Down: connection failed or the probe timed out
//!
//! # Design Decisions
//! - A probe result is a value, never an error
//! - No hysteresis: each aggregation reflects one probe round

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Down,
}

impl ServiceStatus {
    /// Gauge value: 1 healthy, 0.5 degraded, 0 down.
    pub fn as_gauge(self) -> f64 {
        match self {
            ServiceStatus::Healthy => 1.0,
            ServiceStatus::Degraded => 0.5,
            ServiceStatus::Down => 0.0,
        }
    }
}

/// Outcome of probing one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub latency_ms: u64,
}

/// Overall gateway view of its backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// Result of one aggregation round, keyed by logical service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    pub fn from_services(services: BTreeMap<String, ServiceHealth>) -> Self {
        let status = if services
            .values()
            .all(|s| s.status == ServiceStatus::Healthy)
        {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };
        Self { status, services }
    }

    /// Number of services that are not healthy.
    pub fn unhealthy_count(&self) -> usize {
        self.services
            .values()
            .filter(|s| s.status != ServiceStatus::Healthy)
            .count()
    }
}
