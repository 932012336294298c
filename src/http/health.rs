//! Health endpoints served by the gateway itself.
//!
//! - `GET /health`: liveness of the gateway process; never touches upstreams
//! - `GET /health/services`: one aggregation round across the registry

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::health::HealthReport;
use crate::http::server::AppState;

/// Name reported by the gateway liveness endpoint.
pub const GATEWAY_SERVICE_NAME: &str = "api-gateway";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayHealth {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl GatewayHealth {
    pub fn current() -> Self {
        Self {
            status: "healthy".to_string(),
            service: GATEWAY_SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub async fn gateway_health() -> Json<GatewayHealth> {
    Json(GatewayHealth::current())
}

/// Always 200; per-service problems are reported in the body.
pub async fn services_health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.check_all().await)
}
