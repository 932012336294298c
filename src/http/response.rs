//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Add gateway headers (upstream latency, upstream service)
//! - Map proxy errors to the uniform JSON envelope
//!
//! # Design Decisions
//! - Only status, content type and body of the upstream response are kept
//! - Every proxy failure becomes `{error, service, message}`; the client never
//!   sees a framework-level fault for an upstream problem

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Upstream latency in milliseconds.
pub const X_UPSTREAM_LATENCY_MS: &str = "x-upstream-latency-ms";
/// Logical name of the service that answered.
pub const X_UPSTREAM_SERVICE: &str = "x-upstream-service";

/// JSON body of every failed forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub service: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: status
                .canonical_reason()
                .unwrap_or("Bad Gateway")
                .to_string(),
            service: service.into(),
            message: message.into(),
        }
    }
}

/// A proxy failure bound to the service it concerned.
#[derive(Debug)]
pub struct ProxyFailure {
    pub service: String,
    pub error: GatewayError,
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let envelope = ErrorEnvelope::new(status, self.service, self.error.to_string());
        (status, Json(envelope)).into_response()
    }
}

/// What the upstream sent back, reduced to the parts the gateway forwards.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Client response with the gateway headers added.
    pub fn into_client_response(self, service: &str, latency: Duration) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Some(content_type) = self.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        headers.insert(
            HeaderName::from_static(X_UPSTREAM_LATENCY_MS),
            HeaderValue::from(latency.as_millis() as u64),
        );
        if let Ok(value) = HeaderValue::from_str(service) {
            headers.insert(HeaderName::from_static(X_UPSTREAM_SERVICE), value);
        }
        response
    }
}
