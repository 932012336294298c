//! Gateway error taxonomy.
//!
//! Every failure on the proxy path becomes one of these variants, and every
//! variant maps to exactly one client-facing status.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The route names a service the registry does not know. Raised before
    /// any network call.
    #[error("cannot resolve service: {0}")]
    Resolution(#[from] RegistryError),

    /// The upstream did not answer within its timeout tier.
    #[error("upstream '{service}' timed out after {}ms", .deadline.as_millis())]
    UpstreamTimeout { service: String, deadline: Duration },

    /// Refused, reset, or otherwise broken connection.
    #[error("upstream '{service}' connection failed: {message}")]
    UpstreamConnection { service: String, message: String },

    /// The upstream answered with something that is not valid HTTP.
    #[error("upstream '{service}' sent a malformed response: {message}")]
    UpstreamProtocol { service: String, message: String },

    /// The inbound body could not be forwarded as JSON.
    #[error("request body for '{service}' is not valid JSON: {message}")]
    InvalidBody { service: String, message: String },

    /// The inbound body exceeded the configured limit or could not be read.
    #[error("request body for '{service}' exceeds {limit} bytes or could not be read")]
    PayloadTooLarge { service: String, limit: usize },

    /// The upstream response body exceeded the configured limit.
    #[error("upstream '{service}' response exceeds {limit} bytes")]
    UpstreamTooLarge { service: String, limit: usize },

    /// The upstream request could not be assembled.
    #[error("cannot build upstream request for '{service}': {message}")]
    InvalidUpstreamRequest { service: String, message: String },
}

impl GatewayError {
    /// Status returned to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short machine-readable kind, used as a log and metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Resolution(_) => "resolution",
            GatewayError::UpstreamTimeout { .. } => "timeout",
            GatewayError::UpstreamConnection { .. } => "connection",
            GatewayError::UpstreamProtocol { .. } => "protocol",
            GatewayError::InvalidBody { .. } => "invalid_body",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::UpstreamTooLarge { .. } => "upstream_too_large",
            GatewayError::InvalidUpstreamRequest { .. } => "invalid_request",
        }
    }
}
