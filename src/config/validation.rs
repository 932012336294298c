//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (service overrides name known services)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::registry::CANONICAL_SERVICES;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    let durations = [
        ("timeouts.long_ms", config.timeouts.long_ms),
        ("timeouts.short_ms", config.timeouts.short_ms),
        ("timeouts.default_ms", config.timeouts.default_ms),
        ("health.probe_timeout_ms", config.health.probe_timeout_ms),
        ("bridge.handshake_timeout_ms", config.bridge.handshake_timeout_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let limits = [
        ("security.max_body_size", config.security.max_body_size),
        ("security.max_response_size", config.security.max_response_size),
    ];
    for (field, value) in limits {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    for (name, service) in &config.services {
        if !CANONICAL_SERVICES.iter().any(|s| s.name == name) {
            errors.push(ValidationError::new(
                format!("services.{}", name),
                "unknown service",
            ));
        }
        if service.port == Some(0) {
            errors.push(ValidationError::new(
                format!("services.{}.port", name),
                "must be greater than zero",
            ));
        }
        if let Some(path) = &service.health_path {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(
                    format!("services.{}.health_path", name),
                    "must start with '/'",
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
