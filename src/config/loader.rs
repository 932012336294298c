//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";
/// Environment variable overriding `observability.log_level`.
pub const ENV_LOG_LEVEL: &str = "GATEWAY_LOG_LEVEL";
/// Environment variable overriding `observability.log_format`.
pub const ENV_LOG_FORMAT: &str = "GATEWAY_LOG_FORMAT";

/// Load and validate configuration.
///
/// Reads the TOML file when a path is given, otherwise starts from defaults,
/// then applies environment overrides from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };
    finish(config, |key| std::env::var(key).ok())
}

/// Parse configuration text without validating it.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides through `lookup`, then validate.
pub fn finish<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    if let Some(format) = lookup(ENV_LOG_FORMAT) {
        match format.parse() {
            Ok(f) => config.observability.log_format = f,
            Err(message) => errors.push(ValidationError::new(ENV_LOG_FORMAT, message)),
        }
    }

    if let Err(mut found) = validate_config(&config) {
        errors.append(&mut found);
    }
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:4000"

            [services.llm-router]
            host = "llm.internal"
            port = 9002
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.health.probe_timeout_ms, 3_000);
        assert_eq!(config.timeouts.long_ms, 180_000);
        let llm = &config.services["llm-router"];
        assert_eq!(llm.host.as_deref(), Some("llm.internal"));
        assert_eq!(llm.port, Some(9002));
        assert!(llm.health_path.is_none());
    }

    #[test]
    fn test_env_overrides_apply() {
        let config = finish(GatewayConfig::default(), |key| match key {
            ENV_BIND_ADDRESS => Some("127.0.0.1:8888".into()),
            ENV_LOG_FORMAT => Some("JSON".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8888");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_env_format_is_reported() {
        let err = finish(GatewayConfig::default(), |key| match key {
            ENV_LOG_FORMAT => Some("xml".into()),
            ENV_BIND_ADDRESS => Some("not-an-address".into()),
            _ => None,
        })
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_config("listener = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
