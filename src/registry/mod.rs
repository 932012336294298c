//! Service registry.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     CANONICAL_SERVICES (name, default port)
//!     → config file [services.<name>] overrides
//!     → <NAME>_HOST / <NAME>_PORT / <NAME>_HEALTH_PATH env overrides
//!     → Registry (immutable, shared via Arc)
//!
//! Per request / connection:
//!     logical name → resolve() → ServiceEndpoint
//! ```
//!
//! # Design Decisions
//! - Built once, never mutated: concurrent reads need no locking
//! - Lookup is injected so tests can build a registry from a fake environment
//! - Every canonical name always has exactly one endpoint

pub mod endpoint;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ServiceOverride;

pub use endpoint::ServiceEndpoint;

/// Host used when no override is present.
pub const DEFAULT_HOST: &str = "localhost";
/// Health-check path used when no override is present.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// A canonical backend and its default port.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalService {
    pub name: &'static str,
    pub default_port: u16,
}

/// The fixed set of backends the gateway knows about.
pub const CANONICAL_SERVICES: &[CanonicalService] = &[
    CanonicalService { name: "orchestration-engine", default_port: 8001 },
    CanonicalService { name: "llm-router", default_port: 8002 },
    CanonicalService { name: "agent-runtime", default_port: 8003 },
    CanonicalService { name: "rag-service", default_port: 8004 },
    CanonicalService { name: "safety-guardrails", default_port: 8005 },
    CanonicalService { name: "streaming-voice", default_port: 8006 },
    CanonicalService { name: "execution-engine", default_port: 8007 },
    CanonicalService { name: "observability-core", default_port: 8008 },
];

/// Errors raised while building or querying the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The name is not among the canonical services.
    #[error("unknown service '{0}'")]
    UnknownService(String),

    /// A port override could not be parsed.
    #[error("invalid port '{value}' for service '{service}' ({key})")]
    InvalidPort {
        service: String,
        key: String,
        value: String,
    },

    /// A host override does not form a valid URL.
    #[error("invalid host '{host}' for service '{service}': {reason}")]
    InvalidHost {
        service: String,
        host: String,
        reason: String,
    },
}

/// Environment key prefix for a service: `llm-router` → `LLM_ROUTER`.
pub fn env_prefix(name: &str) -> String {
    name.to_ascii_uppercase().replace('-', "_")
}

/// Immutable logical-name → endpoint table.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Endpoints in canonical order.
    endpoints: Vec<ServiceEndpoint>,
}

impl Registry {
    /// Build from the process environment and config-file overrides.
    pub fn from_env(overrides: &BTreeMap<String, ServiceOverride>) -> Result<Self, RegistryError> {
        Self::build(overrides, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, with no config-file overrides.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::build(&BTreeMap::new(), lookup)
    }

    /// Build with precedence: lookup > config override > built-in default.
    pub fn build<F>(
        overrides: &BTreeMap<String, ServiceOverride>,
        lookup: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut endpoints = Vec::with_capacity(CANONICAL_SERVICES.len());

        for service in CANONICAL_SERVICES {
            let prefix = env_prefix(service.name);
            let file = overrides.get(service.name);

            let host = lookup(&format!("{}_HOST", prefix))
                .or_else(|| file.and_then(|f| f.host.clone()))
                .unwrap_or_else(|| DEFAULT_HOST.to_string());

            let port_key = format!("{}_PORT", prefix);
            let port = match lookup(&port_key) {
                Some(raw) => parse_port(service.name, &port_key, &raw)?,
                None => file
                    .and_then(|f| f.port)
                    .unwrap_or(service.default_port),
            };

            let health_path = lookup(&format!("{}_HEALTH_PATH", prefix))
                .or_else(|| file.and_then(|f| f.health_path.clone()))
                .unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string());

            endpoints.push(ServiceEndpoint::new(service.name, host, port, health_path)?);
        }

        Ok(Self { endpoints })
    }

    /// Resolve a logical service name to its endpoint.
    pub fn resolve(&self, name: &str) -> Result<&ServiceEndpoint, RegistryError> {
        self.endpoints
            .iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    /// All endpoints in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn parse_port(service: &str, key: &str, raw: &str) -> Result<u16, RegistryError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(RegistryError::InvalidPort {
            service: service.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_cover_every_canonical_name() {
        let registry = Registry::from_lookup(|_| None).unwrap();
        assert_eq!(registry.len(), CANONICAL_SERVICES.len());

        let llm = registry.resolve("llm-router").unwrap();
        assert_eq!(llm.host(), "localhost");
        assert_eq!(llm.port(), 8002);
        assert_eq!(llm.health_path(), "/health");
    }

    #[test]
    fn test_env_key_derivation() {
        assert_eq!(env_prefix("llm-router"), "LLM_ROUTER");
        assert_eq!(env_prefix("orchestration-engine"), "ORCHESTRATION_ENGINE");
    }

    #[test]
    fn test_env_overrides() {
        let registry = Registry::from_lookup(fake_env(&[
            ("RAG_SERVICE_HOST", "rag.internal"),
            ("RAG_SERVICE_PORT", "9004"),
            ("RAG_SERVICE_HEALTH_PATH", "/healthz"),
        ]))
        .unwrap();

        let rag = registry.resolve("rag-service").unwrap();
        assert_eq!(rag.host(), "rag.internal");
        assert_eq!(rag.port(), 9004);
        assert_eq!(rag.health_url().as_str(), "http://rag.internal:9004/healthz");

        // Untouched services keep their defaults.
        assert_eq!(registry.resolve("agent-runtime").unwrap().port(), 8003);
    }

    #[test]
    fn test_env_beats_config_file() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "llm-router".to_string(),
            ServiceOverride {
                host: Some("from-file".into()),
                port: Some(7000),
                health_path: None,
            },
        );

        let registry =
            Registry::build(&overrides, fake_env(&[("LLM_ROUTER_PORT", "7100")])).unwrap();
        let llm = registry.resolve("llm-router").unwrap();
        assert_eq!(llm.host(), "from-file");
        assert_eq!(llm.port(), 7100);
    }

    #[test]
    fn test_unknown_service() {
        let registry = Registry::from_lookup(|_| None).unwrap();
        assert_eq!(
            registry.resolve("billing").unwrap_err(),
            RegistryError::UnknownService("billing".into())
        );
    }

    #[test]
    fn test_invalid_port_fails_construction() {
        let err = Registry::from_lookup(fake_env(&[("LLM_ROUTER_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPort { ref key, .. } if key == "LLM_ROUTER_PORT"));

        let err = Registry::from_lookup(fake_env(&[("LLM_ROUTER_PORT", "0")])).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPort { .. }));
    }

    #[test]
    fn test_construction_is_deterministic() {
        let env = &[("EXECUTION_ENGINE_HOST", "exec")];
        let a = Registry::from_lookup(fake_env(env)).unwrap();
        let b = Registry::from_lookup(fake_env(env)).unwrap();
        let a: Vec<_> = a.iter().cloned().collect();
        let b: Vec<_> = b.iter().cloned().collect();
        assert_eq!(a, b);
    }
}
