//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled prefix routes and fixed single-purpose routes
//! - Look up the route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) prefix lookup via HashMap on the first path segment
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;

use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::registry::{Registry, RegistryError};
use crate::resilience::TimeoutTier;
use crate::routing::matcher::{Matcher, PathPrefixMatcher};
use crate::routing::policy::{BodyPolicy, Deadline, DeadlinePolicy};

/// Errors raised while compiling the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("prefix '{0}' is registered more than once")]
    DuplicatePrefix(String),

    #[error("fixed path '{0}' is registered more than once")]
    DuplicateFixedPath(String),

    #[error("route '{route}' targets an unregistered service: {source}")]
    UnknownService {
        route: String,
        #[source]
        source: RegistryError,
    },
}

/// Uncompiled definition of a prefix route.
#[derive(Debug)]
pub struct RouteSpec {
    prefix: String,
    service: String,
    tier: TimeoutTier,
    rules: Vec<(Box<dyn Matcher>, TimeoutTier)>,
    body: BodyPolicy,
}

impl RouteSpec {
    /// `/<prefix>/<rest>` forwards to `<service>/api/v1/<rest>` on the default tier.
    pub fn new(prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            service: service.into(),
            tier: TimeoutTier::Default,
            rules: Vec::new(),
            body: BodyPolicy::Json,
        }
    }

    /// Tier used when no rule matches.
    pub fn tier(mut self, tier: TimeoutTier) -> Self {
        self.tier = tier;
        self
    }

    /// Use `tier` when the remaining path matches `matcher`.
    pub fn rule(mut self, matcher: impl Matcher + 'static, tier: TimeoutTier) -> Self {
        self.rules.push((Box::new(matcher), tier));
        self
    }

    pub fn body(mut self, body: BodyPolicy) -> Self {
        self.body = body;
        self
    }
}

/// A compiled prefix route.
#[derive(Debug)]
pub struct Route {
    pub prefix: String,
    pub service: String,
    pub body: BodyPolicy,
    deadlines: DeadlinePolicy,
}

/// A single-purpose path forwarded to one fixed upstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRoute {
    pub path: String,
    pub service: String,
    pub upstream_path: String,
    pub deadline: Deadline,
    pub body: BodyPolicy,
}

/// Result of a successful prefix lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Path after the prefix, without a leading slash. Empty for `/prefix`.
    pub rest: &'a str,
    pub deadline: Deadline,
}

/// Immutable route table.
#[derive(Debug)]
pub struct RouteTable {
    prefixes: HashMap<String, Route>,
    fixed: Vec<FixedRoute>,
}

impl RouteTable {
    /// Compile route definitions, resolving every tier against `timeouts`.
    pub fn compile(
        specs: Vec<RouteSpec>,
        fixed: Vec<(&str, &str, &str)>,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, RouteError> {
        let mut prefixes = HashMap::with_capacity(specs.len());

        for spec in specs {
            let prefix = spec.prefix.trim_matches('/').to_string();
            let mut deadlines = DeadlinePolicy::new(Deadline::resolve(spec.tier, timeouts));
            for (matcher, tier) in spec.rules {
                deadlines.push_rule(matcher, Deadline::resolve(tier, timeouts));
            }

            let route = Route {
                prefix: prefix.clone(),
                service: spec.service,
                body: spec.body,
                deadlines,
            };
            if prefixes.insert(prefix.clone(), route).is_some() {
                return Err(RouteError::DuplicatePrefix(prefix));
            }
        }

        let mut compiled_fixed: Vec<FixedRoute> = Vec::with_capacity(fixed.len());
        for (path, service, upstream_path) in fixed {
            if compiled_fixed.iter().any(|f| f.path == path) {
                return Err(RouteError::DuplicateFixedPath(path.to_string()));
            }
            compiled_fixed.push(FixedRoute {
                path: path.to_string(),
                service: service.to_string(),
                upstream_path: upstream_path.to_string(),
                deadline: Deadline::resolve(TimeoutTier::Default, timeouts),
                body: BodyPolicy::Empty,
            });
        }

        Ok(Self {
            prefixes,
            fixed: compiled_fixed,
        })
    }

    /// The gateway's compiled-in routes.
    pub fn gateway(timeouts: &TimeoutConfig) -> Result<Self, RouteError> {
        Self::compile(gateway_routes(), GATEWAY_FIXED_ROUTES.to_vec(), timeouts)
    }

    /// Check every route against the registry before serving traffic.
    pub fn validate(&self, registry: &Registry) -> Result<(), RouteError> {
        let targets = self
            .prefixes
            .values()
            .map(|r| (r.prefix.as_str(), r.service.as_str()))
            .chain(self.fixed.iter().map(|f| (f.path.as_str(), f.service.as_str())));

        for (route, service) in targets {
            registry
                .resolve(service)
                .map_err(|source| RouteError::UnknownService {
                    route: route.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Match a request path on its first segment.
    pub fn match_path<'a>(&'a self, path: &'a str) -> Option<RouteMatch<'a>> {
        let trimmed = path.trim_start_matches('/');
        let (prefix, rest) = match trimmed.split_once('/') {
            Some((prefix, rest)) => (prefix, rest),
            None => (trimmed, ""),
        };
        if prefix.is_empty() {
            return None;
        }

        let route = self.prefixes.get(prefix)?;
        Some(RouteMatch {
            route,
            rest,
            deadline: route.deadlines.select(rest),
        })
    }

    pub fn fixed_routes(&self) -> &[FixedRoute] {
        &self.fixed
    }

    pub fn fixed(&self, path: &str) -> Option<&FixedRoute> {
        self.fixed.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Fixed single-purpose routes: (gateway path, service, upstream path).
pub const GATEWAY_FIXED_ROUTES: &[(&str, &str, &str)] = &[
    ("/admin/report", "observability-core", "/api/v1/reports/performance"),
    ("/admin/audit", "orchestration-engine", "/api/v1/audit"),
];

/// Prefix routes served by the gateway.
pub fn gateway_routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new("orchestration", "orchestration-engine")
            .rule(PathPrefixMatcher::new("pipelines"), TimeoutTier::Long),
        RouteSpec::new("llm", "llm-router").tier(TimeoutTier::Short),
        RouteSpec::new("agents", "agent-runtime"),
        RouteSpec::new("rag", "rag-service"),
        RouteSpec::new("safety", "safety-guardrails"),
        RouteSpec::new("voice", "streaming-voice"),
        RouteSpec::new("execution", "execution-engine"),
        RouteSpec::new("observability", "observability-core"),
    ]
}
