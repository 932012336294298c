//! Per-route forwarding policy.
//!
//! A route carries its deadline rules and how its request body is treated.
//! Both are resolved when the route table is compiled.

use std::time::Duration;

use axum::http::Method;

use crate::config::TimeoutConfig;
use crate::resilience::TimeoutTier;
use crate::routing::matcher::Matcher;

/// A tier together with its resolved duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub tier: TimeoutTier,
    pub duration: Duration,
}

impl Deadline {
    pub fn resolve(tier: TimeoutTier, timeouts: &TimeoutConfig) -> Self {
        Self {
            tier,
            duration: tier.duration(timeouts),
        }
    }
}

/// How the inbound body is turned into the outbound body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPolicy {
    /// GET/HEAD carry nothing; everything else re-serializes the inbound JSON
    /// body, substituting `{}` when it is empty.
    Json,
    /// Never forward a body.
    Empty,
}

impl BodyPolicy {
    /// Whether a request with `method` gets a body under this policy.
    pub fn carries_body(self, method: &Method) -> bool {
        match self {
            BodyPolicy::Json => !(method == Method::GET || method == Method::HEAD),
            BodyPolicy::Empty => false,
        }
    }
}

/// Ordered deadline rules for one route: first matching rule wins, else the
/// route default applies.
#[derive(Debug)]
pub struct DeadlinePolicy {
    default: Deadline,
    rules: Vec<(Box<dyn Matcher>, Deadline)>,
}

impl DeadlinePolicy {
    pub fn new(default: Deadline) -> Self {
        Self {
            default,
            rules: Vec::new(),
        }
    }

    pub fn push_rule(&mut self, matcher: Box<dyn Matcher>, deadline: Deadline) {
        self.rules.push((matcher, deadline));
    }

    /// Deadline for the path remaining after the route prefix.
    pub fn select(&self, rest: &str) -> Deadline {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(rest))
            .map(|(_, deadline)| *deadline)
            .unwrap_or(self.default)
    }
}
