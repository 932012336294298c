//! Path matching for per-route timeout rules.
//!
//! # Responsibilities
//! - Match the path remaining after the route prefix has been stripped
//! - Keep matching segment-aware (`pipelines` does not match `pipelinesx`)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - Matchers are compiled once when the route table is built

/// Trait for matching the remaining request path against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if `rest` (the path after the route prefix, without a
    /// leading slash) matches this condition.
    fn matches(&self, rest: &str) -> bool;
}

/// Matches when the remaining path starts with the given segment(s).
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. Leading and trailing slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, rest: &str) -> bool {
        let rest = rest.trim_start_matches('/');
        match rest.strip_prefix(self.prefix.as_str()) {
            Some(tail) => tail.is_empty() || tail.starts_with('/'),
            None => false,
        }
    }
}
