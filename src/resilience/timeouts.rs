//! Timeout enforcement.
//!
//! # Responsibilities
//! - Define the proxy timeout tiers
//! - Wrap upstream calls with a deadline
//! - Cancel the in-flight call cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the call
//! - Timeout errors are distinct from other errors
//! - Tier durations come from config; which route gets which tier is compiled in

use std::future::Future;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// One of the fixed proxy deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutTier {
    /// Generative and pipeline calls (180s by default).
    Long,
    /// Fast model-routing calls (15s by default).
    Short,
    /// Everything else (30s by default).
    Default,
}

impl TimeoutTier {
    /// Deadline for this tier under `config`.
    pub fn duration(self, config: &TimeoutConfig) -> Duration {
        let ms = match self {
            TimeoutTier::Long => config.long_ms,
            TimeoutTier::Short => config.short_ms,
            TimeoutTier::Default => config.default_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeoutTier::Long => "long",
            TimeoutTier::Short => "short",
            TimeoutTier::Default => "default",
        }
    }
}

/// Returned when a call outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

/// Run `future` under `deadline`. The future is dropped when the deadline
/// passes.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
