//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (pick tier deadline, enforce it)
//!     → On timeout: GatewayError::UpstreamTimeout → 502 envelope
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Exactly one attempt per request: no retries, no circuit breaking

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded, TimeoutTier};
