//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health/services
//!     → aggregator.rs: one probe per registry entry, all concurrent
//!     → each probe bounded by its own timeout
//!     → state.rs: settle into healthy / degraded / down
//!     → HealthReport (always returned, never an error)
//! ```
//!
//! # Design Decisions
//! - Settle-all: one bad backend never fails the aggregate
//! - Total latency is bounded by one probe timeout, not N of them
//! - Probing happens on demand; there is no background monitor

pub mod aggregator;
pub mod state;

pub use aggregator::HealthAggregator;
pub use state::{HealthReport, OverallStatus, ServiceHealth, ServiceStatus};
