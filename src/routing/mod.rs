//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (first path segment → Route, or fixed path → FixedRoute)
//!     → policy.rs (deadline for the remaining path, body policy)
//!     → matcher.rs (evaluate deadline rules)
//!     → Return: RouteMatch or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteSpec[] + fixed routes
//!     → Resolve tiers against TimeoutConfig
//!     → Validate services against the Registry
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment prefix matching only)
//! - Deterministic: same input always matches same route
//! - First matching deadline rule wins

pub mod matcher;
pub mod policy;
pub mod router;

pub use policy::{BodyPolicy, Deadline};
pub use router::{FixedRoute, Route, RouteError, RouteMatch, RouteSpec, RouteTable};
