//! Edge gateway library.
//!
//! One public entry point in front of a fixed set of backend services:
//! prefix-routed HTTP proxying with per-route timeout tiers, WebSocket
//! bridging for voice streams, and on-demand health aggregation.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod registry;
pub mod routing;

// Traffic handling
pub mod bridge;
pub mod health;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use registry::Registry;
