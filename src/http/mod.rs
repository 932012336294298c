//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, body limit, tracing)
//!     → /health, /health/services → health.rs
//!     → /ws/*                     → websocket.rs (bridge)
//!     → fixed paths, /<prefix>/*  → proxy.rs
//!         → request.rs (header allow-list, JSON body)
//!         → response.rs (gateway headers, error envelope)
//!     → Send to client
//! ```

pub mod health;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{ForwardingPolicy, X_REQUEST_ID, X_TENANT_ID};
pub use response::{ErrorEnvelope, X_UPSTREAM_LATENCY_MS, X_UPSTREAM_SERVICE};
pub use server::{AppState, GatewayServer};
