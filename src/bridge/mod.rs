//! WebSocket bridge subsystem.
//!
//! # Data Flow
//! ```text
//! Client upgrade on a bridge path
//!     → BridgeEndpoint lookup (service + upstream path)
//!     → session.rs: Connecting, client frames queued
//!     → driver.rs: upstream handshake raced against client traffic
//!     → Open: queue flushed in order, frames relayed both ways
//!     → either side closes → other side closed → Closed
//! ```
//!
//! # Design Decisions
//! - One upstream connection per client connection; nothing is shared
//! - Frames are relayed verbatim; no parsing of payloads
//! - Ping/pong stay on the leg that produced them

pub mod driver;
pub mod frame;
pub mod session;

pub use driver::{run_session, BridgeError, SessionOutcome};
pub use frame::{leg_event, BridgeFrame, LegEvent};
pub use session::{BridgeSession, Disposition, SessionState, Side};

/// A client-facing WebSocket path and the upstream it is bridged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    pub path: &'static str,
    pub service: &'static str,
    pub upstream_path: &'static str,
}

pub const GATEWAY_BRIDGES: &[BridgeEndpoint] = &[
    BridgeEndpoint {
        path: "/ws/voice",
        service: "streaming-voice",
        upstream_path: "/ws/stream",
    },
    BridgeEndpoint {
        path: "/ws/conversation",
        service: "streaming-voice",
        upstream_path: "/ws/stream",
    },
];

/// The bridge mounted at `path`, if any.
pub fn find_bridge(path: &str) -> Option<&'static BridgeEndpoint> {
    GATEWAY_BRIDGES.iter().find(|b| b.path == path)
}
