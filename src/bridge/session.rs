//! Bridge session state machine.
//!
//! # States
//! - Connecting: client accepted, upstream handshake in flight; client frames queue up
//! - Open: both legs up; frames pass straight through
//! - Closed: terminal
//!
//! # State Transitions
//! ```text
//! Connecting ──upstream open──▶ Open
//! Connecting ──close/error────▶ Closed
//! Open ───────close/error─────▶ Closed
//! ```
//!
//! # Design Decisions
//! - The pending queue lives inside `Connecting`, so it cannot outlive the
//!   handshake or be reused
//! - Transitions are driven by exactly three events: upstream open, frame, close
//! - The state machine does no I/O; the driver owns the sockets

use std::collections::VecDeque;

use uuid::Uuid;

use crate::bridge::frame::BridgeFrame;

/// Which leg an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Upstream => "upstream",
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Client => Side::Upstream,
            Side::Upstream => Side::Client,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum SessionState {
    Connecting { pending: VecDeque<BridgeFrame> },
    Open,
    Closed,
}

/// What to do with a frame handed to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Held until the upstream opens.
    Buffered,
    /// Send to the other leg now.
    Forward(BridgeFrame),
    /// The target leg is not open; the frame is discarded.
    Dropped,
}

/// One client ↔ upstream pairing.
#[derive(Debug)]
pub struct BridgeSession {
    id: Uuid,
    endpoint: String,
    state: SessionState,
    closed_by: Option<Side>,
    dropped: u64,
}

impl BridgeSession {
    /// A new session in `Connecting`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            state: SessionState::Connecting {
                pending: VecDeque::new(),
            },
            closed_by: None,
            dropped: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    /// Frames queued while connecting.
    pub fn pending_len(&self) -> usize {
        match &self.state {
            SessionState::Connecting { pending } => pending.len(),
            _ => 0,
        }
    }

    /// Frames discarded because their target leg was not open.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The side whose close or error ended the session.
    pub fn closed_by(&self) -> Option<Side> {
        self.closed_by
    }

    /// A frame arrived from `from`, headed for the other leg.
    pub fn on_frame(&mut self, from: Side, frame: BridgeFrame) -> Disposition {
        match (&mut self.state, from) {
            (SessionState::Connecting { pending }, Side::Client) => {
                pending.push_back(frame);
                Disposition::Buffered
            }
            (SessionState::Open, _) => Disposition::Forward(frame),
            // Upstream frames cannot precede the handshake; anything after close is lost.
            (SessionState::Connecting { .. }, Side::Upstream) | (SessionState::Closed, _) => {
                self.dropped += 1;
                Disposition::Dropped
            }
        }
    }

    /// The upstream handshake completed. Returns the queued frames in arrival
    /// order; the queue is gone afterwards. Does nothing unless connecting.
    pub fn on_upstream_open(&mut self) -> Vec<BridgeFrame> {
        match std::mem::replace(&mut self.state, SessionState::Open) {
            SessionState::Connecting { pending } => pending.into_iter().collect(),
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// A leg closed or failed. Returns true on the first close, when the
    /// other leg still needs to be torn down.
    pub fn on_close(&mut self, from: Side) -> bool {
        if self.is_closed() {
            return false;
        }
        if let SessionState::Connecting { pending } = &self.state {
            self.dropped += pending.len() as u64;
        }
        self.state = SessionState::Closed;
        self.closed_by = Some(from);
        true
    }

    /// A frame that could not be delivered to an open leg.
    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }
}
