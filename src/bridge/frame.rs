//! Frames carried across a bridge session.
//!
//! Both legs speak WebSocket, but through different libraries (axum on the
//! client side, tokio-tungstenite on the upstream side). Frames are converted
//! into one leg-neutral type at the edges.

use axum::body::Bytes;
use axum::extract::ws::Message as ClientMessage;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

/// A data frame relayed between legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeFrame {
    Text(String),
    Binary(Bytes),
}

/// Something that happened on one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegEvent {
    /// A data frame to relay.
    Frame(BridgeFrame),
    /// Ping, pong or raw frames; answered by the transport, not relayed.
    Control,
    /// The peer closed the leg, or the stream ended.
    Closed,
    /// The leg failed.
    Error(String),
}

impl From<ClientMessage> for LegEvent {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Text(text) => LegEvent::Frame(BridgeFrame::Text(text.as_str().to_owned())),
            ClientMessage::Binary(data) => LegEvent::Frame(BridgeFrame::Binary(data)),
            ClientMessage::Ping(_) | ClientMessage::Pong(_) => LegEvent::Control,
            ClientMessage::Close(_) => LegEvent::Closed,
        }
    }
}

impl From<UpstreamMessage> for LegEvent {
    fn from(message: UpstreamMessage) -> Self {
        match message {
            UpstreamMessage::Text(text) => LegEvent::Frame(BridgeFrame::Text(text.as_str().to_owned())),
            UpstreamMessage::Binary(data) => LegEvent::Frame(BridgeFrame::Binary(data)),
            UpstreamMessage::Ping(_) | UpstreamMessage::Pong(_) | UpstreamMessage::Frame(_) => {
                LegEvent::Control
            }
            UpstreamMessage::Close(_) => LegEvent::Closed,
        }
    }
}

impl From<BridgeFrame> for ClientMessage {
    fn from(frame: BridgeFrame) -> Self {
        match frame {
            BridgeFrame::Text(text) => ClientMessage::Text(text.into()),
            BridgeFrame::Binary(data) => ClientMessage::Binary(data),
        }
    }
}

impl From<BridgeFrame> for UpstreamMessage {
    fn from(frame: BridgeFrame) -> Self {
        match frame {
            BridgeFrame::Text(text) => UpstreamMessage::text(text),
            BridgeFrame::Binary(data) => UpstreamMessage::binary(data),
        }
    }
}

/// Map a transport read result onto a leg event.
pub fn leg_event<M, E>(item: Result<M, E>) -> LegEvent
where
    M: Into<LegEvent>,
    E: std::fmt::Display,
{
    match item {
        Ok(message) => message.into(),
        Err(e) => LegEvent::Error(e.to_string()),
    }
}
