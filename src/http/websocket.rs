//! WebSocket bridge handling.
//!
//! # Responsibilities
//! - Accept the client upgrade on a bridge path
//! - Open a fresh upstream connection for that client, bounded by the
//!   handshake timeout
//! - Adapt both legs to bridge frames and hand them to the session driver
//!
//! # Data Flow
//! ```text
//! Client ←── axum WebSocket ──→ Gateway ←── tokio-tungstenite ──→ Upstream
//! ```

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as ClientMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{future, SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite};
use url::Url;

use crate::bridge::{
    find_bridge, leg_event, run_session, BridgeEndpoint, BridgeError, BridgeFrame, BridgeSession,
};
use crate::http::server::AppState;
use crate::registry::RegistryError;

/// Upgrade handler mounted on every bridge path.
pub async fn bridge_handler(
    State(state): State<AppState>,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(bridge) = find_bridge(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Resolution happens now; a failure surfaces as an upstream connect error
    // once the client is upgraded.
    let upstream = state
        .registry
        .resolve(bridge.service)
        .map(|endpoint| endpoint.ws_url(bridge.upstream_path, uri.query()));
    let handshake = state.handshake_timeout;

    ws.on_upgrade(move |socket| bridge_socket(socket, bridge, upstream, handshake))
}

async fn bridge_socket(
    socket: WebSocket,
    bridge: &'static BridgeEndpoint,
    upstream: Result<Url, RegistryError>,
    handshake: Duration,
) {
    let (client_tx, client_rx) = socket.split();
    let client_tx = client_tx
        .with(|frame: BridgeFrame| future::ready(Ok::<_, axum::Error>(ClientMessage::from(frame))));
    let client_rx = client_rx.map(leg_event);

    let session = BridgeSession::new(bridge.path);
    let session_id = session.id();

    let connect = async move {
        let url = upstream?;
        tracing::debug!(session_id = %session_id, upstream = %url, "Connecting upstream");

        let (stream, _) = tokio::time::timeout(handshake, connect_async(url.as_str()))
            .await
            .map_err(|_| BridgeError::HandshakeTimeout(handshake.as_millis() as u64))?
            .map_err(|e| BridgeError::Handshake(e.to_string()))?;

        let (upstream_tx, upstream_rx) = stream.split();
        let upstream_tx = upstream_tx.with(|frame: BridgeFrame| {
            future::ready(Ok::<_, tungstenite::Error>(tungstenite::Message::from(frame)))
        });
        Ok::<_, BridgeError>((upstream_tx, upstream_rx.map(leg_event)))
    };

    run_session(session, client_tx, client_rx, connect).await;
}
