//! Shared utilities for integration tests.
//!
//! Every mock binds `127.0.0.1:0`, so tests never fight over ports.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocketUpgrade},
        RawQuery, Request,
    },
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use edge_gateway::config::{GatewayConfig, ServiceOverride};
use edge_gateway::registry::{Registry, CANONICAL_SERVICES};
use edge_gateway::{GatewayServer, Shutdown};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;

/// One request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// An HTTP backend that answers every request the same way and records it.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

/// Start a backend returning `status` with a JSON `body` after `delay`.
pub async fn start_backend(status: u16, body: &'static str, delay: Duration) -> MockBackend {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = calls.clone();

    let app = Router::new().fallback(move |request: Request| {
        let recorder = recorder.clone();
        async move {
            let (parts, body_in) = request.into_parts();
            let bytes = axum::body::to_bytes(body_in, usize::MAX).await.unwrap_or_default();
            recorder.lock().unwrap().push(Recorded {
                method: parts.method,
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(str::to_owned),
                headers: parts.headers,
                body: bytes,
            });

            tokio::time::sleep(delay).await;
            Response::builder()
                .status(StatusCode::from_u16(status).unwrap())
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, calls }
}

/// What a mock WebSocket upstream observed.
#[derive(Debug, Default)]
pub struct WsLog {
    pub queries: Vec<Option<String>>,
    pub received: Vec<String>,
    pub client_closed: bool,
}

pub struct MockWsUpstream {
    pub addr: SocketAddr,
    pub log: Arc<Mutex<WsLog>>,
}

/// Start a `/ws/stream` upstream that delays its handshake by `delay`,
/// echoes text frames, and closes when it receives `"bye"`.
pub async fn start_ws_upstream(delay: Duration) -> MockWsUpstream {
    let log = Arc::new(Mutex::new(WsLog::default()));
    let shared = log.clone();

    let app = Router::new().route(
        "/ws/stream",
        get(move |RawQuery(query): RawQuery, ws: WebSocketUpgrade| {
            let log = shared.clone();
            async move {
                tokio::time::sleep(delay).await;
                log.lock().unwrap().queries.push(query);

                ws.on_upgrade(move |socket| async move {
                    let (mut tx, mut rx) = socket.split();
                    while let Some(Ok(message)) = rx.next().await {
                        match message {
                            Message::Text(text) => {
                                let text = text.as_str().to_owned();
                                log.lock().unwrap().received.push(text.clone());
                                if text == "bye" {
                                    let _ = tx.send(Message::Close(None)).await;
                                    return;
                                }
                                let _ = tx.send(Message::Text(text.into())).await;
                            }
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                    log.lock().unwrap().client_closed = true;
                })
                .into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockWsUpstream { addr, log }
}

/// A port nothing listens on.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Registry pointing `ports` at localhost and every other service at a
/// dead port.
pub fn registry_with(ports: &[(&str, u16)]) -> Registry {
    let dead = dead_port();
    let overrides: BTreeMap<String, ServiceOverride> = CANONICAL_SERVICES
        .iter()
        .map(|service| {
            let port = ports
                .iter()
                .find(|(name, _)| *name == service.name)
                .map(|(_, port)| *port)
                .unwrap_or(dead);
            (
                service.name.to_string(),
                ServiceOverride {
                    host: Some("127.0.0.1".to_string()),
                    port: Some(port),
                    health_path: None,
                },
            )
        })
        .collect();

    Registry::build(&overrides, |_| None).unwrap()
}

/// A running gateway. Dropping it does not stop the server; call `stop`.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig, registry: Registry) -> TestGateway {
    let server = GatewayServer::new(config, registry).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

/// HTTP client without pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
