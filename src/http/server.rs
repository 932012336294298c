//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every gateway handler
//! - Wire up middleware (request ID, tracing, body limit)
//! - Serve on a plain or TLS listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::bridge::GATEWAY_BRIDGES;
use crate::config::GatewayConfig;
use crate::health::HealthAggregator;
use crate::http::health::{gateway_health, services_health};
use crate::http::proxy::{fixed_route_handler, proxy_handler, Forwarder};
use crate::http::request::ForwardingPolicy;
use crate::http::websocket::bridge_handler;
use crate::registry::Registry;
use crate::routing::{RouteError, RouteTable};

/// How long in-flight requests may drain after shutdown on the TLS path.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub routes: Arc<RouteTable>,
    pub forwarder: Forwarder,
    pub health: Arc<HealthAggregator>,
    pub handshake_timeout: Duration,
    pub max_body_size: usize,
}

/// The gateway's HTTP front.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Build the server. Fails if a route names a service the registry
    /// does not hold.
    pub fn new(config: GatewayConfig, registry: Registry) -> Result<Self, RouteError> {
        let routes = RouteTable::gateway(&config.timeouts)?;
        routes.validate(&registry)?;

        let registry = Arc::new(registry);
        let health = HealthAggregator::new(
            registry.clone(),
            Duration::from_millis(config.health.probe_timeout_ms),
        );

        let state = AppState {
            registry,
            routes: Arc::new(routes),
            forwarder: Forwarder::new(
                ForwardingPolicy::gateway(),
                config.security.max_response_size,
            ),
            health: Arc::new(health),
            handshake_timeout: Duration::from_millis(config.bridge.handshake_timeout_ms),
            max_body_size: config.security.max_body_size,
        };

        tracing::info!(
            services = state.registry.len(),
            prefixes = state.routes.len(),
            fixed_routes = state.routes.fixed_routes().len(),
            bridges = GATEWAY_BRIDGES.len(),
            "Gateway routes compiled"
        );

        let router = Self::build_router(state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let max_body_size = state.max_body_size;

        let mut router: Router<AppState> = Router::new()
            .route("/health", get(gateway_health))
            .route("/health/services", get(services_health));

        for fixed in state.routes.fixed_routes() {
            router = router.route(&fixed.path, get(fixed_route_handler));
        }
        for bridge in GATEWAY_BRIDGES {
            router = router.route(bridge.path, get(bridge_handler));
        }

        router
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plain HTTP until a shutdown signal arrives, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = false, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS until a shutdown signal arrives, then drain.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, tls = true, "HTTP server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server draining");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn unreachable_registry() -> Registry {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);
        Registry::from_lookup(|key| {
            if key.ends_with("_HOST") {
                Some("127.0.0.1".to_string())
            } else if key.ends_with("_PORT") {
                Some(port.clone())
            } else {
                None
            }
        })
        .unwrap()
    }

    fn server() -> GatewayServer {
        let mut config = GatewayConfig::default();
        config.health.probe_timeout_ms = 500;
        GatewayServer::new(config, unreachable_registry()).unwrap()
    }

    #[tokio::test]
    async fn test_gateway_health_route() {
        let response = server()
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unmatched_path_is_404() {
        let response = server()
            .router()
            .oneshot(Request::get("/nowhere/at/all").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_services_health_is_200_when_all_down() {
        let response = server()
            .router()
            .oneshot(Request::get("/health/services").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["services"]["llm-router"]["status"], "down");
    }

    #[tokio::test]
    async fn test_bridge_path_without_upgrade_is_rejected() {
        let response = server()
            .router()
            .oneshot(Request::get("/ws/voice").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
