//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener last, once routing is ready
//! - Tie OS signals to graceful shutdown
//!
//! Logging is installed by the caller before this runs, so every step here
//! can report through tracing.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::lifecycle::{wait_for_shutdown_signal, Shutdown};
use crate::net::{load_tls_config, TlsError};
use crate::observability::metrics;
use crate::registry::{Registry, RegistryError};
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Routes(#[from] RouteError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn parse_addr(address: &str) -> Result<SocketAddr, StartupError> {
    address.parse().map_err(|source| StartupError::Address {
        address: address.to_string(),
        source,
    })
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        long_ms = config.timeouts.long_ms,
        short_ms = config.timeouts.short_ms,
        default_ms = config.timeouts.default_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let registry = Registry::from_env(&config.services)?;
    for endpoint in registry.iter() {
        tracing::info!(service = %endpoint.name(), upstream = %endpoint.base_url(), "Service registered");
    }

    let addr = parse_addr(&config.listener.bind_address)?;
    let tls = config.listener.tls.clone();
    let server = GatewayServer::new(config, registry)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    match tls {
        Some(tls) => {
            let tls = load_tls_config(&tls).await?;
            server.run_tls(addr, tls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
