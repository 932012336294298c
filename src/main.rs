//! Edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                 EDGE GATEWAY                 │
//!   Client request      │  ┌────────┐   ┌─────────────┐   ┌──────────┐ │
//!   ────────────────────┼─▶│  http  │──▶│   routing   │──▶│ registry │ │
//!                       │  │ server │   │ prefix/tier │   │ name→url │ │
//!                       │  └───┬────┘   └─────────────┘   └────┬─────┘ │
//!                       │      │                               ▼      │
//!                       │      │ /ws/*   ┌────────┐      ┌──────────┐  │     Backend
//!                       │      └────────▶│ bridge │      │ forwarder│──┼───▶ services
//!                       │                └────────┘      │ deadline │  │
//!                       │  /health/services ─▶ health    └──────────┘  │
//!                       │                                              │
//!                       │  config · observability · lifecycle · tls    │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle;
use edge_gateway::observability::init_logging;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Edge gateway for the platform's backend services", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging depends on config, so config errors go to stderr directly.
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("edge-gateway: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}
