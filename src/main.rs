//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http server ──▶ round-robin selector ──▶ hyper client ──▶ Backend
//!   Client ◀── http server ◀────────────────────────── hyper client ◀── Backend
//!                                   │
//!                                   │ healthy subset
//!                                   ▼
//!                           backend registry ◀── health prober ──▶ GET {backend}/health
//!                     (healthy, active, total)      (interval)
//! ```
//!
//! # Configuration
//! - `BACKEND_URLS`: comma-separated backend base addresses (required)
//! - `LB_PORT`: listen port (default 3000)
//! - `--config <file>`: optional TOML file with every other setting

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use lb_proxy::config::{load_config, ConfigOverrides};
use lb_proxy::lifecycle::{wait_for_signal, Shutdown};
use lb_proxy::observability::{logging, metrics};
use lb_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "lb-proxy")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides LB_PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// Comma-separated backend addresses (overrides BACKEND_URLS).
    #[arg(short, long)]
    backends: Option<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        port: cli.port,
        backends: cli.backends.clone(),
    };
    let config = load_config(cli.config.as_deref(), &overrides);

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.observability.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    logging::init_logging(&level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            return Err(e.into());
        }
    };

    tracing::info!(
        backends = config.backends.len(),
        port = config.listener.port,
        probe_interval_ms = config.health_check.interval_ms,
        forward_timeout_ms = config.forwarding.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
