use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};

use tollgate::config::TollgateConfig;
use tollgate::http::HttpServer;
use tollgate::ratelimit::{AdmissionLimiter, SystemClock};

/// Request admission service with fixed-window rate limiting.
#[derive(Debug, Parser)]
#[command(name = "tollgate", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Tollgate Admission Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => TollgateConfig::from_file(path)?,
        None => TollgateConfig::default(),
    };
    let policies = config.policies.to_policy_set()?;
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    // Initialize the admission limiter
    let limiter = Arc::new(AdmissionLimiter::with_sweep_interval(
        Arc::new(SystemClock),
        config.limiter.cleanup_interval_secs as i64 * 1000,
    ));
    info!("Admission limiter initialized");

    // Create and start the HTTP server
    let server = HttpServer::new(config.server.http_addr, limiter, policies);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tollgate Admission Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
