//! Main entry point for the trade-history-ingestor CLI

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use trade_history_ingestor::cli::{Cli, Commands};
use trade_history_ingestor::metrics;
use trade_history_ingestor::shutdown::{self, ShutdownCoordinator};

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trade_history_ingestor=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Install global shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing current interval and flushing...");
                shutdown.request_shutdown();
            }
        }
    });

    // Optional Prometheus exporter
    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr).await {
            error!("Failed to initialize metrics exporter: {}", e);
            std::process::exit(1);
        }
    }

    // Execute command
    let result = match cli.command {
        Commands::Ingest(ref args) => args
            .execute(&cli, shutdown.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
    };

    // Handle result
    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
