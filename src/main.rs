// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use proxy_healthz::{
    cli::Cli,
    config::{self, Config},
    health::HealthChecker,
    metrics::{start_metrics_server, MetricsRegistry},
    server::{RequestHandler, ServerBuilder},
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // --version exits here with status 0
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path).await?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    // Initialize tracing; RUST_LOG wins over --log-level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    config.validate().context("invalid configuration")?;

    info!(
        proxy_address = %config.proxy_address,
        target_address = %config.target_address,
        target_path = %config.target_path,
        probe_timeout_secs = config.probe_timeout_secs,
        "Configuration loaded"
    );

    let metrics = if config.metrics.enabled {
        let registry = Arc::new(MetricsRegistry::new()?);
        let collector = registry.collector();
        if let Err(e) =
            start_metrics_server(config.metrics.address, registry, config.metrics.path.clone())
                .await
        {
            error!("{:#}", e);
            std::process::exit(1);
        }
        Some(collector)
    } else {
        None
    };

    let checker = HealthChecker::from_config(&config, metrics)
        .context("error creating proxy client")?;
    let handler = RequestHandler::new(Arc::new(checker));

    warn!(address = %config.listen_address, version = VERSION, "Listening...");

    if let Err(e) = ServerBuilder::new(config.listen_address)
        .with_handler(handler)
        .serve(shutdown_signal())
        .await
    {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
