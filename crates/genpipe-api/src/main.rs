//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

use genpipe_api::{create_router, logging, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    logging::init_tracing("genpipe=info,genpipe_api=info,genpipe_client=info,genpipe_media=info");

    info!("Starting genpipe-api");

    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        max_concurrent_pipelines = ?config.max_concurrent_pipelines,
        "API config"
    );

    let state = AppState::new(config.clone()).context("failed to create application state")?;
    if !state.pipeline.orchestrator().client().has_credentials() {
        tracing::warn!("FAL_KEY is not set; generation requests will fail until it is configured");
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
