/// Main entry point for the chart data feed
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use halochart::{
    api,
    config::{config_path, load_config},
    dex::HaloDexClient,
    scheduler::spawn_sync_scheduler,
    utils::init_logging,
    AppContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path(std::env::args().nth(1));
    let config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;

    init_logging(&config);
    info!("Starting halochart with {}", path.display());

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind, config.port))?;

    let source = Arc::new(HaloDexClient::new(&config.halodex)?);
    let ctx = AppContext::new(config, source);

    let scheduler = spawn_sync_scheduler(Arc::clone(&ctx));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Datafeed listening on http://{}", addr);

    axum::serve(listener, api::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received - initiating graceful shutdown");
}
