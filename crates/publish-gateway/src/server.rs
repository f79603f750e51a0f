//! Server startup and lifecycle

use crate::{middleware, routes, AppState, GatewayConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// How often idle rate limiter keys are dropped
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

async fn bind(config: &GatewayConfig) -> anyhow::Result<(Arc<AppState>, TcpListener)> {
    tokio::fs::create_dir_all(&config.upload_path).await?;
    let state = Arc::new(AppState::new(config.clone())?);
    middleware::spawn_limiter_pruning(Arc::clone(&state.rate_limiter), LIMITER_PRUNE_INTERVAL);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Publish gateway listening on http://{}", addr);

    Ok((state, listener))
}

/// Run the gateway server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let (state, listener) = bind(&config).await?;
    let app = routes::create_router(state);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (state, listener) = bind(&config).await?;
    let app = routes::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Gateway shutdown complete");

    Ok(())
}
