//! HTTP surface for the weather cache.

pub mod bootstrap;
pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::Router;
use skycache_core::ServerConfig;
use skycache_service::WeatherCacheService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use bootstrap::build_service;
pub use error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherCacheService>,
}

impl AppState {
    pub fn new(service: WeatherCacheService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::weather_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C.
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
