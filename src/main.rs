use std::sync::Arc;

use eco_logistics::api;
use eco_logistics::config::Config;
use eco_logistics::error::AppError;
use eco_logistics::observability::metrics::Metrics;
use eco_logistics::optimizer::{self, OptimizerState};
use eco_logistics::state::AppState;
use eco_logistics::store::InMemoryPickupStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let metrics = Metrics::new();
    let shared_state = Arc::new(AppState::with_store(
        Arc::new(InMemoryPickupStore::new()),
        config.event_buffer_size,
        metrics.clone(),
    ));

    let app = api::rest::router(shared_state);
    let optimizer_app = optimizer::router(OptimizerState {
        metrics,
        default_weight_kg: config.default_shipment_weight_kg,
    });

    let optimizer_addr = format!("0.0.0.0:{}", config.optimizer_port);
    let optimizer_listener = tokio::net::TcpListener::bind(&optimizer_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {optimizer_addr}: {err}")))?;

    tokio::spawn(async move {
        tracing::info!(optimizer_port = %optimizer_addr, "optimizer server started");
        if let Err(err) = axum::serve(optimizer_listener, optimizer_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %err, "optimizer server failed");
        }
    });

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "pickup store started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
