mod api;
mod config;
mod engine;
mod error;
mod geo;
mod geocode;
mod models;
mod observability;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::geocode::NominatimClient;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let nominatim = Arc::new(NominatimClient::new(
        &config.geocoder_base_url,
        config.geocode_timeout(),
    )?);

    let (app_state, movement_rx) = state::AppState::new(
        config.search_radius_km,
        config.movement_queue_size,
        config.event_buffer_size,
        nominatim.clone(),
        nominatim,
    );
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::movement::run_movement_engine(
        shared_state.clone(),
        movement_rx,
        config.movement_steps,
        config.movement_interval(),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
