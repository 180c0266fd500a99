use std::sync::Arc;
use std::time::Duration;

use driver_session::api;
use driver_session::backend::HttpTransport;
use driver_session::config::Config;
use driver_session::device::{FileStore, ReportedLocation};
use driver_session::error::AppError;
use driver_session::geo::maps::GoogleMaps;
use driver_session::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let transport = Arc::new(HttpTransport::new(config.backend_url.clone(), timeout)?);
    let maps = Arc::new(GoogleMaps::new(
        config.geocode_url.clone(),
        config.directions_url.clone(),
        config.maps_api_key.clone(),
        timeout,
    )?);
    let store = Arc::new(FileStore::open(config.store_path.clone()).await?);
    let device = Arc::new(ReportedLocation::new(config.device_fix));

    let app_state = Arc::new(AppState::new(
        transport,
        maps,
        store,
        device,
        config.session.clone(),
        config.event_buffer_size,
    ));
    let session = app_state.session.clone();

    let app = api::rest::router(app_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        backend = %config.backend_url,
        "driver console started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    session.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
