use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::Engine;
use crate::services::power::PowerGuard;

use super::api::{
    get_config, get_config_data, get_status, get_time_range, health_check, list_log_files,
    list_services, post_config_env, post_power, read_lines, search_logs, AppState,
};
use super::ws;

/// Builds and serves the HTTP/WebSocket surface, bound to
/// `listen` and torn down on `shutdown_rx` signalling graceful shutdown.
pub async fn run_server(
    engine: Arc<Engine>,
    root: PathBuf,
    power_guard: Arc<PowerGuard>,
    listen: String,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = AppState {
        engine,
        root,
        power_guard,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/services", get(list_services))
        .route("/api/services/:name/status", get(get_status))
        .route("/api/services/:name/power", post(post_power))
        .route("/api/services/:name/config", get(get_config))
        .route("/api/services/:name/config-data", get(get_config_data))
        .route("/api/services/:name/config/env", post(post_config_env))
        .route("/api/services/:name/logs/files", get(list_log_files))
        .route("/api/services/:name/logs/read", get(read_lines))
        .route("/api/services/:name/logs/time-range", get(get_time_range))
        .route("/api/services/:name/logs/search", post(search_logs))
        .route("/ws/logs/:name", get(ws::ws_handler))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(listen = %listen, "web server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&v| v).await;
            tracing::info!("web server shutting down gracefully");
        })
        .await?;

    Ok(())
}
