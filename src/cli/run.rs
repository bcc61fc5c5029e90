use crate::config::parse::{load_engine_config, ConfigError};
use crate::engine::Engine;
use crate::web;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("web server error: {0}")]
    WebServer(String),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), RunError> {
    let config = load_engine_config(config_path.as_deref())?;
    tracing::info!(root = %config.root.display(), listen = %config.listen, "starting harborctl");

    let engine = Arc::new(Engine::new(&config));
    let power_guard = Arc::new(crate::services::power::PowerGuard::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_engine = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::warn!(error = %e, "error awaiting shutdown signal");
        }
        tracing::info!("shutdown signal received");
        server_engine.shutdown();
        let _ = shutdown_tx.send(true);
    });

    web::server::run_server(engine, config.root.clone(), power_guard, config.listen, shutdown_rx)
        .await
        .map_err(|e| RunError::WebServer(e.to_string()))?;

    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
