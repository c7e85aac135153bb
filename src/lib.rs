pub mod api;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod db;
pub mod emergency;
pub mod lifecycle;
pub mod models;
pub mod records;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Initialize tracing and serve the portal until the process is stopped.
pub async fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("CareLink starting v{}", config::APP_VERSION);

    if let Err(e) = std::fs::create_dir_all(config::app_data_dir()) {
        tracing::error!("Cannot create data directory: {e}");
        return;
    }

    let core = Arc::new(core_state::CoreState::new());
    let addr = match config::DEFAULT_BIND_ADDR.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address: {e}");
            return;
        }
    };

    match api::start_portal_server(core, addr).await {
        Ok(server) => {
            tracing::info!(addr = %server.session.server_addr, "CareLink portal ready");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
        }
        Err(e) => tracing::error!("Failed to start portal server: {e}"),
    }
}
