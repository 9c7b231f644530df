pub mod api; // JSON HTTP API
pub mod config;
pub mod core_state; // Shared request state
pub mod db;
pub mod models;
pub mod prediction; // External prediction service client
pub mod schedule; // Appointment lateness + dashboard metrics
pub mod therapy; // Trend classifier, derived metrics, cohort rollup

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Database(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::Config::from_env()?;
    let core = Arc::new(core_state::CoreState::from_config(&config));

    // Fail fast on an unusable database and apply migrations once up front.
    core.open_db()?;
    tracing::info!(db = %config.db_path.display(), "Database ready");
    tracing::info!(url = %config.prediction_url, "Prediction service configured");

    let server = api::start_server(Arc::clone(&core), config.bind_addr, &config.cors_origins).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.stop().await;
    Ok(())
}
