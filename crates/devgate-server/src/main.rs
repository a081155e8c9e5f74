//! devgate server: application entry point.

mod config;

use devgate_api::AppState;
use devgate_auth::{AccountService, AuthError, TokenService};
use devgate_db::{DbError, DbManager};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Db(#[from] DbError),

    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devgate=info,info")),
        )
        .json()
        .init();

    tracing::info!("Starting devgate server...");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "devgate server failed");
        std::process::exit(1);
    }

    tracing::info!("devgate server stopped.");
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let db = DbManager::connect(&config.db).await?;

    let tokens = TokenService::new(&config.auth)?;
    let service = AccountService::new(db.accounts(), tokens, config.auth);
    if config.api.admin_key.is_none() {
        tracing::warn!("DEVGATE_ADMIN_KEY unset; operator routes will refuse every request");
    }
    let app = devgate_api::router(AppState::new(service, config.api));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
