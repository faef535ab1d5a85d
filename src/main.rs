use std::{process::ExitCode, sync::Arc};

use log::info;
use tracker_domain::{
    repository::RepoError,
    service::{ArcMatchService, MatchServiceImpl},
};
use tracker_http_api::AppState;
use tracker_persistence::open_repository;

use crate::config::{AppConfig, ConfigError};

mod config;
mod logs;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] logs::LogError),
    #[error("failed to initialize storage: {0}")]
    Storage(#[from] RepoError),
    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

async fn serve(config: AppConfig) -> Result<(), StartupError> {
    let repository = open_repository(&config.storage).await?;
    let match_service: ArcMatchService = Arc::new(MatchServiceImpl::new(repository));

    info!(
        "Match tracker running on http://{} ({} storage)",
        config.http.addr,
        config.storage.describe()
    );

    tracker_http_api::run(AppState { match_service }, config.http, shutdown_signal()).await?;
    Ok(())
}

fn init() -> Result<AppConfig, StartupError> {
    let config = AppConfig::from_env()?;
    logs::init_logger(&config.log)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env file is fine, the environment may already be set
    dotenvy::dotenv().ok();

    let config = match init() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
