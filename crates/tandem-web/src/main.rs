use std::process::ExitCode;

use clap::Parser;
use tandem_web::config::ServerConfig;
use tandem_web::{router, AppState};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

impl ServerError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Bind { .. } => 2,
            Self::Serve(_) => 10,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(ServerConfig::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "tandem exited");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let urls = config.api_urls();
    if urls.api1.is_none() || urls.api2.is_none() {
        tracing::warn!(
            api1 = urls.api1.is_some(),
            api2 = urls.api2.is_some(),
            "upstream url missing; aggregation requests will fail"
        );
    }

    let app = router(AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;

    tracing::info!(
        bind = %config.bind,
        results_path = %config.results_path.display(),
        timeout_secs = config.request_timeout_secs,
        "tandem listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
