mod app;
mod cli;
mod config;
mod error;
mod handlers;
mod model;
mod owner;
mod state;
mod subnet;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use burrow_core::{Repository, StorageError};
use burrow_generator::RandomGenerator;
use burrow_shortener::{deletion_queue, DeletionWorker, Shutdown, ShortenerService};
use burrow_storage::{FileRepository, PostgresRepository};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::App;
use crate::cli::CLI;
use crate::config::Config;
use crate::state::AppState;
use crate::subnet::TrustedSubnet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CLI::parse();
    let config = Config::resolve(&cli)?;
    telemetry::init(config.log_format);

    info!(
        server_address = %config.server_address,
        base_url = %config.base_url,
        file_storage_path = %config.file_storage_path.display(),
        database = config.database_dsn.is_some(),
        enable_https = config.enable_https,
        trusted_subnet = config.trusted_subnet.as_deref().unwrap_or(""),
        log_format = %config.log_format,
        "starting burrow"
    );
    if config.enable_https {
        warn!("https requested; TLS is expected to be terminated by a fronting proxy");
    }

    let repository = open_repository(&config).await?;

    let shutdown = Shutdown::new();
    let (queue, receiver) = deletion_queue();
    let worker = DeletionWorker::new(Arc::clone(&repository), receiver, shutdown.signal()).spawn();

    let service = ShortenerService::new(repository, RandomGenerator::new(), &config.base_url, queue);
    let state = AppState::new(Arc::new(service)).with_trusted_subnet(trusted_subnet(&config));
    let router = App::router(state);

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    info!(listen_addr = %listener.local_addr()?, "serving http");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    info!("http server stopped, waiting for the deletion worker");
    shutdown.trigger();
    worker.await?;

    info!("bye");
    Ok(())
}

/// PostgreSQL when a DSN is configured and reachable, the file backend
/// otherwise.
async fn open_repository(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    if let Some(dsn) = &config.database_dsn {
        match open_postgres(dsn).await {
            Ok(repository) => {
                info!("using postgres storage");
                return Ok(Arc::new(repository));
            }
            Err(err) => {
                warn!(error = %err, "postgres unavailable, falling back to file storage");
            }
        }
    }

    let repository = FileRepository::open(&config.file_storage_path)
        .await
        .with_context(|| {
            format!(
                "failed to open file storage at {}",
                config.file_storage_path.display()
            )
        })?;
    info!(
        path = %repository.path().display(),
        entries = repository.len().await,
        "using file storage"
    );
    Ok(Arc::new(repository))
}

async fn open_postgres(dsn: &str) -> Result<PostgresRepository, StorageError> {
    let repository = PostgresRepository::connect(dsn).await?;
    repository.migrate().await?;
    Ok(repository)
}

/// An absent or unparsable subnet closes the internal endpoints.
fn trusted_subnet(config: &Config) -> Option<TrustedSubnet> {
    let raw = config.trusted_subnet.as_deref()?;
    match raw.parse() {
        Ok(subnet) => Some(subnet),
        Err(err) => {
            error!(error = %err, "invalid trusted subnet, internal endpoints are closed");
            None
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
