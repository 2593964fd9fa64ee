use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use server::config::{AppConfig, StorageBackend, StorageConfig};
use server::state::AppState;
use server::{database, guards, jobs, notify, seed};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.auth.jwt_secret.len() < 32 {
        anyhow::bail!("auth.jwt_secret must be at least 32 bytes");
    }

    info!("Connecting to database...");
    let db = database::init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;
    seed::ensure_admin(&db, &config.auth).await?;

    let store = build_store(&config.storage).await?;
    let mailer = notify::build_mailer(&config.mail)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;
    let scheduler_interval = config.cron.interval_secs;

    let state = AppState::new(config, db.clone(), store, mailer);

    if scheduler_interval > 0 {
        tokio::spawn(jobs::run_scheduler(
            db,
            Duration::from_secs(scheduler_interval),
        ));
    }
    tokio::spawn(guards::run_sweeper(state.clone(), SWEEP_INTERVAL));

    let app = server::build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn build_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store =
                FilesystemObjectStore::new(PathBuf::from(&config.path), config.max_upload_size)
                    .await?;
            info!(path = %config.path, "Using filesystem storage");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .context("storage.s3 must be set for the s3 backend")?;
            let store = S3ObjectStore::new(s3, config.max_upload_size)?;
            info!(bucket = %s3.bucket, "Using S3 storage");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
