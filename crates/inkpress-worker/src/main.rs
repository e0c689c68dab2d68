//! Conversion worker binary.
//!
//! Environment:
//! - `DATABASE_URL` (required) — PostgreSQL connection string
//! - `MEDIA_ROOT` (default `./media`) — blob storage base directory
//! - `RUST_LOG` (default `info`) — tracing filter
//! - plus the `WORKER_*` variables documented on
//!   [`WorkerConfig::from_env`](inkpress_worker::WorkerConfig::from_env)

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use inkpress_core::{Error, LogNotifier, Result};
use inkpress_db::{Database, FilesystemStorage};
use inkpress_worker::{ConversionWorker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;
    let media_root = std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());

    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    info!("Database ready");

    let storage = FilesystemStorage::new(&media_root);
    if let Err(e) = storage.validate().await {
        error!(media_root = %media_root, error = %e, "Storage validation failed");
        return Err(Error::Storage(e));
    }
    info!(media_root = %media_root, "Storage ready");

    let config = WorkerConfig::from_env();
    let run_once = config.run_once;
    let worker = ConversionWorker::new(db, Arc::new(storage), Arc::new(LogNotifier), config);

    if run_once {
        // Single-shot mode drains the queue and returns on its own.
        let (_tx, mut rx) = tokio::sync::mpsc::channel(1);
        worker.run(&mut rx).await;
        return Ok(());
    }

    let handle = worker.start();
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    handle.shutdown().await?;
    Ok(())
}
