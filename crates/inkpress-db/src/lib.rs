//! # inkpress-db
//!
//! PostgreSQL layer for the inkpress chapter pipeline.
//!
//! This crate provides:
//! - Connection pool management
//! - The conversion job queue (claim with `FOR UPDATE SKIP LOCKED`,
//!   progress updates, stale reclaim)
//! - The rendered page repository
//! - A filesystem blob storage backend
//!
//! ## Example
//!
//! ```rust,ignore
//! use inkpress_db::Database;
//! use inkpress_core::{CreateJobRequest, JobRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/inkpress").await?;
//!     db.migrate().await?;
//!
//!     if let Some(job_id) = db.jobs.submit(&request).await? {
//!         println!("Queued job {job_id}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod jobs;
pub mod pages;
pub mod pool;
pub mod storage;

// Re-export core types
pub use inkpress_core::*;

pub use jobs::PgJobRepository;
pub use pages::PgPageRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use storage::FilesystemStorage;

/// Combined database context with both repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Conversion job queue.
    pub jobs: PgJobRepository,
    /// Rendered chapter pages.
    pub pages: PgPageRepository,
}

impl Database {
    /// Create a Database instance from an existing connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            pages: PgPageRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {e}")))?;
        Ok(())
    }
}
