//! Repository and port traits implemented by the storage layers.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChapterRef, ConversionJob, CreateJobRequest, JobStatusView, Page};

/// Repository for the persisted conversion job queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Submit a new conversion job.
    ///
    /// Returns `None` when the chapter already has a pending or processing
    /// job; at most one live job exists per chapter.
    async fn submit(&self, request: &CreateJobRequest) -> Result<Option<Uuid>>;

    /// Atomically claim the oldest pending job, skipping rows locked by
    /// other workers. The claimed job is flipped to `processing` with
    /// `started_at` stamped and progress/total/error reset.
    async fn claim_next(&self) -> Result<Option<ConversionJob>>;

    /// Persist progress counters for a running job.
    async fn update_progress(&self, job_id: Uuid, done: i32, total: i32) -> Result<()>;

    /// Mark a job done: `progress = total = final_count`, error cleared,
    /// `finished_at` stamped, and the consumed `pdf_path` cleared.
    async fn complete(&self, job_id: Uuid, final_count: i32) -> Result<()>;

    /// Mark a job failed with a bounded error trace. The source PDF
    /// reference is left intact for diagnosis.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Reset `processing` jobs whose `started_at` is older than the cutoff
    /// back to `pending`. Returns the number of reclaimed jobs.
    async fn reclaim_stale(&self, older_than: Duration) -> Result<u64>;

    /// Get a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<ConversionJob>>;

    /// Status/progress view for the polling UI.
    async fn status(&self, job_id: Uuid) -> Result<Option<JobStatusView>>;

    /// Count of pending jobs.
    async fn pending_count(&self) -> Result<i64>;
}

/// Repository for rendered chapter pages.
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Insert one page row.
    async fn insert(
        &self,
        chapter_id: Uuid,
        page_number: i32,
        image_path: &str,
        width: i32,
        height: i32,
    ) -> Result<Uuid>;

    /// Highest page number currently stored for the chapter (0 when empty).
    async fn max_page_number(&self, chapter_id: Uuid) -> Result<i32>;

    /// Delete all pages of a chapter, returning the removed image paths so
    /// the caller can also drop the blobs.
    async fn delete_for_chapter(&self, chapter_id: Uuid) -> Result<Vec<String>>;

    /// Pages of a chapter in reading order.
    async fn list_for_chapter(&self, chapter_id: Uuid) -> Result<Vec<Page>>;
}

/// Storage backend for binary blobs (uploaded PDFs, rendered page images).
///
/// Abstracts over filesystem or object storage providers. The worker only
/// ever needs a readable local path for the PDF it renders; backends that
/// cannot provide one return `None` from [`local_path`](Self::local_path)
/// and the worker stream-copies through [`read`](Self::read) instead.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Read at most `len` bytes starting at `offset`.
    ///
    /// Returns an empty buffer at end of blob. Lets callers stream large
    /// blobs in bounded chunks instead of buffering them whole.
    async fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete data at the specified path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Resolve a blob to a local filesystem path, if the backend has one.
    fn local_path(&self, path: &str) -> Option<PathBuf>;
}

/// Downstream cache invalidation port.
///
/// Called after a job commits `Done` so web-layer caches can bust entries
/// for the updated chapter. Modeled as an explicit port, not an implicit
/// event system.
#[async_trait]
pub trait CacheNotifier: Send + Sync {
    /// Notify that a chapter's page set changed.
    async fn chapter_updated(&self, chapter: &ChapterRef);
}

/// Notifier that only logs the invalidation.
pub struct LogNotifier;

#[async_trait]
impl CacheNotifier for LogNotifier {
    async fn chapter_updated(&self, chapter: &ChapterRef) {
        tracing::info!(
            chapter_id = %chapter.chapter_id,
            manga = %chapter.manga_slug,
            chapter_number = chapter.chapter_number,
            "Chapter pages updated; downstream caches should invalidate"
        );
    }
}
