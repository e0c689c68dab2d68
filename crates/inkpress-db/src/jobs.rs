//! Conversion job queue repository.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use inkpress_core::{
    defaults, new_v7, ChapterRef, ConversionJob, CreateJobRequest, Error, JobRepository,
    JobStatus, JobStatusView, RenderSettings, Result,
};

/// PostgreSQL implementation of [`JobRepository`].
#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse a job row into a ConversionJob struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> ConversionJob {
        ConversionJob {
            id: row.get("id"),
            chapter: ChapterRef {
                chapter_id: row.get("chapter_id"),
                manga_slug: row.get("manga_slug"),
                volume: row.get("volume"),
                chapter_number: row.get("chapter_number"),
            },
            pdf_path: row.get("pdf_path"),
            status: JobStatus::from_str_or_pending(row.get("status")),
            progress: row.get("progress"),
            total: row.get("total"),
            settings: RenderSettings {
                dpi: row.get("dpi"),
                max_width: row.get("max_width"),
                quality: row.get("quality"),
                replace_existing: row.get("replace_existing"),
                split_long_pages: row.get("split_long_pages"),
            },
            error: row.get("error"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
        }
    }

    /// Truncate an error trace to the stored bound, respecting char
    /// boundaries.
    fn bound_error(error: &str) -> String {
        error.chars().take(defaults::JOB_ERROR_MAX_LEN).collect()
    }
}

const JOB_COLUMNS: &str = "id, chapter_id, manga_slug, volume, chapter_number, pdf_path, status, \
     progress, total, dpi, max_width, quality, replace_existing, split_long_pages, error, \
     created_at, started_at, finished_at";

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn submit(&self, request: &CreateJobRequest) -> Result<Option<Uuid>> {
        request.validate()?;

        let job_id = new_v7();
        let now = Utc::now();

        // Atomic check-and-insert prevents a TOCTOU race when concurrent
        // submissions target the same chapter; the unique partial index on
        // (chapter_id) WHERE status IN ('pending','processing') backs this up.
        let result = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO conversion_jobs \
                 (id, chapter_id, manga_slug, volume, chapter_number, pdf_path, status, \
                  dpi, max_width, quality, replace_existing, split_long_pages, created_at) \
             SELECT $1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, $10, $11, $12 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM conversion_jobs \
                 WHERE chapter_id = $2 AND status IN ('pending', 'processing') \
             ) \
             RETURNING id",
        )
        .bind(job_id)
        .bind(request.chapter.chapter_id)
        .bind(&request.chapter.manga_slug)
        .bind(request.chapter.volume)
        .bind(request.chapter.chapter_number)
        .bind(&request.pdf_path)
        .bind(request.settings.dpi)
        .bind(request.settings.max_width)
        .bind(request.settings.quality)
        .bind(request.settings.replace_existing)
        .bind(request.settings.split_long_pages)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            // Two submissions can both pass the NOT EXISTS check; the index
            // rejects the loser, which is the same outcome as "already queued".
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn claim_next(&self) -> Result<Option<ConversionJob>> {
        let now = Utc::now();

        // FOR UPDATE SKIP LOCKED: N workers never double-process a job and
        // never block on each other's claim. This is the sole mutual-
        // exclusion boundary of the pipeline.
        let query = format!(
            "UPDATE conversion_jobs \
             SET status = 'processing', started_at = $1, finished_at = NULL, \
                 error = '', progress = 0, total = 0 \
             WHERE id = ( \
                 SELECT id FROM conversion_jobs \
                 WHERE status = 'pending' \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        if let Some(ref r) = row {
            debug!(
                subsystem = "db",
                component = "jobs",
                op = "claim_next",
                job_id = %r.get::<Uuid, _>("id"),
                "Claimed pending job"
            );
        }
        Ok(row.map(Self::parse_job_row))
    }

    async fn update_progress(&self, job_id: Uuid, done: i32, total: i32) -> Result<()> {
        sqlx::query("UPDATE conversion_jobs SET progress = $1, total = $2 WHERE id = $3")
            .bind(done.max(0))
            .bind(total.max(0))
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, final_count: i32) -> Result<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = 'done', finished_at = $1, progress = $2, total = $2, \
                 error = '', pdf_path = NULL \
             WHERE id = $3",
        )
        .bind(now)
        .bind(final_count.max(0))
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = 'failed', finished_at = $1, error = $2 \
             WHERE id = $3",
        )
        .bind(now)
        .bind(Self::bound_error(error))
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn reclaim_stale(&self, older_than: Duration) -> Result<u64> {
        let cutoff = Utc::now() - older_than;

        let result = sqlx::query(
            "UPDATE conversion_jobs \
             SET status = 'pending', error = 'Reclaimed: stale processing job.', \
                 progress = 0, total = 0, started_at = NULL, finished_at = NULL \
             WHERE status = 'processing' AND started_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let reclaimed = result.rows_affected();
        if reclaimed > 0 {
            warn!(
                subsystem = "db",
                component = "jobs",
                op = "reclaim_stale",
                reclaimed,
                "Reset stale processing jobs to pending"
            );
        }
        Ok(reclaimed)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<ConversionJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM conversion_jobs WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn status(&self, job_id: Uuid) -> Result<Option<JobStatusView>> {
        let row = sqlx::query(
            "SELECT status, progress, total, error FROM conversion_jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| JobStatusView {
            status: JobStatus::from_str_or_pending(r.get("status")),
            progress: r.get("progress"),
            total: r.get("total"),
            error: r.get("error"),
        }))
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversion_jobs WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }
}
