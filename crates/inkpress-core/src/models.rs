//! Core data model for the chapter conversion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// CHAPTER / PAGE
// =============================================================================

/// Reference to the chapter a job targets.
///
/// Chapters are owned by the surrounding application; the pipeline only needs
/// a stable id plus the denormalized path identity used for deterministic
/// output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub chapter_id: Uuid,
    pub manga_slug: String,
    pub volume: i32,
    pub chapter_number: i32,
}

impl ChapterRef {
    /// Deterministic storage path for one output page image.
    ///
    /// Format: `chapters/{manga-slug}/v{volume}/ch{chapter_number}/{page:03}.webp`
    pub fn page_image_path(&self, page_number: i32) -> String {
        format!(
            "chapters/{}/v{}/ch{}/{:03}.webp",
            self.manga_slug, self.volume, self.chapter_number, page_number
        )
    }
}

/// One rendered page image belonging to a chapter.
///
/// Rows are created exclusively by this pipeline; `page_number` is unique
/// within a chapter and defines reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub page_number: i32,
    pub image_path: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// CONVERSION JOB
// =============================================================================

/// Status of a conversion job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse the database string representation. Unknown strings fall back
    /// to `Pending`.
    pub fn from_str_or_pending(s: &str) -> Self {
        match s {
            "processing" => JobStatus::Processing,
            "done" => JobStatus::Done,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    /// Terminal statuses never transition again (except via a new job).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Render configuration carried by a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Minimum render DPI (72–200).
    pub dpi: i32,
    /// Target output pixel width (600–2200).
    pub max_width: i32,
    /// Lossy WebP quality (1–100).
    pub quality: i32,
    /// Delete the chapter's existing pages and restart numbering at 1.
    pub replace_existing: bool,
    /// Allow splitting very tall pages into multiple output images.
    pub split_long_pages: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dpi: defaults::DEFAULT_DPI,
            max_width: defaults::DEFAULT_MAX_WIDTH,
            quality: defaults::WEBP_QUALITY,
            replace_existing: true,
            split_long_pages: true,
        }
    }
}

impl RenderSettings {
    /// Validate against the submission contract bounds.
    pub fn validate(&self) -> Result<()> {
        if self.dpi < defaults::DPI_MIN || self.dpi > defaults::DPI_MAX {
            return Err(Error::InvalidInput(format!(
                "dpi must be in {}..={}, got {}",
                defaults::DPI_MIN,
                defaults::DPI_MAX,
                self.dpi
            )));
        }
        if self.max_width < defaults::MAX_WIDTH_MIN || self.max_width > defaults::MAX_WIDTH_MAX {
            return Err(Error::InvalidInput(format!(
                "max_width must be in {}..={}, got {}",
                defaults::MAX_WIDTH_MIN,
                defaults::MAX_WIDTH_MAX,
                self.max_width
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidInput(format!(
                "quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// A queued "convert this chapter's PDF" work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: Uuid,
    pub chapter: ChapterRef,
    /// Storage reference of the uploaded source PDF. Cleared once the job is
    /// done and the single-use blob has been deleted.
    pub pdf_path: Option<String>,
    pub status: JobStatus,
    /// Output images persisted so far.
    pub progress: i32,
    /// Expected output image count (known after planning).
    pub total: i32,
    pub settings: RenderSettings,
    /// Bounded error trace for failed runs; explanatory note for reclaimed
    /// jobs, overwritten on the next successful claim.
    pub error: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job submission contract consumed from the upload-handling collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub chapter: ChapterRef,
    pub pdf_path: String,
    #[serde(default)]
    pub settings: RenderSettings,
}

impl CreateJobRequest {
    /// Validate the submission before it reaches the queue.
    pub fn validate(&self) -> Result<()> {
        if self.pdf_path.is_empty() {
            return Err(Error::InvalidInput("pdf_path must not be empty".into()));
        }
        if self.chapter.manga_slug.is_empty() {
            return Err(Error::InvalidInput("manga_slug must not be empty".into()));
        }
        self.settings.validate()
    }
}

/// Job status contract exposed to the polling UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: i32,
    pub total: i32,
    pub error: String,
}
