//! Centralized default constants for the inkpress pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. The renderer and the worker reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// OUTPUT FORMAT
// =============================================================================

/// Hard single-dimension ceiling of the WebP codec.
///
/// No produced image may exceed this in either dimension; all planning logic
/// exists to respect it without visible quality loss.
pub const WEBP_MAX_DIM: u32 = 16383;

/// Output height of one band when a long page is split.
///
/// Kept safely under [`WEBP_MAX_DIM`] so a band never has to be re-clamped
/// under normal operation.
pub const CHUNK_HEIGHT: u32 = 12_000;

/// Default lossy WebP quality.
pub const WEBP_QUALITY: i32 = 82;

// =============================================================================
// CROP DETECTION
// =============================================================================

/// Target pixel width of the cheap preview render used for margin detection.
pub const PREVIEW_TARGET_WIDTH: f32 = 700.0;

/// Preview render scale clamp range.
pub const PREVIEW_SCALE_MIN: f32 = 0.20;
pub const PREVIEW_SCALE_MAX: f32 = 2.0;

/// A pixel counts as content when its luma differs from white by more than
/// this intensity.
pub const CROP_WHITE_THRESHOLD: u8 = 18;

/// Pixels of outward padding applied to the detected content box so content
/// is never clipped.
pub const CROP_PAD_PX: u32 = 12;

/// Detected content narrower than this fraction of page width is treated as
/// a detection failure (sparse content) and not trimmed.
pub const CROP_MIN_CONTENT_RATIO: f32 = 0.35;

/// Content wider than this fraction of page width leaves margins too thin to
/// be worth trimming.
pub const CROP_MAX_CONTENT_RATIO: f32 = 0.65;

// =============================================================================
// SCALE PLANNING
// =============================================================================

/// Floor on the render scale regardless of targets.
pub const RENDER_SCALE_MIN: f32 = 0.10;

/// Upper bound on requested render DPI (also the planner's max-dpi cap).
pub const DPI_MAX: i32 = 200;

/// Lower bound on requested render DPI.
pub const DPI_MIN: i32 = 72;

/// Accepted range for the target output pixel width.
pub const MAX_WIDTH_MIN: i32 = 600;
pub const MAX_WIDTH_MAX: i32 = 2200;

/// Default render settings (match the original pipeline's admin defaults).
pub const DEFAULT_DPI: i32 = 144;
pub const DEFAULT_MAX_WIDTH: i32 = 1400;

// =============================================================================
// WORKER
// =============================================================================

/// Polling interval when the queue is empty (milliseconds).
pub const WORKER_POLL_INTERVAL_MS: u64 = 2_000;

/// Jobs stuck in `processing` longer than this are reclaimed (seconds).
/// Zero disables reclaiming.
pub const WORKER_STALE_AFTER_SECS: u64 = 1_800;

/// Progress flush: minimum seconds between DB updates.
pub const PROGRESS_MIN_INTERVAL_SECS: f64 = 0.5;

/// Progress flush: minimum page-count advance between DB updates.
pub const PROGRESS_MIN_STEP: i32 = 3;

/// Maximum stored length of a job error trace (characters).
pub const JOB_ERROR_MAX_LEN: usize = 4_000;

/// Stream-copy chunk size when fetching a remote PDF blob (bytes).
pub const BLOB_COPY_CHUNK: usize = 1024 * 1024;
