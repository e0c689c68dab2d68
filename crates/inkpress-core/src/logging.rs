//! Structured logging field name constants for inkpress.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), job completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-page iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "render", "worker", "storage"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "crop", "planner", "claim"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "claim_next", "render_chapter", "reclaim_stale"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Conversion job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Target chapter UUID.
pub const CHAPTER_ID: &str = "chapter_id";

/// Output page number.
pub const PAGE_NUMBER: &str = "page_number";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of source PDF pages.
pub const SOURCE_PAGES: &str = "source_pages";

/// Number of output images planned for a job.
pub const PLANNED_TOTAL: &str = "planned_total";

/// Number of output images persisted so far.
pub const PAGES_CREATED: &str = "pages_created";
