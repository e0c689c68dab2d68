//! # inkpress-core
//!
//! Core types, traits, and abstractions for the inkpress chapter pipeline.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other inkpress crates depend on: the conversion job model, the
//! repository and storage seams, and the shared constants that the renderer
//! and worker agree on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::{
    ChapterRef, ConversionJob, CreateJobRequest, JobStatus, JobStatusView, Page, RenderSettings,
};
pub use traits::{BlobStorage, CacheNotifier, JobRepository, LogNotifier, PageRepository};
pub use uuid_utils::new_v7;
