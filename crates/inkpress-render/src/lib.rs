//! # inkpress-render
//!
//! PDF-to-WebP page rendering for the inkpress chapter pipeline.
//!
//! This crate provides:
//! - Content-aware horizontal margin detection ([`crop`])
//! - Render scale and band planning ([`plan`])
//! - The two-pass chapter renderer ([`renderer`])
//!
//! The renderer is synchronous and CPU-bound by design; run it via
//! `tokio::task::spawn_blocking` from async contexts.

pub mod crop;
pub mod plan;
pub mod renderer;

pub use crop::{detect_margins, CropMargins};
pub use plan::{plan_page, plan_scale, PagePlan};
pub use renderer::{render_chapter, EncodedImage, RenderEvent, RenderSummary};
