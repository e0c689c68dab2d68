//! # inkpress-worker
//!
//! The conversion worker process. Polls the job queue, claims one job at a
//! time, renders its chapter PDF to WebP pages, and finalizes job status.
//!
//! Run as many worker processes as you want parallel chapters; they
//! coordinate only through the queue's row locks.

pub mod source;
pub mod throttle;
pub mod worker;

pub use source::{resolve_local_pdf, LocalPdf};
pub use throttle::ProgressThrottler;
pub use worker::{ConversionWorker, WorkerConfig, WorkerEvent, WorkerHandle};
