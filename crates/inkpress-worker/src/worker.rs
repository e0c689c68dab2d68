//! Conversion worker: claims queued jobs and drives the renderer.
//!
//! Each worker process runs one job at a time; the row lock taken by the
//! claim query is the only coordination between workers. Parallelism across
//! chapters comes from running more worker processes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use inkpress_core::defaults::{WORKER_POLL_INTERVAL_MS, WORKER_STALE_AFTER_SECS};
use inkpress_core::{
    BlobStorage, CacheNotifier, ConversionJob, Error, JobRepository, PageRepository, Result,
};
use inkpress_db::Database;
use inkpress_render::{render_chapter, RenderEvent};

use crate::source::resolve_local_pdf;
use crate::throttle::ProgressThrottler;

const EVENT_BUS_CAPACITY: usize = 256;

/// Configuration for the conversion worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval when the queue is empty, in milliseconds.
    pub poll_interval_ms: u64,
    /// Processing jobs older than this many seconds are reclaimed;
    /// zero disables reclaiming.
    pub stale_after_secs: u64,
    /// Drain the queue once and exit instead of polling forever.
    pub run_once: bool,
    /// Whether to process jobs at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            stale_after_secs: WORKER_STALE_AFTER_SECS,
            run_once: false,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `WORKER_POLL_INTERVAL_MS` | `2000` | Polling interval when queue is empty |
    /// | `WORKER_STALE_AFTER_SECS` | `1800` | Stale-reclaim cutoff (0 disables) |
    /// | `WORKER_ONCE` | `false` | Drain the queue once, then exit |
    pub fn from_env() -> Self {
        let enabled = std::env::var("WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(WORKER_POLL_INTERVAL_MS);

        let stale_after_secs = std::env::var("WORKER_STALE_AFTER_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(WORKER_STALE_AFTER_SECS);

        let run_once = std::env::var("WORKER_ONCE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            poll_interval_ms,
            stale_after_secs,
            run_once,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the stale-reclaim cutoff.
    pub fn with_stale_after(mut self, secs: u64) -> Self {
        self.stale_after_secs = secs;
        self
    }

    /// Enable or disable single-shot mode.
    pub fn with_run_once(mut self, once: bool) -> Self {
        self.run_once = once;
        self
    }
}

/// Event emitted by the conversion worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was claimed and started.
    JobStarted { job_id: Uuid, chapter_id: Uuid },
    /// Persisted progress advanced.
    JobProgress {
        job_id: Uuid,
        done: i32,
        total: i32,
    },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, pages: i32 },
    /// A job failed.
    JobFailed { job_id: Uuid, error: String },
    /// Stale processing jobs were reset to pending.
    JobsReclaimed { count: u64 },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that claims conversion jobs and renders chapters.
pub struct ConversionWorker {
    db: Database,
    storage: Arc<dyn BlobStorage>,
    notifier: Arc<dyn CacheNotifier>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl ConversionWorker {
    pub fn new(
        db: Database,
        storage: Arc<dyn BlobStorage>,
        notifier: Arc<dyn CacheNotifier>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            db,
            storage,
            notifier,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the poll loop until shutdown (or, in single-shot mode, until the
    /// queue drains).
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Conversion worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            stale_after_secs = self.config.stale_after_secs,
            run_once = self.config.run_once,
            "Conversion worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Conversion worker received shutdown signal");
                break;
            }

            self.reclaim_stale().await;

            match self.db.jobs.claim_next().await {
                Ok(Some(job)) => {
                    self.execute_job(job).await;
                    // Immediately try the next claim; queue may be hot.
                }
                Ok(None) => {
                    if self.config.run_once {
                        info!("Queue drained, exiting (single-shot mode)");
                        break;
                    }
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Conversion worker received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Failed to claim job");
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(poll_interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Conversion worker stopped");
    }

    /// Reset processing jobs abandoned by a crashed worker.
    async fn reclaim_stale(&self) {
        if self.config.stale_after_secs == 0 {
            return;
        }
        let cutoff = chrono::Duration::seconds(self.config.stale_after_secs as i64);
        match self.db.jobs.reclaim_stale(cutoff).await {
            Ok(0) => {}
            Ok(count) => {
                let _ = self.event_tx.send(WorkerEvent::JobsReclaimed { count });
            }
            Err(e) => {
                error!(error = ?e, "Stale reclaim failed");
            }
        }
    }

    /// Execute a single claimed job and finalize its status.
    async fn execute_job(&self, job: ConversionJob) {
        let start = Instant::now();
        let job_id = job.id;
        let chapter_id = job.chapter.chapter_id;
        // Saved before completion clears the row's reference.
        let pdf_path = job.pdf_path.clone();

        info!(
            subsystem = "worker",
            %job_id,
            %chapter_id,
            manga = %job.chapter.manga_slug,
            chapter_number = job.chapter.chapter_number,
            "Processing job"
        );
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, chapter_id });

        match self.process(&job).await {
            Ok(pages) => {
                if let Err(e) = self.db.jobs.complete(job_id, pages).await {
                    error!(error = ?e, %job_id, "Failed to mark job as done");
                    return;
                }
                // Single-use input; only removed once the job is durably done.
                if let Some(path) = pdf_path {
                    if let Err(e) = self.storage.delete(&path).await {
                        warn!(error = ?e, blob_path = %path, "Failed to delete source PDF");
                    }
                }
                self.notifier.chapter_updated(&job.chapter).await;
                info!(
                    subsystem = "worker",
                    %job_id,
                    pages,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                let _ = self
                    .event_tx
                    .send(WorkerEvent::JobCompleted { job_id, pages });
            }
            Err(e) => {
                let error = e.to_string();
                // PDF blob left intact for diagnosis.
                if let Err(fail_err) = self.db.jobs.fail(job_id, &error).await {
                    error!(error = ?fail_err, %job_id, "Failed to mark job as failed");
                } else {
                    warn!(
                        subsystem = "worker",
                        %job_id,
                        %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed"
                    );
                }
                let _ = self.event_tx.send(WorkerEvent::JobFailed { job_id, error });
            }
        }
    }

    /// Render the job's chapter and persist every output page.
    ///
    /// Returns the number of pages created. Any temp file fetched for remote
    /// storage is removed when this function returns, success or failure.
    async fn process(&self, job: &ConversionJob) -> Result<i32> {
        let blob_path = job
            .pdf_path
            .as_deref()
            .ok_or_else(|| Error::Job("job has no source PDF".into()))?;
        let pdf = resolve_local_pdf(self.storage.as_ref(), blob_path).await?;

        // Replace mode wipes the chapter first and restarts numbering at 1;
        // append mode continues from the current maximum.
        let start_number = if job.settings.replace_existing {
            let removed = self.db.pages.delete_for_chapter(job.chapter.chapter_id).await?;
            for path in &removed {
                if let Err(e) = self.storage.delete(path).await {
                    warn!(error = ?e, blob_path = %path, "Failed to delete replaced page image");
                }
            }
            if !removed.is_empty() {
                debug!(
                    subsystem = "worker",
                    job_id = %job.id,
                    removed = removed.len(),
                    "Deleted existing chapter pages"
                );
            }
            0
        } else {
            self.db.pages.max_page_number(job.chapter.chapter_id).await?
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<RenderEvent>();
        let settings = job.settings;
        let pdf_path_buf = pdf.path().to_path_buf();

        let render_task = tokio::task::spawn_blocking(move || {
            render_chapter(&pdf_path_buf, &settings, &mut |event| {
                tx.send(event)
                    .map_err(|_| Error::Job("render event channel closed".into()))
            })
        });

        let mut throttler = ProgressThrottler::new();
        let mut total: i32 = 0;
        let mut done: i32 = 0;
        let mut persist_error: Option<Error> = None;

        while let Some(event) = rx.recv().await {
            let outcome = match event {
                RenderEvent::Planned { total: planned } => {
                    total = planned as i32;
                    self.db.jobs.update_progress(job.id, 0, total).await
                }
                RenderEvent::Image(image) => {
                    let page_number = start_number + done + 1;
                    let image_path = job.chapter.page_image_path(page_number);
                    let persisted = async {
                        self.storage.write(&image_path, &image.bytes).await?;
                        self.db
                            .pages
                            .insert(
                                job.chapter.chapter_id,
                                page_number,
                                &image_path,
                                image.width as i32,
                                image.height as i32,
                            )
                            .await?;
                        Ok::<_, Error>(())
                    }
                    .await;
                    match persisted {
                        Ok(()) => {
                            done += 1;
                            if throttler.should_flush(done, total) {
                                let _ = self
                                    .event_tx
                                    .send(WorkerEvent::JobProgress { job_id: job.id, done, total });
                                self.db.jobs.update_progress(job.id, done, total).await
                            } else {
                                Ok(())
                            }
                        }
                        Err(e) => Err(e),
                    }
                }
            };
            if let Err(e) = outcome {
                persist_error = Some(e);
                // Dropping the receiver makes the next sink send fail,
                // which aborts the blocking render.
                break;
            }
        }
        drop(rx);

        let render_result = render_task
            .await
            .map_err(|e| Error::Internal(format!("render task panicked: {e}")))?;

        if let Some(e) = persist_error {
            return Err(e);
        }
        let summary = render_result?;
        Ok(summary.emitted as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, WORKER_POLL_INTERVAL_MS);
        assert_eq!(config.stale_after_secs, WORKER_STALE_AFTER_SECS);
        assert!(!config.run_once);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_poll_interval(250)
            .with_stale_after(60)
            .with_run_once(true);

        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.stale_after_secs, 60);
        assert!(config.run_once);
    }

    #[test]
    fn test_worker_event_clone_and_debug() {
        let job_id = Uuid::new_v4();
        let event = WorkerEvent::JobProgress {
            job_id,
            done: 5,
            total: 40,
        };
        let copy = event.clone();
        match copy {
            WorkerEvent::JobProgress { done, total, .. } => {
                assert_eq!(done, 5);
                assert_eq!(total, 40);
            }
            _ => panic!("wrong variant"),
        }
        assert!(format!("{event:?}").contains("JobProgress"));
    }
}
