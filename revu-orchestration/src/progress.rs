//! Worker-side progress reporting
//!
//! Every update checks the cancel flag, mirrors progress into the queue's own
//! record, writes the PROGRESS envelope and refreshes the lock. Only the
//! cancel check can stop the job; everything else is best-effort.

use async_trait::async_trait;
use revu_interfaces::{Cancelled, Checkpoint, NativeTaskStatus, TaskQueue};
use serde_json::json;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cancel::CancellationChannel;
use crate::error::BestEffort;
use crate::lock::ScrapeLock;
use crate::status::StatusWriter;

/// Progress callback handed to a running job
pub struct ProgressReporter {
    task_id: String,
    queue: Arc<dyn TaskQueue>,
    channel: CancellationChannel,
    writer: StatusWriter,
    lock: ScrapeLock,
    last_pct: AtomicU8,
    cancelled: CancellationToken,
}

impl ProgressReporter {
    pub fn new(
        task_id: impl Into<String>,
        queue: Arc<dyn TaskQueue>,
        channel: CancellationChannel,
        writer: StatusWriter,
        lock: ScrapeLock,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            queue,
            channel,
            writer,
            lock,
            last_pct: AtomicU8::new(0),
            cancelled: CancellationToken::new(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Highest progress reported so far
    pub fn progress(&self) -> u8 {
        self.last_pct.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// Resolves once any checkpoint has seen the cancel flag
    pub async fn cancelled(&self) {
        self.cancelled.cancelled().await
    }

    /// Poll the cancel flag. An unreadable flag is treated as "not cancelled".
    pub async fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.cancelled.is_cancelled() {
            return Err(Cancelled);
        }
        match self.channel.is_requested(&self.task_id).await {
            Ok(true) => {
                info!("Cancellation requested for {}", self.task_id);
                self.cancelled.cancel();
                Err(Cancelled)
            }
            Ok(false) => Ok(()),
            Err(e) => {
                warn!("Cancel check for {} failed, proceeding: {}", self.task_id, e);
                Ok(())
            }
        }
    }

    /// Report `pct` percent complete.
    ///
    /// Progress never moves backwards; a lower value re-reports the current one.
    pub async fn update(&self, pct: u8) -> Result<(), Cancelled> {
        self.check_cancelled().await?;

        let pct = pct.min(100);
        let pct = self.last_pct.fetch_max(pct, Ordering::SeqCst).max(pct);

        self.queue
            .update_native_state(
                &self.task_id,
                NativeTaskStatus::new("PROGRESS", Some(json!({ "progress": pct }))),
            )
            .await
            .best_effort("Native progress update");

        self.writer
            .write_progress(&self.task_id, pct)
            .await
            .best_effort("Progress envelope write");

        if let Some(false) = self
            .lock
            .refresh(&self.task_id)
            .await
            .best_effort("Lock refresh")
        {
            debug!("Task {} no longer owns the scrape lock", self.task_id);
        }

        Ok(())
    }
}

#[async_trait]
impl Checkpoint for ProgressReporter {
    async fn checkpoint(&self) -> Result<(), Cancelled> {
        self.check_cancelled().await
    }
}

/// Background helper that advances a coarse percentage while the job is stuck
/// in one long call, keeping the lock refreshed and the cancel flag polled
pub struct ProgressTicker {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Report `start`, then `start + step`, ... up to `ceiling`, one value per `interval`
    pub fn spawn(
        reporter: Arc<ProgressReporter>,
        start: u8,
        ceiling: u8,
        step: u8,
        interval: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let handle = tokio::spawn(async move {
            let mut pct = start;
            while pct <= ceiling {
                if reporter.update(pct).await.is_err() {
                    debug!("Ticker for {} stopping on cancellation", reporter.task_id());
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                pct = pct.saturating_add(step.max(1));
            }
        });
        Self { stop, handle }
    }

    /// Stop ticking, waiting briefly for an in-flight update to finish.
    /// An update still pending after that is aborted so it cannot land on
    /// top of the terminal status.
    pub async fn stop(mut self) {
        self.stop.cancel();
        if tokio::time::timeout(Duration::from_secs(1), &mut self.handle)
            .await
            .is_err()
        {
            debug!("Progress ticker did not stop within 1s, aborting it");
            self.handle.abort();
            let _ = self.handle.await;
        }
    }
}
