//! API-side facade over the orchestration components

use revu_config::ScrapeConfig;
use revu_coordination::KeyLayout;
use revu_interfaces::{
    Clock, CoordinationStore, DocumentStore, ScrapeJobArgs, ScrapeResult, TaskQueue,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cancel::{CancelReceipt, CancellationChannel};
use crate::error::{BestEffort, OrchestrationError, OrchestrationResult};
use crate::lock::{LockStatus, ScrapeLock};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::status::{JobState, JobStatusView, StatusEnvelope, StatusReader, StatusWriter};

/// Collection holding archived review sets
pub const REVIEWS_COLLECTION: &str = "reviews";
/// Collection holding archived analyses
pub const ANALYSES_COLLECTION: &str = "analyses";

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedJob {
    pub job_id: String,
}

/// Everything the HTTP layer needs: admission, status, cancel and lock status
pub struct ScrapeOrchestrator {
    store: Arc<dyn CoordinationStore>,
    queue: Arc<dyn TaskQueue>,
    documents: Option<Arc<dyn DocumentStore>>,
    clock: Arc<dyn Clock>,
    keys: KeyLayout,
    retention: std::time::Duration,
    rate_limiter: RateLimiter,
    lock: ScrapeLock,
    channel: CancellationChannel,
    reader: StatusReader,
    writer: StatusWriter,
}

impl ScrapeOrchestrator {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        queue: Arc<dyn TaskQueue>,
        clock: Arc<dyn Clock>,
        keys: KeyLayout,
        config: &ScrapeConfig,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(store.clone(), keys.clone(), clock.clone(), config.daily_limit),
            lock: ScrapeLock::new(store.clone(), keys.clone(), config.lock_ttl),
            channel: CancellationChannel::new(store.clone(), keys.clone(), config.cancel_ttl),
            reader: StatusReader::new(store.clone(), queue.clone(), keys.clone()),
            writer: StatusWriter::new(store.clone(), keys.clone(), config.retention),
            retention: config.retention,
            documents: None,
            clock,
            store,
            queue,
            keys,
        }
    }

    /// Archive SUCCESS results into a document store
    pub fn with_document_store(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn lock(&self) -> &ScrapeLock {
        &self.lock
    }

    /// Admit and enqueue a scrape of `url` for `user_id`.
    ///
    /// Rate limit first, so a rejected request never takes the lock.
    pub async fn start_scrape(&self, user_id: &str, url: &str) -> OrchestrationResult<SubmittedJob> {
        if user_id.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest("user id is required".to_string()));
        }
        if url.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest("url is required".to_string()));
        }

        match self.rate_limiter.check_and_increment(user_id).await {
            RateDecision::Rejected { count, limit } => {
                info!("Rejecting scrape for {}: {} of {} today", user_id, count, limit);
                return Err(OrchestrationError::RateLimited { count, limit });
            }
            decision => debug!("Rate limit decision for {}: {:?}", user_id, decision),
        }

        self.lock.acquire().await?;

        let args = ScrapeJobArgs {
            url: url.to_string(),
            user_id: Some(user_id.to_string()),
        };
        let task_id = match self.queue.submit(args).await {
            Ok(task_id) => task_id,
            Err(e) => {
                error!("Job submission failed, rolling back lock: {}", e);
                self.lock.rollback().await;
                return Err(OrchestrationError::SubmissionFailed(e.to_string()));
            }
        };

        // The job is queued and cannot be taken back; these writes are best-effort
        self.lock
            .record_owner(&task_id)
            .await
            .best_effort("Lock owner write");
        self.store
            .set(&self.keys.task_owner(&task_id), user_id, self.retention)
            .await
            .best_effort("Task owner write");
        self.store
            .set(&self.keys.task_url(&task_id), url, self.retention)
            .await
            .best_effort("Task url write");

        info!("Submitted scrape job {} for {}", task_id, user_id);
        Ok(SubmittedJob { job_id: task_id })
    }

    /// Status of `job_id`; terminal observations release the lock and archive results
    pub async fn scrape_status(&self, job_id: &str) -> OrchestrationResult<JobStatusView> {
        let observation = self.reader.read(job_id).await?;

        if observation.view.state.is_terminal() {
            self.lock
                .release(job_id)
                .await
                .best_effort("Lock release on terminal status");

            if observation.view.state == JobState::Success {
                if let Some(result) = &observation.result {
                    self.archive(job_id, result).await;
                }
            }
        }

        Ok(observation.view)
    }

    /// Ask the worker to stop `job_id` and report it as REVOKED right away
    pub async fn cancel_scrape(&self, job_id: &str) -> OrchestrationResult<CancelReceipt> {
        self.channel.request(job_id).await?;

        self.queue
            .revoke(job_id)
            .await
            .best_effort("Task revoke");

        self.write_optimistic_revoked(job_id).await;

        self.lock
            .release(job_id)
            .await
            .best_effort("Lock release on cancel");

        info!("Cancellation requested for {}", job_id);
        Ok(CancelReceipt {
            job_id: job_id.to_string(),
            cancel_requested: true,
        })
    }

    pub async fn lock_status(&self) -> OrchestrationResult<LockStatus> {
        Ok(self.lock.status().await?)
    }

    /// REVOKED envelope carrying the last known progress. A job that already
    /// finished keeps its SUCCESS or FAILURE record.
    async fn write_optimistic_revoked(&self, job_id: &str) {
        let current = match self.store.get(&self.keys.meta(job_id)).await {
            Ok(raw) => raw.and_then(|raw| StatusEnvelope::parse(&raw).ok()),
            Err(e) => {
                warn!("Could not read status of {} before cancel: {}", job_id, e);
                None
            }
        };

        if let Some(envelope) = &current {
            if matches!(envelope.state, JobState::Success | JobState::Failure) {
                debug!("Job {} already {}, leaving its status as is", job_id, envelope.state);
                return;
            }
        }

        let progress = current.map(|envelope| envelope.progress).unwrap_or(0);
        self.writer
            .write_revoked(job_id, progress)
            .await
            .best_effort("Optimistic REVOKED write");
    }

    /// Upsert `reviews` and `analyses` documents for a finished job
    async fn archive(&self, job_id: &str, result: &ScrapeResult) {
        let Some(documents) = &self.documents else {
            return;
        };

        let url = self
            .store
            .get(&self.keys.task_url(job_id))
            .await
            .best_effort("Task url read")
            .flatten();
        let user_id = self
            .store
            .get(&self.keys.task_owner(job_id))
            .await
            .best_effort("Task owner read")
            .flatten();
        let now = self.clock.now().to_rfc3339();

        let reviews_doc = json!({
            "_id": job_id,
            "job_id": job_id,
            "url": url,
            "user_id": user_id,
            "product": result.product,
            "reviews": result.reviews,
            "count": result.count,
            "updatedAt": now,
        });
        documents
            .upsert(REVIEWS_COLLECTION, job_id, reviews_doc)
            .await
            .best_effort("Reviews archive");

        if let Some(analysis) = &result.analysis {
            let analysis_doc = json!({
                "_id": job_id,
                "job_id": job_id,
                "url": url,
                "user_id": user_id,
                "product": result.product,
                "analysis": analysis,
                "updatedAt": now,
            });
            documents
                .upsert(ANALYSES_COLLECTION, job_id, analysis_doc)
                .await
                .best_effort("Analysis archive");
        }
    }
}
