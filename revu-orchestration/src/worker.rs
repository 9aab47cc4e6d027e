//! Scrape job runner
//!
//! Pulls jobs from the task queue and runs each one to a terminal state. The
//! job body reports progress through a [`ProgressReporter`], which is also the
//! checkpoint handed to the review source. The terminal write is the one
//! worker-side store call whose failure is not ignored: it is logged at error
//! level, a failed result write falls back to a FAILURE envelope, and the
//! outcome is mirrored into the queue's own record so status reads converge.

use revu_config::ScrapeConfig;
use revu_coordination::KeyLayout;
use revu_interfaces::{
    CoordinationStore, EnrichmentPipeline, FetchRequest, NativeTaskStatus, ProductMeta,
    QueuedJob, ReviewSource, ScrapeResult, SourceError, TaskQueue,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::CancellationChannel;
use crate::error::BestEffort;
use crate::job::{flatten_items, normalize_review, parse_product_url, truncate_words, JobError};
use crate::lock::{ReinforceOutcome, ScrapeLock};
use crate::progress::{ProgressReporter, ProgressTicker};
use crate::status::envelope::CANCELLED_BY_USER;
use crate::status::StatusWriter;

/// Ticker range while the review source is busy
const TICK_START: u8 = 12;
const TICK_CEILING: u8 = 35;
const TICK_STEP: u8 = 3;

/// Words kept from the product name
const PRODUCT_NAME_WORDS: usize = 5;

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { count: usize },
    Failed { error: String },
    Cancelled { progress: u8 },
}

/// Executes scrape jobs taken from the queue
pub struct ScrapeWorker {
    queue: Arc<dyn TaskQueue>,
    source: Arc<dyn ReviewSource>,
    enrichment: Option<Arc<dyn EnrichmentPipeline>>,
    lock: ScrapeLock,
    channel: CancellationChannel,
    writer: StatusWriter,
    config: ScrapeConfig,
}

impl ScrapeWorker {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        queue: Arc<dyn TaskQueue>,
        source: Arc<dyn ReviewSource>,
        keys: KeyLayout,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            lock: ScrapeLock::new(store.clone(), keys.clone(), config.lock_ttl),
            channel: CancellationChannel::new(store.clone(), keys.clone(), config.cancel_ttl),
            writer: StatusWriter::new(store, keys, config.retention),
            queue,
            source,
            enrichment: None,
            config,
        }
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn EnrichmentPipeline>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Poll the queue until `shutdown` fires. A job in flight is finished first.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Scrape worker started");
        while !shutdown.is_cancelled() {
            match self.queue.dequeue(self.config.queue_poll_interval).await {
                Ok(Some(job)) => {
                    let outcome = self.execute(job).await;
                    debug!("Job finished: {:?}", outcome);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to dequeue scrape job: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.config.queue_poll_interval) => {}
                    }
                }
            }
        }
        info!("Scrape worker stopped");
    }

    /// Run one job to a terminal state
    pub async fn execute(&self, job: QueuedJob) -> JobOutcome {
        let span = info_span!("scrape_job", task_id = %job.task_id);
        async move {
            info!("Starting scrape of {}", job.args.url);

            match self.lock.reinforce(&job.task_id).await {
                Ok(ReinforceOutcome::HeldByOther(owner)) => {
                    warn!("Scrape lock is held by {:?}; running without it", owner)
                }
                Ok(outcome) => debug!("Lock reinforced: {:?}", outcome),
                Err(e) => warn!("Lock reinforcement failed, continuing: {}", e),
            }

            let reporter = Arc::new(ProgressReporter::new(
                job.task_id.clone(),
                self.queue.clone(),
                self.channel.clone(),
                self.writer.clone(),
                self.lock.clone(),
            ));

            let result = self.scrape(&job, &reporter).await;
            self.finish(&job.task_id, &reporter, result).await
        }
        .instrument(span)
        .await
    }

    async fn scrape(
        &self,
        job: &QueuedJob,
        reporter: &Arc<ProgressReporter>,
    ) -> Result<ScrapeResult, JobError> {
        let product = parse_product_url(&job.args.url)?;
        info!("Resolved ASIN {} on amazon.{}", product.asin, product.domain_code);

        reporter.update(10).await?;

        let request = FetchRequest {
            asin: product.asin.clone(),
            domain_code: product.domain_code,
            max_reviews: self.config.max_reviews,
            max_pages: self.config.max_pages,
        };

        let ticker = ProgressTicker::spawn(
            reporter.clone(),
            TICK_START,
            TICK_CEILING,
            TICK_STEP,
            self.config.tick_interval,
        );
        let fetched = tokio::select! {
            fetched = self.source.fetch_reviews(&request, reporter.as_ref()) => fetched,
            _ = reporter.cancelled() => Err(SourceError::Cancelled),
        };
        ticker.stop().await;
        let fetched = fetched?;

        reporter.update(40).await?;
        debug!("Product info from source: {:?}", fetched.product);

        let items = flatten_items(fetched.items);
        let total = items.len();
        let report_every = (total / 10).max(1);
        let mut reviews = Vec::with_capacity(total);
        for (idx, item) in items.iter().enumerate() {
            reviews.push(normalize_review(item));
            if (idx + 1) % report_every == 0 {
                let pct = 40 + (15 * (idx + 1) / total) as u8;
                reporter.update(pct).await?;
            }
        }
        reporter.update(55).await?;

        if reviews.is_empty() {
            return Err(JobError::Failed(
                "No reviews scraped for the provided URL.".to_string(),
            ));
        }

        let product_meta = ProductMeta {
            asin: product.asin,
            source: self.source.source_name().to_string(),
            actor: self.source.actor().map(str::to_string),
            name: fetched
                .product
                .product_name
                .as_deref()
                .map(|name| truncate_words(name, PRODUCT_NAME_WORDS)),
            count_reviews: fetched.product.count_reviews,
        };

        let analysis = match &self.enrichment {
            Some(pipeline) => {
                reporter.update(60).await?;
                let analysis = pipeline
                    .process(&reviews)
                    .await
                    .best_effort("Review enrichment")
                    .flatten();
                reporter.update(90).await?;
                analysis
            }
            None => None,
        };

        reporter.update(98).await?;

        Ok(ScrapeResult {
            count: reviews.len(),
            reviews,
            product: Some(product_meta),
            analysis,
            error: None,
        })
    }

    async fn finish(
        &self,
        task_id: &str,
        reporter: &ProgressReporter,
        result: Result<ScrapeResult, JobError>,
    ) -> JobOutcome {
        // Last chance to honour a cancel that arrived during the final phase
        let result = match result {
            Ok(payload) => match reporter.check_cancelled().await {
                Ok(()) => Ok(payload),
                Err(cancelled) => Err(cancelled.into()),
            },
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(payload) => {
                let count = payload.count;
                match self.writer.write_success(task_id, &payload).await {
                    Ok(()) => {
                        let info = serde_json::to_value(&payload).ok();
                        self.mark_native(task_id, NativeTaskStatus::new("SUCCESS", info))
                            .await;
                        info!("Scrape finished with {} reviews", count);
                        JobOutcome::Succeeded { count }
                    }
                    Err(e) => {
                        error!("Failed to record result of {}: {}", task_id, e);
                        let message = format!("failed to record result: {}", e);
                        self.record_failure(task_id, reporter.progress(), &message)
                            .await;
                        JobOutcome::Failed { error: message }
                    }
                }
            }
            Err(JobError::Cancelled) => {
                let progress = reporter.progress();
                if let Err(e) = self.writer.write_revoked(task_id, progress).await {
                    error!("Failed to record cancellation of {}: {}", task_id, e);
                    self.clear_stale_envelope(task_id).await;
                }
                self.mark_native(
                    task_id,
                    NativeTaskStatus::new(
                        "REVOKED",
                        Some(json!({ "exc": CANCELLED_BY_USER, "progress": progress })),
                    ),
                )
                .await;
                info!("Scrape cancelled at {}%", progress);
                JobOutcome::Cancelled { progress }
            }
            Err(JobError::Failed(message)) => {
                self.record_failure(task_id, reporter.progress(), &message)
                    .await;
                warn!("Scrape failed: {}", message);
                JobOutcome::Failed { error: message }
            }
        };

        self.lock
            .release(task_id)
            .await
            .best_effort("Lock release");

        outcome
    }

    /// FAILURE envelope and native record. When the envelope cannot be
    /// written the last PROGRESS one is removed, leaving the native FAILURE
    /// as what readers see.
    async fn record_failure(&self, task_id: &str, progress: u8, message: &str) {
        if let Err(e) = self.writer.write_failure(task_id, progress, message).await {
            error!("Failed to record failure of {}: {}", task_id, e);
            self.clear_stale_envelope(task_id).await;
        }
        self.mark_native(
            task_id,
            NativeTaskStatus::new("FAILURE", Some(json!({ "exc": message, "progress": progress }))),
        )
        .await;
    }

    async fn clear_stale_envelope(&self, task_id: &str) {
        self.writer
            .clear_envelope(task_id)
            .await
            .best_effort("Stale status cleanup");
    }

    async fn mark_native(&self, task_id: &str, status: NativeTaskStatus) {
        self.queue
            .update_native_state(task_id, status)
            .await
            .best_effort("Native state update");
    }
}
