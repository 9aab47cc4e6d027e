//! Shared fixtures for orchestration integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use revu_config::ScrapeConfig;
use revu_coordination::{InMemoryStore, KeyLayout, LocalTaskQueue, ManualClock};
use revu_interfaces::{
    Checkpoint, CoordinationStore, DocumentError, DocumentStore, EnrichmentError,
    EnrichmentPipeline, FetchRequest, FetchedReviews, KeyTtl, NativeTaskStatus, ProductInfo,
    QueueResult, QueuedJob, ReviewRecord, ReviewSource, ScrapeJobArgs, SourceError, StoreError,
    StoreResult, TaskQueue,
};
use revu_orchestration::{ScrapeOrchestrator, ScrapeWorker};
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const PRODUCT_URL: &str = "https://www.amazon.com/Acme-Widget/dp/B07XJ8C8F5?ref=sr_1";

pub fn test_config(daily_limit: i64) -> ScrapeConfig {
    ScrapeConfig {
        daily_limit,
        tick_interval: Duration::from_millis(10),
        queue_poll_interval: Duration::from_millis(20),
        ..Default::default()
    }
}

/// In-memory deployment: one store, one queue, one clock
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<LocalTaskQueue>,
    pub keys: KeyLayout,
    pub config: ScrapeConfig,
    pub orchestrator: Arc<ScrapeOrchestrator>,
}

impl Harness {
    pub fn new(daily_limit: i64) -> Self {
        Self::build(daily_limit, None)
    }

    pub fn with_documents(daily_limit: i64, documents: Arc<dyn DocumentStore>) -> Self {
        Self::build(daily_limit, Some(documents))
    }

    fn build(daily_limit: i64, documents: Option<Arc<dyn DocumentStore>>) -> Self {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap()));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let queue = Arc::new(LocalTaskQueue::new());
        let keys = KeyLayout::new("revu");
        let config = test_config(daily_limit);

        let mut orchestrator =
            ScrapeOrchestrator::new(store.clone(), queue.clone(), clock.clone(), keys.clone(), &config);
        if let Some(documents) = documents {
            orchestrator = orchestrator.with_document_store(documents);
        }

        Self {
            clock,
            store,
            queue,
            keys,
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn worker(&self, source: Arc<dyn ReviewSource>) -> ScrapeWorker {
        ScrapeWorker::new(
            self.store.clone(),
            self.queue.clone(),
            source,
            self.keys.clone(),
            self.config.clone(),
        )
    }

    pub async fn next_job(&self) -> QueuedJob {
        self.queue
            .dequeue(Duration::from_millis(50))
            .await
            .unwrap()
            .expect("a queued job")
    }
}

/// Returns a fixed set of items at once
pub struct StaticSource {
    items: Vec<JsonValue>,
    product: ProductInfo,
}

impl StaticSource {
    pub fn with_reviews(count: usize) -> Self {
        Self {
            items: (0..count)
                .map(|i| json!({ "text": format!("review {}", i), "stars": 4, "date": "2024-03-01" }))
                .collect(),
            product: ProductInfo {
                product_name: Some("Acme Widget Pro Max Ultra Deluxe Edition".to_string()),
                count_reviews: Some(count as u64),
                price: None,
            },
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            product: ProductInfo::default(),
        }
    }
}

#[async_trait]
impl ReviewSource for StaticSource {
    fn source_name(&self) -> &str {
        "static"
    }

    fn actor(&self) -> Option<&str> {
        Some("test/actor")
    }

    async fn fetch_reviews(
        &self,
        _request: &FetchRequest,
        checkpoint: &dyn Checkpoint,
    ) -> Result<FetchedReviews, SourceError> {
        checkpoint.checkpoint().await?;
        Ok(FetchedReviews {
            items: self.items.clone(),
            product: self.product.clone(),
        })
    }
}

/// Pages forever, checking for cancellation before every page
pub struct PagingSource {
    pub started: Arc<Notify>,
}

impl PagingSource {
    pub fn new() -> Self {
        Self {
            started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ReviewSource for PagingSource {
    fn source_name(&self) -> &str {
        "paging"
    }

    async fn fetch_reviews(
        &self,
        _request: &FetchRequest,
        checkpoint: &dyn Checkpoint,
    ) -> Result<FetchedReviews, SourceError> {
        self.started.notify_one();
        loop {
            checkpoint.checkpoint().await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Always fails
pub struct BrokenEnrichment;

#[async_trait]
impl EnrichmentPipeline for BrokenEnrichment {
    async fn process(&self, _reviews: &[ReviewRecord]) -> Result<Option<JsonValue>, EnrichmentError> {
        Err(EnrichmentError::Failed("model not loaded".to_string()))
    }
}

/// Counts reviews
pub struct CountingEnrichment;

#[async_trait]
impl EnrichmentPipeline for CountingEnrichment {
    async fn process(&self, reviews: &[ReviewRecord]) -> Result<Option<JsonValue>, EnrichmentError> {
        Ok(Some(json!({ "total_reviews": reviews.len() })))
    }
}

/// Remembers every upsert
#[derive(Default)]
pub struct RecordingDocuments {
    pub upserts: Mutex<Vec<(String, String, JsonValue)>>,
}

#[async_trait]
impl DocumentStore for RecordingDocuments {
    async fn upsert(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), DocumentError> {
        self.upserts
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string(), doc));
        Ok(())
    }
}

/// A store that is never reachable
pub struct UnreachableStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl CoordinationStore for UnreachableStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<bool> {
        down()
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        down()
    }
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        down()
    }
    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        down()
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> StoreResult<bool> {
        down()
    }
    async fn incr(&self, _key: &str) -> StoreResult<i64> {
        down()
    }
    async fn ttl(&self, _key: &str) -> StoreResult<KeyTtl> {
        down()
    }
    async fn delete_if_equals(&self, _guard_key: &str, _expected: &str, _keys: &[&str]) -> StoreResult<bool> {
        down()
    }
}

/// Delegates to an in-memory store except for counters, which always fail
pub struct CounterlessStore {
    pub inner: InMemoryStore,
}

#[async_trait]
impl CoordinationStore for CounterlessStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.set_if_absent(key, value, ttl).await
    }
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.inner.set(key, value, ttl).await
    }
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }
    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete(key).await
    }
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.expire(key, ttl).await
    }
    async fn incr(&self, _key: &str) -> StoreResult<i64> {
        down()
    }
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.inner.ttl(key).await
    }
    async fn delete_if_equals(&self, guard_key: &str, expected: &str, keys: &[&str]) -> StoreResult<bool> {
        self.inner.delete_if_equals(guard_key, expected, keys).await
    }
}

/// Delegates to an in-memory store but rejects selected writes: result
/// payloads and, optionally, every envelope other than a PROGRESS one
pub struct FaultyWrites {
    pub inner: InMemoryStore,
    pub fail_terminal_envelopes: bool,
}

impl FaultyWrites {
    pub fn results_only() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_terminal_envelopes: false,
        }
    }

    pub fn results_and_terminal_envelopes() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_terminal_envelopes: true,
        }
    }

    fn rejects(&self, key: &str, value: &str) -> bool {
        key.ends_with(":result")
            || (self.fail_terminal_envelopes && key.ends_with(":meta") && !value.contains("\"PROGRESS\""))
    }
}

#[async_trait]
impl CoordinationStore for FaultyWrites {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.set_if_absent(key, value, ttl).await
    }
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        if self.rejects(key, value) {
            return Err(StoreError::Backend("OOM command not allowed".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }
    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete(key).await
    }
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.inner.expire(key, ttl).await
    }
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.inner.incr(key).await
    }
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.inner.ttl(key).await
    }
    async fn delete_if_equals(&self, guard_key: &str, expected: &str, keys: &[&str]) -> StoreResult<bool> {
        self.inner.delete_if_equals(guard_key, expected, keys).await
    }
}

mock! {
    pub Queue {}

    #[async_trait]
    impl TaskQueue for Queue {
        async fn submit(&self, args: ScrapeJobArgs) -> QueueResult<String>;
        async fn native_status(&self, task_id: &str) -> QueueResult<Option<NativeTaskStatus>>;
        async fn revoke(&self, task_id: &str) -> QueueResult<()>;
        async fn update_native_state(&self, task_id: &str, status: NativeTaskStatus) -> QueueResult<()>;
        async fn dequeue(&self, wait: Duration) -> QueueResult<Option<QueuedJob>>;
    }
}
