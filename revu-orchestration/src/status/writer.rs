use revu_coordination::KeyLayout;
use revu_interfaces::{CoordinationStore, ScrapeResult, StoreError, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::envelope::StatusEnvelope;
use crate::error::BestEffort;

/// Write side of the status protocol
#[derive(Clone)]
pub struct StatusWriter {
    store: Arc<dyn CoordinationStore>,
    keys: KeyLayout,
    retention: Duration,
}

impl StatusWriter {
    pub fn new(store: Arc<dyn CoordinationStore>, keys: KeyLayout, retention: Duration) -> Self {
        Self {
            store,
            keys,
            retention,
        }
    }

    pub async fn write_envelope(&self, task_id: &str, envelope: &StatusEnvelope) -> StoreResult<()> {
        let payload = envelope.to_json().map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store
            .set(&self.keys.meta(task_id), &payload, self.retention)
            .await
    }

    pub async fn write_progress(&self, task_id: &str, pct: u8) -> StoreResult<()> {
        debug!("Task {} progress {}%", task_id, pct);
        self.write_envelope(task_id, &StatusEnvelope::progress(pct)).await
    }

    pub async fn write_revoked(&self, task_id: &str, pct: u8) -> StoreResult<()> {
        self.write_envelope(task_id, &StatusEnvelope::revoked(pct)).await
    }

    /// FAILURE envelope, plus an empty result carrying the error for clients
    /// that read the result key directly
    pub async fn write_failure(&self, task_id: &str, pct: u8, error: &str) -> StoreResult<()> {
        self.write_envelope(task_id, &StatusEnvelope::failure(pct, error))
            .await?;
        self.write_result(task_id, &ScrapeResult::failed(error))
            .await
            .best_effort("Failure payload write");
        Ok(())
    }

    /// Result payload first, then the SUCCESS envelope that points readers at it
    pub async fn write_success(&self, task_id: &str, result: &ScrapeResult) -> StoreResult<()> {
        self.write_result(task_id, result).await?;
        self.write_envelope(task_id, &StatusEnvelope::success()).await
    }

    /// Remove the envelope so readers fall back to the queue's native record
    pub async fn clear_envelope(&self, task_id: &str) -> StoreResult<()> {
        self.store.delete(&self.keys.meta(task_id)).await.map(|_| ())
    }

    async fn write_result(&self, task_id: &str, result: &ScrapeResult) -> StoreResult<()> {
        let payload = serde_json::to_string(result).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store
            .set(&self.keys.result(task_id), &payload, self.retention)
            .await
    }
}
