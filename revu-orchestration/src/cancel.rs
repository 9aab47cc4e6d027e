//! Cooperative cancellation channel
//!
//! A cancel request is a flag key per task. The worker reads it at
//! checkpoints and never deletes it; the flag simply expires.

use revu_coordination::KeyLayout;
use revu_interfaces::{CoordinationStore, StoreResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Acknowledgement returned to the client that asked for a cancel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelReceipt {
    pub job_id: String,
    pub cancel_requested: bool,
}

/// Cancel flags keyed by task id
#[derive(Clone)]
pub struct CancellationChannel {
    store: Arc<dyn CoordinationStore>,
    keys: KeyLayout,
    ttl: Duration,
}

impl CancellationChannel {
    pub fn new(store: Arc<dyn CoordinationStore>, keys: KeyLayout, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    /// Raise the flag; raising it twice is harmless
    pub async fn request(&self, task_id: &str) -> StoreResult<()> {
        self.store.set(&self.keys.cancel(task_id), "1", self.ttl).await
    }

    pub async fn is_requested(&self, task_id: &str) -> StoreResult<bool> {
        self.store.exists(&self.keys.cancel(task_id)).await
    }
}
