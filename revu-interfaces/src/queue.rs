//! Task queue interface
//!
//! The task queue runs submitted jobs on a worker and keeps its own, best-effort
//! record of each task's state. The orchestration core uses that record only as
//! a fallback when its own status envelope is missing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised by a task queue backend
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task queue unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to submit task: {0}")]
    Submission(String),

    #[error("Malformed queue payload: {0}")]
    Payload(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Payload(err.to_string())
    }
}

/// Arguments of a scrape job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeJobArgs {
    /// Product page URL
    pub url: String,
    /// User that submitted the job
    pub user_id: Option<String>,
}

/// A job handed to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub task_id: String,
    pub args: ScrapeJobArgs,
}

/// The queue's own view of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTaskStatus {
    /// Queue-native state name (PENDING, STARTED, PROGRESS, SUCCESS, FAILURE, REVOKED, ...)
    pub state: String,
    /// State-specific payload: progress meta, result payload or `{"exc": ...}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<JsonValue>,
}

impl NativeTaskStatus {
    pub fn new(state: impl Into<String>, info: Option<JsonValue>) -> Self {
        Self {
            state: state.into(),
            info,
        }
    }

    pub fn pending() -> Self {
        Self::new("PENDING", None)
    }
}

/// Asynchronous task queue
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a job and return the task id assigned to it
    async fn submit(&self, args: ScrapeJobArgs) -> QueueResult<String>;

    /// Look up the queue's own status for a task.
    ///
    /// `None` means the queue no longer remembers the task.
    async fn native_status(&self, task_id: &str) -> QueueResult<Option<NativeTaskStatus>>;

    /// Ask the queue not to run (or to stop caring about) a task.
    ///
    /// This never interrupts a job that is already executing.
    async fn revoke(&self, task_id: &str) -> QueueResult<()>;

    /// Record the queue-native state of a task from inside the worker
    async fn update_native_state(&self, task_id: &str, status: NativeTaskStatus) -> QueueResult<()>;

    /// Take the next runnable job, waiting up to `wait` for one to arrive.
    ///
    /// Revoked jobs are skipped and marked REVOKED.
    async fn dequeue(&self, wait: Duration) -> QueueResult<Option<QueuedJob>>;
}
