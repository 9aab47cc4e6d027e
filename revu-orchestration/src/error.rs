//! Orchestration error types

use revu_interfaces::{QueueError, StoreError};
use std::fmt::Display;
use thiserror::Error;
use tracing::warn;

/// Result type for orchestration operations
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Errors surfaced to callers of the orchestration layer
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The user has used up today's submissions
    #[error("Daily scrape limit reached ({count}/{limit}); try again tomorrow")]
    RateLimited { count: i64, limit: i64 },

    /// Another job holds the single-flight lock
    #[error("A scrape job is already in progress")]
    LockHeld,

    /// An invariant-bearing store operation failed
    #[error("Coordination store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The queue refused the job; the lock has been rolled back
    #[error("Failed to submit scrape job: {0}")]
    SubmissionFailed(String),

    /// The queue could not answer a status lookup
    #[error("Task queue unavailable: {0}")]
    QueueUnavailable(#[from] QueueError),

    /// Missing user id or URL; nothing was counted or locked
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Outcome of a call whose failure must not stop the caller
pub(crate) trait BestEffort<T> {
    /// Log a failure at `warn` and discard it
    fn best_effort(self, action: &str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, action: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{} failed, continuing: {}", action, e);
                None
            }
        }
    }
}
