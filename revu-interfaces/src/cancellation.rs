//! Cooperative cancellation checkpoint

use async_trait::async_trait;
use thiserror::Error;

/// Signal that the running job was cancelled by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled by user")]
pub struct Cancelled;

/// Safe point at which a running job may observe a cancellation request.
///
/// Collaborators that loop over pages or requests call this between
/// iterations and bail out with the returned error.
#[async_trait]
pub trait Checkpoint: Send + Sync {
    async fn checkpoint(&self) -> Result<(), Cancelled>;
}
