//! External collaborators consumed by the worker and the orchestrator

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::cancellation::{Cancelled, Checkpoint};
use crate::types::{FetchRequest, FetchedReviews, ReviewRecord};

/// Errors raised by a review source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Review source request failed: {0}")]
    Request(String),

    #[error("Review source returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected review source response: {0}")]
    Decode(String),

    #[error("cancelled by user")]
    Cancelled,
}

impl From<Cancelled> for SourceError {
    fn from(_: Cancelled) -> Self {
        SourceError::Cancelled
    }
}

/// Errors raised by an enrichment pipeline
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Enrichment failed: {0}")]
    Failed(String),
}

/// Errors raised by a document store
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write document '{id}' to '{collection}': {message}")]
    Write {
        collection: String,
        id: String,
        message: String,
    },
}

/// Fetches raw review items for a product
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Short label recorded as the `source` of product metadata
    fn source_name(&self) -> &str;

    /// Upstream actor or scraper identifier, when there is one
    fn actor(&self) -> Option<&str> {
        None
    }

    /// Fetch up to `request.max_reviews` raw items.
    ///
    /// Implementations that page through results must call
    /// `checkpoint.checkpoint()` before each page.
    async fn fetch_reviews(
        &self,
        request: &FetchRequest,
        checkpoint: &dyn Checkpoint,
    ) -> Result<FetchedReviews, SourceError>;
}

/// Opaque analysis over normalised reviews
#[async_trait]
pub trait EnrichmentPipeline: Send + Sync {
    /// Returns `None` when the pipeline has nothing to say about the input
    async fn process(&self, reviews: &[ReviewRecord]) -> Result<Option<JsonValue>, EnrichmentError>;
}

/// Archive for final job results
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document with the given id
    async fn upsert(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), DocumentError>;
}
