//! # Revu Interfaces
//!
//! Core interfaces and shared payload types for the Revu scrape orchestration
//! system.
//!
//! The orchestration core never talks to Redis, a task broker, a scraping
//! service or a document database directly. It talks to the traits in this
//! crate, which lets every backend be swapped for an in-memory fake in tests.
//!
//! ## Main Interfaces
//!
//! - [`CoordinationStore`] - atomic single-key primitives (the only coordination medium)
//! - [`TaskQueue`] - asynchronous job submission, native status and revocation
//! - [`ReviewSource`] - fetches raw review items for a product
//! - [`EnrichmentPipeline`] - opaque analysis over normalised reviews
//! - [`DocumentStore`] - archival of final results
//! - [`Checkpoint`] - cooperative cancellation check handed to collaborators
//! - [`Clock`] - wall-clock source used for UTC day boundaries and expiry

pub mod cancellation;
pub mod clock;
pub mod collaborators;
pub mod queue;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use cancellation::{Cancelled, Checkpoint};
pub use clock::Clock;
pub use collaborators::{
    DocumentError, DocumentStore, EnrichmentError, EnrichmentPipeline, ReviewSource, SourceError,
};
pub use queue::{NativeTaskStatus, QueueError, QueueResult, QueuedJob, ScrapeJobArgs, TaskQueue};
pub use store::{CoordinationStore, KeyTtl, StoreError, StoreResult};
pub use types::{FetchRequest, FetchedReviews, ProductInfo, ProductMeta, ReviewRecord, ScrapeResult};
