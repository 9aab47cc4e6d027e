//! # Revu Orchestration
//!
//! Coordinates one long-running scrape job at a time across any number of API
//! and worker processes, using nothing but a [`CoordinationStore`] and a
//! [`TaskQueue`].
//!
//! - [`RateLimiter`] gates submissions per user per UTC day and fails open
//! - [`ScrapeLock`] is the cluster-wide single-flight mutex with owner-checked release
//! - [`StatusWriter`] and [`StatusReader`] agree on the status envelope and result keys
//! - [`CancellationChannel`] carries cooperative cancel requests to the worker
//! - [`ProgressReporter`] and [`ProgressTicker`] report progress and keep the lock alive
//! - [`ScrapeWorker`] runs jobs pulled from the queue
//! - [`ScrapeOrchestrator`] is the facade the HTTP layer talks to
//!
//! [`CoordinationStore`]: revu_interfaces::CoordinationStore
//! [`TaskQueue`]: revu_interfaces::TaskQueue

pub mod cancel;
pub mod error;
pub mod job;
pub mod lock;
pub mod orchestrator;
pub mod progress;
pub mod rate_limit;
pub mod status;
pub mod worker;

pub use cancel::{CancelReceipt, CancellationChannel};
pub use error::{OrchestrationError, OrchestrationResult};
pub use lock::{LockStatus, ReinforceOutcome, ScrapeLock};
pub use orchestrator::{ScrapeOrchestrator, SubmittedJob};
pub use progress::{ProgressReporter, ProgressTicker};
pub use rate_limit::{RateDecision, RateLimiter};
pub use status::{JobState, JobStatusView, StatusEnvelope, StatusObservation, StatusReader, StatusSource, StatusWriter};
pub use worker::{JobOutcome, ScrapeWorker};
