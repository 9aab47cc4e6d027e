//! # Revu REST API
//!
//! Thin HTTP surface over [`revu_orchestration::ScrapeOrchestrator`]:
//!
//! - `POST /start-scrape` admits and enqueues a scrape
//! - `GET /scrape-status/{job_id}` reports job state and results
//! - `POST /cancel-scrape/{job_id}` requests cooperative cancellation
//! - `GET /scrape-lock-status` shows who holds the single-flight lock
//! - `GET /health` for liveness checks
//!
//! Callers identify themselves with the `x-user-id` header.
//!
//! ## Example
//!
//! ```rust,no_run
//! use revu_rest_api::{create_rest_app, AppConfig, AppContext};
//! # use revu_orchestration::ScrapeOrchestrator;
//! # use std::sync::Arc;
//!
//! # async fn example(orchestrator: Arc<ScrapeOrchestrator>) -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_rest_app(AppContext::new(orchestrator), AppConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod context;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod models;

pub use app::{create_rest_app, AppConfig, AppContext};
pub use errors::{RestError, RestResult};
pub use extractors::{UserId, USER_ID_HEADER};
pub use models::*;
