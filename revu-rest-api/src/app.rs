//! Router setup

use axum::{
    routing::{get, post},
    Router,
};
use revu_orchestration::ScrapeOrchestrator;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{context::ScrapeContext, handlers};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Application context containing all dependencies
#[derive(Clone)]
pub struct AppContext {
    pub scrape: ScrapeContext,
}

impl AppContext {
    pub fn new(orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self {
            scrape: ScrapeContext::new(orchestrator),
        }
    }
}

/// Build the HTTP application
pub fn create_rest_app(context: AppContext, config: AppConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/start-scrape", post(handlers::start_scrape))
        .route("/scrape-status/{job_id}", get(handlers::scrape_status))
        .route("/cancel-scrape/{job_id}", post(handlers::cancel_scrape))
        .route("/scrape-lock-status", get(handlers::scrape_lock_status))
        .with_state(context.scrape);

    // Layers apply in reverse order
    if config.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    if config.enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }

    app
}
