//! Shared handler state

use revu_orchestration::ScrapeOrchestrator;
use std::sync::Arc;

/// State handed to scrape endpoints
#[derive(Clone)]
pub struct ScrapeContext {
    pub orchestrator: Arc<ScrapeOrchestrator>,
}

impl ScrapeContext {
    pub fn new(orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
