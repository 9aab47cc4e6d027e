//! Domain-specific configuration modules

pub mod coordination;
pub mod logging;
pub mod scrape;
pub mod server;
pub mod source;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Revu configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RevuConfig {
    /// Coordination store and task queue backend
    pub coordination: coordination::CoordinationConfig,

    /// Scrape lock, rate limit and job status settings
    pub scrape: scrape::ScrapeConfig,

    /// Review source adapter
    pub source: source::SourceConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,

    /// HTTP server configuration
    pub server: server::ServerConfig,
}

impl RevuConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.coordination.validate()?;
        self.scrape.validate()?;
        self.source.validate()?;
        self.logging.validate()?;
        self.server.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        serde_yaml::to_string(&RevuConfig::default())
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
