//! Domain-driven configuration management for Revu
//!
//! Configuration is split by functional domain, loaded from YAML, overridden
//! from `REVU_*` environment variables and validated per domain.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    coordination::{CoordinationBackend, CoordinationConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    scrape::ScrapeConfig,
    server::ServerConfig,
    source::SourceConfig,
    RevuConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
