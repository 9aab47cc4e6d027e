//! Configuration loading and environment variable handling

use crate::domains::RevuConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the `REVU` prefix
    pub fn new() -> Self {
        Self {
            prefix: "REVU".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<RevuConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: RevuConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<RevuConfig> {
        let mut config = RevuConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<RevuConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut RevuConfig) -> ConfigResult<()> {
        self.apply_coordination_overrides(&mut config.coordination)?;
        self.apply_scrape_overrides(&mut config.scrape)?;
        self.apply_source_overrides(&mut config.source)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_server_overrides(&mut config.server)?;
        Ok(())
    }

    fn apply_coordination_overrides(
        &self,
        config: &mut crate::domains::coordination::CoordinationConfig,
    ) -> ConfigResult<()> {
        if let Ok(backend) = self.get_env_var("COORDINATION_BACKEND") {
            config.backend = crate::domains::coordination::CoordinationBackend::from_str(&backend)
                .map_err(|_| ConfigError::EnvError(format!("Invalid COORDINATION_BACKEND: {}", backend)))?;
        }

        // Setting a Redis URL implies the redis backend
        if let Ok(redis_url) = self.get_env_var("REDIS_URL") {
            config.redis_url = redis_url;
            config.backend = crate::domains::coordination::CoordinationBackend::Redis;
        }

        if let Ok(prefix) = self.get_env_var("KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        Ok(())
    }

    fn apply_scrape_overrides(
        &self,
        config: &mut crate::domains::scrape::ScrapeConfig,
    ) -> ConfigResult<()> {
        if let Ok(ttl) = self.get_env_var("SCRAPE_LOCK_TTL") {
            config.lock_ttl = self.parse_seconds("SCRAPE_LOCK_TTL", &ttl)?;
        }

        if let Ok(limit) = self.get_env_var("DAILY_SCRAPE_LIMIT") {
            config.daily_limit = limit
                .trim()
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid DAILY_SCRAPE_LIMIT: {}", e)))?;
        }

        if let Ok(max_reviews) = self.get_env_var("SCRAPER_MAX_REVIEWS") {
            config.max_reviews = max_reviews
                .trim()
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SCRAPER_MAX_REVIEWS: {}", e)))?;
        }

        if let Ok(max_pages) = self.get_env_var("SCRAPER_MAX_PAGES") {
            config.max_pages = max_pages
                .trim()
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SCRAPER_MAX_PAGES: {}", e)))?;
        }

        Ok(())
    }

    fn apply_source_overrides(
        &self,
        config: &mut crate::domains::source::SourceConfig,
    ) -> ConfigResult<()> {
        if let Ok(token) = self.get_env_var("SOURCE_API_TOKEN") {
            config.api_token = Some(token);
        }

        if let Ok(actor) = self.get_env_var("SOURCE_ACTOR") {
            config.actor = actor;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(port) = self.get_env_var("SERVER_PORT") {
            config.port = port
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SERVER_PORT: {}", e)))?;
        }

        Ok(())
    }

    fn parse_seconds(&self, name: &str, value: &str) -> ConfigResult<Duration> {
        let seconds: u64 = value
            .trim()
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
        Ok(Duration::from_secs(seconds))
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
