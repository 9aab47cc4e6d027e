//! Review source adapter configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hosted scraping actor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the scraping platform API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Actor that scrapes product reviews
    #[serde(default = "default_actor")]
    pub actor: String,

    /// API token; requests fail upstream when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Timeout of a single fetch call
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            actor: default_actor(),
            api_token: None,
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.apify.com".to_string()
}

fn default_actor() -> String {
    "epctex/amazon-reviews-scraper".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Validatable for SourceConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name(), &["http", "https"])?;
        validate_required_string(&self.actor, "actor", self.domain_name())?;
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "source"
    }
}
