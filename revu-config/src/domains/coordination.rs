//! Coordination backend configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which store and queue implementation backs coordination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationBackend {
    /// Process-local store and queue; API and worker must share a process
    #[default]
    Memory,
    /// Shared Redis instance
    Redis,
}

impl FromStr for CoordinationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CoordinationBackend::Memory),
            "redis" => Ok(CoordinationBackend::Redis),
            _ => Err(format!("Invalid coordination backend: {}", s)),
        }
    }
}

/// Coordination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    pub backend: CoordinationBackend,

    /// Redis connection URL, used by the redis backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Namespace prepended to every key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            backend: CoordinationBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "revu".to_string()
}

impl Validatable for CoordinationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.key_prefix, "key_prefix", self.domain_name())?;

        if self.key_prefix.contains(char::is_whitespace) {
            return Err(self.validation_error("key_prefix cannot contain whitespace"));
        }

        if self.backend == CoordinationBackend::Redis {
            validate_url(&self.redis_url, "redis_url", self.domain_name(), &["redis", "rediss"])?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "coordination"
    }
}
