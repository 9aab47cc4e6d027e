//! Scrape orchestration configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scrape lock, rate limiter and job status settings
///
/// `lock_ttl` is the hard upper bound on how long a single job may run. The
/// worker refreshes the lock on every progress update, but a worker that stops
/// reporting for longer than `lock_ttl` loses its claim and a new job may start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// TTL of the single-flight lock and its owner key
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_lock_ttl")]
    pub lock_ttl: Duration,

    /// Submissions allowed per user per UTC day; zero or negative disables the limit
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,

    /// Retention of per-task status records and results
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_retention")]
    pub retention: Duration,

    /// TTL of a cancellation flag
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_cancel_ttl")]
    pub cancel_ttl: Duration,

    /// Maximum reviews requested from the review source
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,

    /// Maximum pages requested from the review source
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Interval of the coarse progress ticker during the fetch phase
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// How long a worker waits on an empty queue before polling again
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_queue_poll_interval")]
    pub queue_poll_interval: Duration,
}

impl ScrapeConfig {
    /// Whether the per-user daily limit is enforced
    pub fn rate_limit_enabled(&self) -> bool {
        self.daily_limit > 0
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            lock_ttl: default_lock_ttl(),
            daily_limit: default_daily_limit(),
            retention: default_retention(),
            cancel_ttl: default_cancel_ttl(),
            max_reviews: default_max_reviews(),
            max_pages: default_max_pages(),
            tick_interval: default_tick_interval(),
            queue_poll_interval: default_queue_poll_interval(),
        }
    }
}

fn default_lock_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_daily_limit() -> i64 {
    3
}

fn default_retention() -> Duration {
    Duration::from_secs(86400)
}

fn default_cancel_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_reviews() -> usize {
    300
}

fn default_max_pages() -> usize {
    50
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_queue_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Validatable for ScrapeConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.lock_ttl.as_secs(), "lock_ttl", self.domain_name())?;
        validate_positive(self.retention.as_secs(), "retention", self.domain_name())?;
        validate_positive(self.cancel_ttl.as_secs(), "cancel_ttl", self.domain_name())?;
        validate_positive(self.max_reviews, "max_reviews", self.domain_name())?;
        validate_positive(self.max_pages, "max_pages", self.domain_name())?;

        if self.tick_interval.is_zero() {
            return Err(self.validation_error("tick_interval must be greater than 0"));
        }

        // A finished job must stay queryable for at least as long as it could run
        if self.retention < self.lock_ttl {
            return Err(self.validation_error(format!(
                "retention ({}s) must not be shorter than lock_ttl ({}s)",
                self.retention.as_secs(),
                self.lock_ttl.as_secs()
            )));
        }

        if self.tick_interval >= self.lock_ttl {
            return Err(self.validation_error("tick_interval must be shorter than lock_ttl"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scrape"
    }
}
