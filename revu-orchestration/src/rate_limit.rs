//! Per-user daily admission control

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use revu_coordination::KeyLayout;
use revu_interfaces::{Clock, CoordinationStore, KeyTtl};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::BestEffort;

/// Result of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The limit is disabled
    Bypassed,
    /// The store was unreachable; the submission proceeds unchecked
    FailedOpen,
    Allowed { count: i64, limit: i64 },
    Rejected { count: i64, limit: i64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateDecision::Rejected { .. })
    }
}

/// Counts submission attempts per user per UTC calendar day
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CoordinationStore>,
    keys: KeyLayout,
    clock: Arc<dyn Clock>,
    daily_limit: i64,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        keys: KeyLayout,
        clock: Arc<dyn Clock>,
        daily_limit: i64,
    ) -> Self {
        Self {
            store,
            keys,
            clock,
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }

    /// Count one attempt for `user_id` and decide whether it may proceed.
    ///
    /// Rejected attempts still count.
    pub async fn check_and_increment(&self, user_id: &str) -> RateDecision {
        if self.daily_limit <= 0 {
            return RateDecision::Bypassed;
        }

        let now = self.clock.now();
        let key = self.keys.rate(user_id, now);

        let count = match self.store.incr(&key).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Rate limit check for {} failed open: {}", user_id, e);
                return RateDecision::FailedOpen;
            }
        };

        let needs_expiry = count == 1
            || matches!(self.store.ttl(&key).await, Ok(KeyTtl::Persistent));
        if needs_expiry {
            self.store
                .expire(&key, until_utc_midnight(now))
                .await
                .best_effort("Rate counter expiry");
        }

        debug!("User {} has made {} of {} attempts today", user_id, count, self.daily_limit);

        if count > self.daily_limit {
            RateDecision::Rejected {
                count,
                limit: self.daily_limit,
            }
        } else {
            RateDecision::Allowed {
                count,
                limit: self.daily_limit,
            }
        }
    }
}

/// Time left until the next UTC midnight, never zero
pub fn until_utc_midnight(now: DateTime<Utc>) -> Duration {
    let next_midnight = (now.date_naive() + ChronoDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc());
    next_midnight
        .and_then(|midnight| (midnight - now).to_std().ok())
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use revu_coordination::{InMemoryStore, ManualClock};

    fn limiter(limit: i64) -> (RateLimiter, Arc<InMemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 10, 22, 0, 0).unwrap()));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let limiter = RateLimiter::new(store.clone(), KeyLayout::default(), clock.clone(), limit);
        (limiter, store, clock)
    }

    #[test]
    fn test_until_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 2, 10, 22, 0, 0).unwrap();
        assert_eq!(until_utc_midnight(now), Duration::from_secs(2 * 3600));

        let midnight = Utc.with_ymd_and_hms(2024, 2, 11, 0, 0, 0).unwrap();
        assert_eq!(until_utc_midnight(midnight), Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn test_counter_expires_at_midnight() {
        let (limiter, store, clock) = limiter(3);
        assert!(limiter.check_and_increment("u1").await.is_allowed());

        let key = KeyLayout::default().rate("u1", clock.now());
        assert_eq!(store.ttl(&key).await.unwrap(), KeyTtl::Expires(Duration::from_secs(7200)));
    }

    #[tokio::test]
    async fn test_persistent_counter_gets_expiry() {
        let (limiter, store, clock) = limiter(3);
        let key = KeyLayout::default().rate("u1", clock.now());
        store.incr(&key).await.unwrap();
        assert_eq!(store.ttl(&key).await.unwrap(), KeyTtl::Persistent);

        assert_eq!(
            limiter.check_and_increment("u1").await,
            RateDecision::Allowed { count: 2, limit: 3 }
        );
        assert!(matches!(store.ttl(&key).await.unwrap(), KeyTtl::Expires(_)));
    }

    #[tokio::test]
    async fn test_rejected_attempts_still_count() {
        let (limiter, _, _) = limiter(1);
        assert!(limiter.check_and_increment("u1").await.is_allowed());
        assert_eq!(
            limiter.check_and_increment("u1").await,
            RateDecision::Rejected { count: 2, limit: 1 }
        );
        assert_eq!(
            limiter.check_and_increment("u1").await,
            RateDecision::Rejected { count: 3, limit: 1 }
        );
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let (limiter, _, _) = limiter(1);
        assert!(limiter.check_and_increment("u1").await.is_allowed());
        assert!(limiter.check_and_increment("u2").await.is_allowed());
    }

    #[tokio::test]
    async fn test_non_positive_limit_bypasses() {
        let (limiter, store, _) = limiter(0);
        for _ in 0..5 {
            assert_eq!(limiter.check_and_increment("u1").await, RateDecision::Bypassed);
        }
        assert!(store.is_empty());
    }
}
