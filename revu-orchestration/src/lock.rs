//! Cluster-wide single-flight lock
//!
//! The lock is two keys: the lock itself and an owner key naming the task that
//! holds it. Both carry the same TTL, which is the only recovery mechanism for
//! a crashed worker. Release is owner-checked and atomic, so a late finalizer
//! for one task can never delete a lock that a newer task has acquired.

use revu_coordination::KeyLayout;
use revu_interfaces::{CoordinationStore, KeyTtl, StoreResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{BestEffort, OrchestrationError, OrchestrationResult};

const LOCK_SENTINEL: &str = "1";

/// Snapshot of the lock for the lock-status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_job_id: Option<String>,
    /// Seconds until the lock expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// What a worker found when it reinforced the lock at job start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinforceOutcome {
    /// The lock was free (or unowned) and is now held by this task
    Acquired,
    /// This task already owned the lock; TTLs were refreshed
    Refreshed,
    /// Another task owns the lock, or its owner vanished mid-check; nothing was changed
    HeldByOther(Option<String>),
}

/// The single-flight lock over "one active scrape job"
#[derive(Clone)]
pub struct ScrapeLock {
    store: Arc<dyn CoordinationStore>,
    keys: KeyLayout,
    ttl: Duration,
}

impl ScrapeLock {
    pub fn new(store: Arc<dyn CoordinationStore>, keys: KeyLayout, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Try to take the lock. A held lock is a conflict, never a wait.
    pub async fn acquire(&self) -> OrchestrationResult<()> {
        let granted = self
            .store
            .set_if_absent(&self.keys.lock(), LOCK_SENTINEL, self.ttl)
            .await
            .map_err(|e| {
                warn!("Lock acquisition failed, refusing submission: {}", e);
                OrchestrationError::StoreUnavailable(e)
            })?;

        if granted {
            debug!("Scrape lock acquired");
            Ok(())
        } else {
            Err(OrchestrationError::LockHeld)
        }
    }

    /// Record the task that holds a freshly acquired lock
    pub async fn record_owner(&self, task_id: &str) -> StoreResult<()> {
        self.store.set(&self.keys.lock_owner(), task_id, self.ttl).await
    }

    /// Undo an acquisition whose job never reached the queue
    pub async fn rollback(&self) {
        self.store
            .delete(&self.keys.lock())
            .await
            .best_effort("Lock rollback");
        self.store
            .delete(&self.keys.lock_owner())
            .await
            .best_effort("Lock owner rollback");
    }

    /// Release the lock if `task_id` still owns it.
    ///
    /// Returns `true` when this call deleted the lock.
    pub async fn release(&self, task_id: &str) -> StoreResult<bool> {
        let lock_key = self.keys.lock();
        let owner_key = self.keys.lock_owner();
        let released = self
            .store
            .delete_if_equals(&owner_key, task_id, &[&lock_key, &owner_key])
            .await?;
        if released {
            info!("Released scrape lock held by {}", task_id);
        }
        Ok(released)
    }

    /// Extend both lock keys if `task_id` still owns them
    pub async fn refresh(&self, task_id: &str) -> StoreResult<bool> {
        let owner = self.store.get(&self.keys.lock_owner()).await?;
        if owner.as_deref() != Some(task_id) {
            debug!("Skipping lock refresh for {}: owner is {:?}", task_id, owner);
            return Ok(false);
        }
        let lock_alive = self.store.expire(&self.keys.lock(), self.ttl).await?;
        self.store.expire(&self.keys.lock_owner(), self.ttl).await?;
        Ok(lock_alive)
    }

    /// Make sure the lock is present and owned by `task_id` when its job starts.
    ///
    /// A lock without an owner is the window between submission and the API
    /// recording the owner, so the worker claims it. A lock owned by another
    /// task is left alone.
    pub async fn reinforce(&self, task_id: &str) -> StoreResult<ReinforceOutcome> {
        if self
            .store
            .set_if_absent(&self.keys.lock(), LOCK_SENTINEL, self.ttl)
            .await?
        {
            self.record_owner(task_id).await?;
            return Ok(ReinforceOutcome::Acquired);
        }

        let owner_key = self.keys.lock_owner();
        if self.store.set_if_absent(&owner_key, task_id, self.ttl).await? {
            self.store.expire(&self.keys.lock(), self.ttl).await?;
            return Ok(ReinforceOutcome::Acquired);
        }

        match self.store.get(&owner_key).await? {
            Some(owner) if owner == task_id => {
                self.refresh(task_id).await?;
                Ok(ReinforceOutcome::Refreshed)
            }
            other => Ok(ReinforceOutcome::HeldByOther(other)),
        }
    }

    /// Current lock state
    pub async fn status(&self) -> StoreResult<LockStatus> {
        let ttl = self.store.ttl(&self.keys.lock()).await?;
        if ttl == KeyTtl::Missing {
            return Ok(LockStatus {
                locked: false,
                owner_job_id: None,
                ttl: None,
            });
        }
        let owner = self.store.get(&self.keys.lock_owner()).await?;
        Ok(LockStatus {
            locked: true,
            owner_job_id: owner,
            ttl: ttl.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revu_coordination::{InMemoryStore, ManualClock};
    use chrono::{TimeZone, Utc};

    fn lock_with_clock(ttl: Duration) -> (ScrapeLock, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        (ScrapeLock::new(store, KeyLayout::default(), ttl), clock)
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let (lock, _) = lock_with_clock(Duration::from_secs(60));
        assert!(lock.acquire().await.is_ok());
        assert!(matches!(lock.acquire().await, Err(OrchestrationError::LockHeld)));
    }

    #[tokio::test]
    async fn test_release_requires_ownership() {
        let (lock, _) = lock_with_clock(Duration::from_secs(60));
        lock.acquire().await.unwrap();
        lock.record_owner("task-b").await.unwrap();

        assert!(!lock.release("task-a").await.unwrap());
        assert!(lock.status().await.unwrap().locked);

        assert!(lock.release("task-b").await.unwrap());
        assert!(!lock.status().await.unwrap().locked);
    }

    #[tokio::test]
    async fn test_refresh_extends_only_for_owner() {
        let (lock, clock) = lock_with_clock(Duration::from_secs(60));
        lock.acquire().await.unwrap();
        lock.record_owner("task-a").await.unwrap();

        clock.advance(Duration::from_secs(50));
        assert!(!lock.refresh("task-b").await.unwrap());
        assert!(lock.refresh("task-a").await.unwrap());

        clock.advance(Duration::from_secs(50));
        let status = lock.status().await.unwrap();
        assert!(status.locked);
        assert_eq!(status.owner_job_id.as_deref(), Some("task-a"));
        assert_eq!(status.ttl, Some(10));
    }

    #[tokio::test]
    async fn test_lock_expires_without_release() {
        let (lock, clock) = lock_with_clock(Duration::from_secs(60));
        lock.acquire().await.unwrap();
        clock.advance(Duration::from_secs(61));
        assert!(lock.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_reinforce() {
        let (lock, _) = lock_with_clock(Duration::from_secs(60));

        // Free lock is taken
        assert_eq!(lock.reinforce("task-a").await.unwrap(), ReinforceOutcome::Acquired);
        assert_eq!(lock.reinforce("task-a").await.unwrap(), ReinforceOutcome::Refreshed);
        assert_eq!(
            lock.reinforce("task-b").await.unwrap(),
            ReinforceOutcome::HeldByOther(Some("task-a".to_string()))
        );

        // Unowned lock is claimed
        lock.release("task-a").await.unwrap();
        lock.acquire().await.unwrap();
        assert_eq!(lock.reinforce("task-c").await.unwrap(), ReinforceOutcome::Acquired);
        assert_eq!(lock.status().await.unwrap().owner_job_id.as_deref(), Some("task-c"));
    }
}
