//! In-process coordination store
//!
//! Every primitive takes the write lock for its whole duration, which makes
//! each operation atomic with respect to all others, including the
//! compare-and-delete. Expiry is judged lazily against the injected clock.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use revu_interfaces::{Clock, CoordinationStore, KeyTtl, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::SystemClock;

#[derive(Debug, Clone)]
struct StoreEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoreEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// TTL-aware key-value store held in memory
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.read().values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn expiry(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        let ttl = ChronoDuration::from_std(ttl).ok()?;
        self.clock.now().checked_add_signed(ttl)
    }

    /// Live entry lookup that evicts the key when it has expired
    fn live<'a>(
        entries: &'a mut HashMap<String, StoreEntry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut StoreEntry> {
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.write();
        if Self::live(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let expires_at = self.expiry(ttl);
        self.entries.write().insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        Ok(Self::live(&mut entries, key, now).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        Ok(entries.remove(key).is_some_and(|e| !e.is_expired(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.write();
        match Self::live(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        match Self::live(&mut entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| StoreError::InvalidValue {
                    key: key.to_string(),
                    message: "value is not an integer".to_string(),
                })?;
                let next = current.checked_add(1).ok_or_else(|| StoreError::InvalidValue {
                    key: key.to_string(),
                    message: "increment would overflow".to_string(),
                })?;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    StoreEntry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        Ok(match Self::live(&mut entries, key, now) {
            None => KeyTtl::Missing,
            Some(StoreEntry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(StoreEntry {
                expires_at: Some(expires_at),
                ..
            }) => KeyTtl::Expires((*expires_at - now).to_std().unwrap_or_default()),
        })
    }

    async fn delete_if_equals(&self, guard_key: &str, expected: &str, keys: &[&str]) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let matches = Self::live(&mut entries, guard_key, now).is_some_and(|e| e.value == expected);
        if matches {
            for key in keys {
                entries.remove(*key);
            }
        }
        Ok(matches)
    }
}
