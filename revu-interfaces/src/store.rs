//! Coordination store interface
//!
//! The coordination store is the single source of truth for the scrape lock,
//! rate counters, cancellation flags and per-task status records. Only atomic
//! single-key operations are assumed, plus one scripted compare-and-delete.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a coordination store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or the command failed in transit
    #[error("Coordination store unavailable: {0}")]
    Unavailable(String),

    /// The stored value cannot be used by the requested operation
    #[error("Invalid value stored under '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Backend-specific error
    #[error("Coordination store backend error: {0}")]
    Backend(String),
}

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists without an expiry
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Remaining lifetime in whole seconds, when the key has one
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            KeyTtl::Expires(d) => Some(d.as_secs()),
            _ => None,
        }
    }
}

/// Shared key-value store with atomic single-key primitives
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Set `key` to `value` with a TTL only if the key is absent.
    ///
    /// Returns `true` when this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Unconditionally set `key` to `value` with a TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Read a key
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Reset the TTL of an existing key, returning whether the key existed
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomically increment an integer counter, creating it at 1.
    ///
    /// An existing TTL is preserved.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Remaining lifetime of a key
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Atomically delete `keys` if and only if `guard_key` currently holds `expected`.
    ///
    /// Returns `true` when the guard matched and the keys were deleted.
    async fn delete_if_equals(&self, guard_key: &str, expected: &str, keys: &[&str]) -> StoreResult<bool>;
}
