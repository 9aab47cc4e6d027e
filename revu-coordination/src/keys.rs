//! Key layout shared by the API process and every worker

use chrono::{DateTime, Utc};

/// Names every key written to the coordination store, namespaced under a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The single-flight lock
    pub fn lock(&self) -> String {
        format!("{}:scrape:lock", self.prefix)
    }

    /// Task id currently holding the lock
    pub fn lock_owner(&self) -> String {
        format!("{}:scrape:lock:task", self.prefix)
    }

    /// Status envelope of a task
    pub fn meta(&self, task_id: &str) -> String {
        format!("{}:task:{}:meta", self.prefix, task_id)
    }

    /// Result payload of a task
    pub fn result(&self, task_id: &str) -> String {
        format!("{}:task:{}:result", self.prefix, task_id)
    }

    /// Cancellation flag of a task
    pub fn cancel(&self, task_id: &str) -> String {
        format!("{}:task:{}:cancel", self.prefix, task_id)
    }

    /// User that submitted a task
    pub fn task_owner(&self, task_id: &str) -> String {
        format!("{}:task:{}:owner", self.prefix, task_id)
    }

    /// Product URL a task scrapes
    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}:task:{}:url", self.prefix, task_id)
    }

    /// Per-user counter for the UTC calendar day containing `at`
    pub fn rate(&self, user_id: &str, at: DateTime<Utc>) -> String {
        format!("{}:rate:{}:{}", self.prefix, user_id, at.format("%Y%m%d"))
    }

    /// Pending job list of the Redis queue
    pub fn queue_pending(&self) -> String {
        format!("{}:queue:pending", self.prefix)
    }

    /// Native status record of a queued task
    pub fn queue_task(&self, task_id: &str) -> String {
        format!("{}:queue:task:{}", self.prefix, task_id)
    }

    /// Revocation marker of a queued task
    pub fn queue_revoked(&self, task_id: &str) -> String {
        format!("{}:queue:revoked:{}", self.prefix, task_id)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new("revu")
    }
}
