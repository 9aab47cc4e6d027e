//! Redis list task queue
//!
//! Producers `LPUSH` serialised jobs onto a pending list and workers `RPOP`
//! them. Native status records and revocation markers are plain keys that
//! share the status retention window.

use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use ::redis::RedisError;
use revu_interfaces::{NativeTaskStatus, QueueError, QueueResult, QueuedJob, ScrapeJobArgs, TaskQueue};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::keys::KeyLayout;

/// Longest single sleep between polls of an empty list
const MAX_POLL_SLEEP: Duration = Duration::from_millis(250);

/// Task queue backed by a Redis list
#[derive(Clone)]
pub struct RedisTaskQueue {
    conn: ConnectionManager,
    keys: KeyLayout,
    retention: Duration,
}

impl RedisTaskQueue {
    pub fn new(conn: ConnectionManager, keys: KeyLayout, retention: Duration) -> Self {
        Self {
            conn,
            keys,
            retention,
        }
    }

    fn retention_millis(&self) -> u64 {
        u64::try_from(self.retention.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    async fn write_native(&self, task_id: &str, status: &NativeTaskStatus) -> QueueResult<()> {
        let payload = serde_json::to_string(status)?;
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("SET")
            .arg(self.keys.queue_task(task_id))
            .arg(payload)
            .arg("PX")
            .arg(self.retention_millis())
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn is_revoked(&self, task_id: &str) -> QueueResult<bool> {
        let mut conn = self.conn.clone();
        let count: i64 = ::redis::cmd("EXISTS")
            .arg(self.keys.queue_revoked(task_id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(count > 0)
    }

    async fn pop(&self) -> QueueResult<Option<QueuedJob>> {
        loop {
            let mut conn = self.conn.clone();
            let raw: Option<String> = ::redis::cmd("RPOP")
                .arg(self.keys.queue_pending())
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            let Some(raw) = raw else {
                return Ok(None);
            };

            let job: QueuedJob = match serde_json::from_str(&raw) {
                Ok(job) => job,
                Err(e) => {
                    warn!("Dropping malformed queue entry: {}", e);
                    continue;
                }
            };

            // The job is off the list now; losing it here would strand its lock.
            if treat_as_revoked(&job.task_id, self.is_revoked(&job.task_id).await) {
                debug!("Skipping revoked task {}", job.task_id);
                if let Err(e) = self
                    .write_native(&job.task_id, &NativeTaskStatus::new("REVOKED", None))
                    .await
                {
                    warn!("Failed to mark {} revoked: {}", job.task_id, e);
                }
                continue;
            }

            if let Err(e) = self
                .write_native(&job.task_id, &NativeTaskStatus::new("STARTED", None))
                .await
            {
                warn!("Failed to mark {} started: {}", job.task_id, e);
            }
            return Ok(Some(job));
        }
    }
}

/// Outcome of the revocation check for a job that has already been popped.
/// An unreadable marker runs the job rather than dropping it.
fn treat_as_revoked(task_id: &str, check: QueueResult<bool>) -> bool {
    match check {
        Ok(revoked) => revoked,
        Err(e) => {
            warn!("Revocation check for {} failed, running it: {}", task_id, e);
            false
        }
    }
}

fn unavailable(err: RedisError) -> QueueError {
    QueueError::Unavailable(err.to_string())
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn submit(&self, args: ScrapeJobArgs) -> QueueResult<String> {
        let task_id = Uuid::new_v4().to_string();
        self.write_native(&task_id, &NativeTaskStatus::pending())
            .await
            .map_err(|e| QueueError::Submission(e.to_string()))?;

        let payload = serde_json::to_string(&QueuedJob {
            task_id: task_id.clone(),
            args,
        })?;
        let mut conn = self.conn.clone();
        let _: i64 = ::redis::cmd("LPUSH")
            .arg(self.keys.queue_pending())
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Submission(e.to_string()))?;

        Ok(task_id)
    }

    async fn native_status(&self, task_id: &str) -> QueueResult<Option<NativeTaskStatus>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = ::redis::cmd("GET")
            .arg(self.keys.queue_task(task_id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn revoke(&self, task_id: &str) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("SET")
            .arg(self.keys.queue_revoked(task_id))
            .arg("1")
            .arg("PX")
            .arg(self.retention_millis())
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn update_native_state(&self, task_id: &str, status: NativeTaskStatus) -> QueueResult<()> {
        self.write_native(task_id, &status).await
    }

    async fn dequeue(&self, wait: Duration) -> QueueResult<Option<QueuedJob>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(job) = self.pop().await? {
                return Ok(Some(job));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep((deadline - now).min(MAX_POLL_SLEEP)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popped_job_runs_when_revocation_check_fails() {
        let check = Err(QueueError::Unavailable("connection reset".to_string()));
        assert!(!treat_as_revoked("t1", check));
    }

    #[test]
    fn test_revocation_marker_is_honoured() {
        assert!(treat_as_revoked("t1", Ok(true)));
        assert!(!treat_as_revoked("t1", Ok(false)));
    }
}
