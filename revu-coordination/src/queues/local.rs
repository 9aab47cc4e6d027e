//! In-process task queue
//!
//! A FIFO shared by the API handlers and worker loops of one process. Native
//! status records and revocation markers expire after the retention window,
//! the same lifetime the Redis queue gives its keys.

use async_trait::async_trait;
use parking_lot::Mutex;
use revu_interfaces::{NativeTaskStatus, QueueResult, QueuedJob, ScrapeJobArgs, TaskQueue};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Retention used by [`LocalTaskQueue::new`]
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

struct NativeRecord {
    status: NativeTaskStatus,
    expires_at: Instant,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedJob>,
    native: HashMap<String, NativeRecord>,
    revoked: HashMap<String, Instant>,
}

impl QueueState {
    fn record(&mut self, task_id: &str, status: NativeTaskStatus, retention: Duration) {
        // A job that ran to completion can no longer be skipped.
        if matches!(status.state.as_str(), "SUCCESS" | "FAILURE") {
            self.revoked.remove(task_id);
        }
        self.native.insert(
            task_id.to_string(),
            NativeRecord {
                status,
                expires_at: Instant::now() + retention,
            },
        );
    }

    fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.native.len() + self.revoked.len();
        self.native.retain(|_, record| record.expires_at > now);
        self.revoked.retain(|_, expires_at| *expires_at > now);
        before - self.native.len() - self.revoked.len()
    }
}

/// Task queue living in the current process
pub struct LocalTaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    retention: Duration,
}

impl Default for LocalTaskQueue {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl LocalTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose native records and revocation markers live for `retention`
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            retention,
        }
    }

    /// Jobs waiting to be dequeued
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Task ids with a live native record or revocation marker
    pub fn tracked_len(&self) -> usize {
        let state = self.state.lock();
        state.native.len() + state.revoked.len()
    }

    /// Drop native records and revocation markers past their retention.
    /// Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        self.state.lock().purge_expired()
    }

    /// Drop the native record of a task, as if the queue's own retention had elapsed
    pub fn forget(&self, task_id: &str) {
        let mut state = self.state.lock();
        state.native.remove(task_id);
        state.revoked.remove(task_id);
    }

    fn try_pop(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock();
        while let Some(job) = state.pending.pop_front() {
            if state.revoked.remove(&job.task_id).is_some() {
                debug!("Skipping revoked task {}", job.task_id);
                state.record(&job.task_id, NativeTaskStatus::new("REVOKED", None), self.retention);
                continue;
            }
            state.record(&job.task_id, NativeTaskStatus::new("STARTED", None), self.retention);
            return Some(job);
        }
        None
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn submit(&self, args: ScrapeJobArgs) -> QueueResult<String> {
        let task_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock();
            state.purge_expired();
            state.record(&task_id, NativeTaskStatus::pending(), self.retention);
            state.pending.push_back(QueuedJob {
                task_id: task_id.clone(),
                args,
            });
        }
        self.notify.notify_one();
        Ok(task_id)
    }

    async fn native_status(&self, task_id: &str) -> QueueResult<Option<NativeTaskStatus>> {
        let state = self.state.lock();
        Ok(state
            .native
            .get(task_id)
            .filter(|record| record.expires_at > Instant::now())
            .map(|record| record.status.clone()))
    }

    async fn revoke(&self, task_id: &str) -> QueueResult<()> {
        self.state
            .lock()
            .revoked
            .insert(task_id.to_string(), Instant::now() + self.retention);
        Ok(())
    }

    async fn update_native_state(&self, task_id: &str, status: NativeTaskStatus) -> QueueResult<()> {
        self.state.lock().record(task_id, status, self.retention);
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> QueueResult<Option<QueuedJob>> {
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.notify.notified();
            if let Some(job) = self.try_pop() {
                return Ok(Some(job));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn args(url: &str) -> ScrapeJobArgs {
        ScrapeJobArgs {
            url: url.to_string(),
            user_id: Some("u1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_fifo_and_native_states() {
        let queue = LocalTaskQueue::new();
        let first = queue.submit(args("https://a")).await.unwrap();
        let second = queue.submit(args("https://b")).await.unwrap();

        assert_eq!(queue.native_status(&first).await.unwrap().unwrap().state, "PENDING");

        let job = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(job.task_id, first);
        assert_eq!(queue.native_status(&first).await.unwrap().unwrap().state, "STARTED");

        let job = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(job.task_id, second);
        assert!(queue.dequeue(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoked_jobs_are_skipped() {
        let queue = LocalTaskQueue::new();
        let revoked = queue.submit(args("https://a")).await.unwrap();
        let kept = queue.submit(args("https://b")).await.unwrap();
        queue.revoke(&revoked).await.unwrap();

        let job = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(job.task_id, kept);
        assert_eq!(queue.native_status(&revoked).await.unwrap().unwrap().state, "REVOKED");
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_submit() {
        let queue = Arc::new(LocalTaskQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let task_id = queue.submit(args("https://a")).await.unwrap();

        let job = consumer.await.unwrap().unwrap().unwrap();
        assert_eq!(job.task_id, task_id);
    }

    #[tokio::test]
    async fn test_forget_drops_native_record() {
        let queue = LocalTaskQueue::new();
        let task_id = queue.submit(args("https://a")).await.unwrap();
        queue.forget(&task_id);
        assert!(queue.native_status(&task_id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_records_expire_after_retention() {
        let queue = LocalTaskQueue::with_retention(Duration::from_secs(60));
        let task_id = queue.submit(args("https://a")).await.unwrap();
        queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        queue
            .update_native_state(&task_id, NativeTaskStatus::new("SUCCESS", None))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(queue.native_status(&task_id).await.unwrap().unwrap().state, "SUCCESS");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(queue.native_status(&task_id).await.unwrap().is_none());
        assert_eq!(queue.purge_expired(), 1);
        assert_eq!(queue.tracked_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revocation_markers_do_not_outlive_their_task() {
        let queue = LocalTaskQueue::with_retention(Duration::from_secs(60));

        // Skipped on pickup: the marker is consumed.
        let skipped = queue.submit(args("https://a")).await.unwrap();
        queue.revoke(&skipped).await.unwrap();
        assert!(queue.dequeue(Duration::from_millis(10)).await.unwrap().is_none());

        // Revoked while running: the terminal state clears it.
        let finished = queue.submit(args("https://b")).await.unwrap();
        queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        queue.revoke(&finished).await.unwrap();
        queue
            .update_native_state(&finished, NativeTaskStatus::new("FAILURE", None))
            .await
            .unwrap();

        // Revoked after it left the queue entirely: retention drops it.
        queue.revoke("gone").await.unwrap();

        let state = queue.state.lock();
        assert!(!state.revoked.contains_key(&skipped));
        assert!(!state.revoked.contains_key(&finished));
        assert!(state.revoked.contains_key("gone"));
        drop(state);

        tokio::time::advance(Duration::from_secs(61)).await;
        queue.purge_expired();
        assert_eq!(queue.tracked_len(), 0);
    }
}
