use revu_coordination::KeyLayout;
use revu_interfaces::{
    CoordinationStore, NativeTaskStatus, ProductMeta, ReviewRecord, ScrapeResult, TaskQueue,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

use super::envelope::{JobState, StatusEnvelope, CANCELLED_BY_USER};
use crate::error::OrchestrationResult;

/// Status of a job as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub state: JobState,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<ReviewRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusView {
    fn bare(job_id: &str, state: JobState, progress: u8) -> Self {
        Self {
            job_id: job_id.to_string(),
            state,
            progress,
            result: None,
            count: None,
            product: None,
            error: None,
        }
    }
}

/// Where a status answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Envelope,
    NativeFallback,
}

/// A status read together with the full stored result, when there is one
#[derive(Debug, Clone)]
pub struct StatusObservation {
    pub view: JobStatusView,
    pub result: Option<ScrapeResult>,
    pub source: StatusSource,
}

/// Read side of the status protocol
#[derive(Clone)]
pub struct StatusReader {
    store: Arc<dyn CoordinationStore>,
    queue: Arc<dyn TaskQueue>,
    keys: KeyLayout,
}

impl StatusReader {
    pub fn new(store: Arc<dyn CoordinationStore>, queue: Arc<dyn TaskQueue>, keys: KeyLayout) -> Self {
        Self { store, queue, keys }
    }

    /// Read the status of `job_id`.
    ///
    /// Fails only when the meta key cannot be read or the fallback lookup
    /// cannot reach the queue.
    pub async fn read(&self, job_id: &str) -> OrchestrationResult<StatusObservation> {
        let raw = self.store.get(&self.keys.meta(job_id)).await?;

        let envelope = match raw {
            Some(raw) => match StatusEnvelope::parse(&raw) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    warn!("Malformed status envelope for {}: {}", job_id, e);
                    None
                }
            },
            None => None,
        };

        match envelope {
            Some(envelope) => Ok(self.from_envelope(job_id, envelope).await),
            None => self.from_native(job_id).await,
        }
    }

    async fn from_envelope(&self, job_id: &str, envelope: StatusEnvelope) -> StatusObservation {
        let mut view = JobStatusView::bare(job_id, envelope.state.clone(), envelope.progress);
        view.error = envelope.error;

        let mut result = None;
        if envelope.state == JobState::Success {
            result = self.read_result(job_id).await;
            match &result {
                Some(payload) => {
                    view.result = Some(payload.reviews.clone());
                    view.count = Some(payload.count);
                    view.product = payload.product.clone();
                }
                None => debug!("Task {} succeeded but its result is gone", job_id),
            }
        }

        StatusObservation {
            view,
            result,
            source: StatusSource::Envelope,
        }
    }

    /// Missing or unreadable result payloads read as "done but contentless"
    async fn read_result(&self, job_id: &str) -> Option<ScrapeResult> {
        let raw = match self.store.get(&self.keys.result(job_id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Could not read result of {}: {}", job_id, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Malformed result payload for {}: {}", job_id, e);
                None
            }
        }
    }

    async fn from_native(&self, job_id: &str) -> OrchestrationResult<StatusObservation> {
        let native = self.queue.native_status(job_id).await?;
        let view = match native {
            Some(native) => map_native_status(job_id, native),
            None => JobStatusView::bare(job_id, JobState::Unknown, 0),
        };
        Ok(StatusObservation {
            view,
            result: None,
            source: StatusSource::NativeFallback,
        })
    }
}

/// Normalise a queue-native status into the client contract
pub fn map_native_status(job_id: &str, native: NativeTaskStatus) -> JobStatusView {
    let state = JobState::from(native.state);
    let info = native.info.unwrap_or(JsonValue::Null);

    match state {
        JobState::Success => {
            let mut view = JobStatusView::bare(job_id, JobState::Success, 100);
            if info.is_object() {
                view.result = info
                    .get("reviews")
                    .and_then(|v| serde_json::from_value(v.clone()).ok());
                view.count = info
                    .get("count")
                    .and_then(JsonValue::as_u64)
                    .map(|c| c as usize);
                view.product = info
                    .get("product")
                    .and_then(|v| serde_json::from_value(v.clone()).ok());
            }
            view
        }
        JobState::Failure => {
            let mut view = JobStatusView::bare(job_id, JobState::Failure, info_progress(&info));
            view.error = Some(info_error(&info).unwrap_or_else(|| "unknown error".to_string()));
            view
        }
        JobState::Revoked => {
            let mut view = JobStatusView::bare(job_id, JobState::Revoked, info_progress(&info));
            view.error = Some(info_error(&info).unwrap_or_else(|| CANCELLED_BY_USER.to_string()));
            view
        }
        other => JobStatusView::bare(job_id, other, info_progress(&info)),
    }
}

fn info_progress(info: &JsonValue) -> u8 {
    info.get("progress")
        .and_then(JsonValue::as_f64)
        .map(|p| p.clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

/// `exc` or `error` field, or the payload itself when it is a bare value
fn info_error(info: &JsonValue) -> Option<String> {
    match info {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(map) => map
            .get("exc")
            .or_else(|| map.get("error"))
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            }),
        other => Some(other.to_string()),
    }
}
