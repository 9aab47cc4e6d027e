use serde::{Deserialize, Serialize};
use std::fmt;

/// Error recorded on envelopes of cancelled jobs
pub const CANCELLED_BY_USER: &str = "cancelled by user";

/// Job state as reported to clients
///
/// Queue-native states outside the protocol (`STARTED`, `RETRY`, ...) pass
/// through as [`JobState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
    Revoked,
    Unknown,
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Progress => "PROGRESS",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
            JobState::Revoked => "REVOKED",
            JobState::Unknown => "UNKNOWN",
            JobState::Other(state) => state,
        }
    }

    /// SUCCESS, FAILURE and REVOKED never change once observed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure | JobState::Revoked)
    }
}

impl From<String> for JobState {
    fn from(state: String) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "PENDING" => JobState::Pending,
            "PROGRESS" => JobState::Progress,
            "SUCCESS" => JobState::Success,
            "FAILURE" => JobState::Failure,
            "REVOKED" => JobState::Revoked,
            "UNKNOWN" => JobState::Unknown,
            _ => JobState::Other(state),
        }
    }
}

impl From<&str> for JobState {
    fn from(state: &str) -> Self {
        JobState::from(state.to_string())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The small status record stored under a task's meta key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub state: JobState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusEnvelope {
    pub fn progress(pct: u8) -> Self {
        Self {
            state: JobState::Progress,
            progress: pct.min(100),
            error: None,
        }
    }

    pub fn success() -> Self {
        Self {
            state: JobState::Success,
            progress: 100,
            error: None,
        }
    }

    pub fn failure(pct: u8, error: impl Into<String>) -> Self {
        Self {
            state: JobState::Failure,
            progress: pct.min(100),
            error: Some(error.into()),
        }
    }

    pub fn revoked(pct: u8) -> Self {
        Self {
            state: JobState::Revoked,
            progress: pct.min(100),
            error: Some(CANCELLED_BY_USER.to_string()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
