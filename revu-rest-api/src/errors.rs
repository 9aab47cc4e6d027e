//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use revu_orchestration::OrchestrationError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// REST API error type
#[derive(Error, Debug)]
pub enum RestError {
    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

impl RestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            RestError::Conflict(_) => StatusCode::CONFLICT,
            RestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RestError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RestError::RateLimited(_) => "RATE_LIMITED",
            RestError::Conflict(_) => "SCRAPE_IN_PROGRESS",
            RestError::BadRequest(_) => "BAD_REQUEST",
            RestError::Unauthorized(_) => "UNAUTHORIZED",
            RestError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            RestError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        RestError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        RestError::Unauthorized(message.into())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let error_response = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "status": status.as_u16()
            }
        });
        (status, Json(error_response)).into_response()
    }
}

impl From<OrchestrationError> for RestError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::RateLimited { count, limit } => RestError::RateLimited(format!(
                "Daily scrape limit reached ({} of {})",
                count.min(limit),
                limit
            )),
            OrchestrationError::LockHeld => {
                RestError::Conflict("A scrape is already running; try again later".to_string())
            }
            OrchestrationError::StoreUnavailable(e) => RestError::ServiceUnavailable(e.to_string()),
            OrchestrationError::QueueUnavailable(e) => RestError::ServiceUnavailable(e.to_string()),
            OrchestrationError::SubmissionFailed(msg) => {
                RestError::InternalError(format!("Failed to submit scrape job: {}", msg))
            }
            OrchestrationError::InvalidRequest(msg) => RestError::BadRequest(msg),
        }
    }
}
