//! Scrape endpoint bodies

use serde::{Deserialize, Serialize};

use crate::errors::RestError;

/// Body of `POST /start-scrape`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScrapeRequest {
    pub url: String,
}

impl StartScrapeRequest {
    /// The URL must be absolute http(s)
    pub fn validated_url(&self) -> Result<url::Url, RestError> {
        let parsed = url::Url::parse(self.url.trim())
            .map_err(|e| RestError::bad_request(format!("Invalid url: {}", e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(RestError::bad_request(format!(
                "Unsupported url scheme '{}'",
                other
            ))),
        }
    }
}

/// Body returned by `POST /start-scrape`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScrapeResponse {
    pub job_id: String,
}
