//! Payload types shared between the worker, the status reader and collaborators

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single normalised review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_text: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_date: Option<String>,
}

/// Product metadata attached to a finished job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMeta {
    pub asin: String,
    pub source: String,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "countReviews", default)]
    pub count_reviews: Option<u64>,
}

/// Payload stored under the per-task result key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub count: usize,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
    #[serde(default)]
    pub product: Option<ProductMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    /// Result payload written alongside a FAILURE envelope
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            count: 0,
            reviews: Vec::new(),
            product: None,
            analysis: None,
            error: Some(error.into()),
        }
    }
}

/// What to fetch from a review source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub asin: String,
    /// Marketplace domain code, e.g. `com` or `co.uk`
    pub domain_code: String,
    pub max_reviews: usize,
    pub max_pages: usize,
}

/// Product facts reported by a review source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductInfo {
    pub product_name: Option<String>,
    pub count_reviews: Option<u64>,
    pub price: Option<String>,
}

/// Raw items returned by a review source, before normalisation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedReviews {
    pub items: Vec<JsonValue>,
    pub product: ProductInfo,
}
