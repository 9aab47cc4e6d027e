//! Pieces of the scrape job body that do not touch coordination state

pub mod normalize;
pub mod url;

use revu_interfaces::{Cancelled, SourceError};
use thiserror::Error;

pub use self::normalize::{flatten_items, normalize_review, truncate_words};
pub use self::url::{parse_product_url, ProductUrl};

/// Why a job body stopped before producing a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("cancelled by user")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

impl From<Cancelled> for JobError {
    fn from(_: Cancelled) -> Self {
        JobError::Cancelled
    }
}

impl From<SourceError> for JobError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => JobError::Cancelled,
            other => JobError::Failed(other.to_string()),
        }
    }
}
