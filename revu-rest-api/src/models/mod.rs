//! Request and response bodies

pub mod health;
pub mod scrape;

pub use health::HealthResponse;
pub use scrape::{StartScrapeRequest, StartScrapeResponse};
