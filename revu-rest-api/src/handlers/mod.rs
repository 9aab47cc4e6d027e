pub mod health;
pub mod scrape;

// Re-export handler functions
pub use health::*;
pub use scrape::*;
