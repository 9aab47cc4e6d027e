//! Concrete collaborators used by the binary

pub mod apify;

pub use apify::ApifySource;
