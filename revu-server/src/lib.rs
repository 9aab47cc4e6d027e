//! Revu server
//!
//! Wires configuration, coordination backends, the HTTP surface and the scrape
//! worker into one binary that runs as `api`, `worker` or `all`.

pub mod collaborators;
pub mod startup;

pub use collaborators::ApifySource;
pub use startup::{build_backends, shutdown_signal, Backends, Role, Server};
