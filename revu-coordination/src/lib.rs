//! # Revu Coordination
//!
//! Backends for the coordination seams defined in `revu-interfaces`:
//!
//! - [`InMemoryStore`] and [`RedisStore`] implement `CoordinationStore`
//! - [`LocalTaskQueue`] and [`RedisTaskQueue`] implement `TaskQueue`
//! - [`KeyLayout`] names every key the system writes
//! - [`SystemClock`] and [`ManualClock`] implement `Clock`

pub mod clock;
pub mod keys;
pub mod queues;
pub mod stores;

pub use clock::{ManualClock, SystemClock};
pub use keys::KeyLayout;
pub use queues::{LocalTaskQueue, RedisTaskQueue};
pub use stores::{InMemoryStore, RedisStore};
