//! Task queue backends

pub mod local;
pub mod redis;

pub use local::LocalTaskQueue;
pub use self::redis::RedisTaskQueue;
