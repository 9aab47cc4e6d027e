//! Job status protocol
//!
//! The worker writes a small envelope under the task's meta key and, on
//! success, the full payload under a separate result key. Status reads go to
//! the envelope first and fall back to the task queue's own record only when
//! the envelope is missing or unreadable.

pub mod envelope;
pub mod reader;
pub mod writer;

pub use envelope::{JobState, StatusEnvelope};
pub use reader::{JobStatusView, StatusObservation, StatusReader, StatusSource};
pub use writer::StatusWriter;
