//! Activity and audit recorder.
//!
//! Entries are written by the store in the same unit of work as the
//! change they describe and are never updated or deleted.

pub mod types;

pub use types::{ActivityEntry, ActivityKind};
