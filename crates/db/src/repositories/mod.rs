//! Repository abstractions for data access.
//!
//! Repositories implement the storage ports of `tally-core`, hiding the
//! `SeaORM` implementation details from the rest of the application.

pub mod document;
pub mod profile;

pub use document::DocumentRepository;
pub use profile::ProfileRepository;
