//! Store error types.

use thiserror::Error;

/// Errors raised by a document or profile store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        500
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Corrupt(_) => "CORRUPT_DATA",
        }
    }
}
