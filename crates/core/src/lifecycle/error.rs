//! Lifecycle error types.

use thiserror::Error;

use crate::lifecycle::types::{DocumentKind, DocumentStatus};

/// Errors returned when a requested transition is not allowed.
///
/// "Already in the target state" is kept apart from "incompatible state"
/// so callers can tell a double click from a real conflict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The document is already in the requested state.
    #[error("Document is already {status}")]
    AlreadyInState {
        /// The current status.
        status: DocumentStatus,
    },

    /// The current state does not allow the requested action.
    #[error("Cannot {action} a document that is {from}")]
    Incompatible {
        /// The current status.
        from: DocumentStatus,
        /// The attempted action.
        action: &'static str,
    },

    /// The action does not exist for this kind of document.
    #[error("Cannot {action} an {kind}")]
    WrongKind {
        /// The document's kind.
        kind: DocumentKind,
        /// The attempted action.
        action: &'static str,
    },

    /// Content edits are closed in the current state.
    #[error("Document is {status} and can no longer be edited")]
    NotEditable {
        /// The current status.
        status: DocumentStatus,
    },

    /// The offer's due date has passed.
    #[error("Cannot {action} an offer that has expired")]
    Expired {
        /// The stored status.
        status: DocumentStatus,
        /// The attempted action.
        action: &'static str,
    },
}

impl LifecycleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::WrongKind { .. } => 400,
            Self::AlreadyInState { .. }
            | Self::Incompatible { .. }
            | Self::NotEditable { .. }
            | Self::Expired { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyInState { .. } => "ALREADY_IN_STATE",
            Self::Incompatible { .. } => "INVALID_TRANSITION",
            Self::WrongKind { .. } => "WRONG_DOCUMENT_KIND",
            Self::NotEditable { .. } => "NOT_EDITABLE",
            Self::Expired { .. } => "OFFER_EXPIRED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::types::{InvoiceStatus, OfferStatus};

    #[test]
    fn test_already_in_state_error() {
        let err = LifecycleError::AlreadyInState {
            status: DocumentStatus::Invoice(InvoiceStatus::Void),
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_IN_STATE");
        assert_eq!(err.to_string(), "Document is already void");
    }

    #[test]
    fn test_incompatible_error() {
        let err = LifecycleError::Incompatible {
            from: DocumentStatus::Offer(OfferStatus::Declined),
            action: "accept",
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("declined"));
    }

    #[test]
    fn test_wrong_kind_error() {
        let err = LifecycleError::WrongKind {
            kind: DocumentKind::Offer,
            action: "void",
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "WRONG_DOCUMENT_KIND");
    }

    #[test]
    fn test_expired_error() {
        let err = LifecycleError::Expired {
            status: DocumentStatus::Offer(OfferStatus::Viewed),
            action: "accept",
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "OFFER_EXPIRED");
        assert_eq!(err.to_string(), "Cannot accept an offer that has expired");
    }
}
