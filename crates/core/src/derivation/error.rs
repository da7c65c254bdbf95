//! Derivation error types.

use thiserror::Error;

use crate::lifecycle::DocumentStatus;

/// Errors raised while building an invoice from an offer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// The source document is an invoice.
    #[error("Only offers can be turned into invoices")]
    NotAnOffer,

    /// The offer is not in a state that can be accepted.
    #[error("Offer is {status} and cannot be accepted")]
    OfferNotAcceptable {
        /// Current offer status.
        status: DocumentStatus,
    },

    /// The offer already links to an invoice.
    #[error("Offer already has an invoice")]
    AlreadyDerived,

    /// The acceptance and invoice write did not complete.
    #[error("Offer acceptance could not be completed: {0}")]
    Incomplete(String),
}

impl DerivationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotAnOffer => 400,
            Self::OfferNotAcceptable { .. } | Self::AlreadyDerived => 409,
            Self::Incomplete(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnOffer => "NOT_AN_OFFER",
            Self::OfferNotAcceptable { .. } => "OFFER_NOT_ACCEPTABLE",
            Self::AlreadyDerived => "OFFER_ALREADY_INVOICED",
            Self::Incomplete(_) => "DERIVATION_FAILED",
        }
    }
}
