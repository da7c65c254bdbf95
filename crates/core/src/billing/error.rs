//! Billing error taxonomy.

use chrono::{DateTime, Utc};
use tally_shared::EmailError;
use thiserror::Error;

use crate::derivation::DerivationError;
use crate::document::DraftError;
use crate::lifecycle::LifecycleError;
use crate::pricing::PricingError;
use crate::store::StoreError;

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionFailure {
    /// The document is already in the requested state.
    AlreadyInState,
    /// The current state is terminal or otherwise incompatible.
    Incompatible,
}

/// Errors returned by billing operations.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Input rejected before any write.
    #[error("{message}")]
    Validation {
        /// Machine-readable code.
        code: &'static str,
        /// Caller-visible message.
        message: String,
    },

    /// Wrong current status for the requested transition; nothing written.
    #[error("{source}")]
    InvalidTransition {
        /// Already-in-state or incompatible.
        failure: TransitionFailure,
        /// Underlying lifecycle error.
        source: LifecycleError,
    },

    /// Unknown id, or not owned by the caller.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up.
        what: &'static str,
    },

    /// Offer → Invoice derivation failed; neither record was changed.
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    /// Free plan monthly counter exhausted.
    #[error("Monthly limit of {limit} documents reached on the free plan")]
    PlanLimitReached {
        /// Configured limit.
        limit: u32,
    },

    /// Manual reminder sent too recently.
    #[error("A reminder was sent recently; next one allowed after {retry_after}")]
    RateLimited {
        /// Earliest time the next manual reminder is allowed.
        retry_after: DateTime<Utc>,
    },

    /// Outbound email failed.
    #[error("Email delivery failed: {0}")]
    Delivery(#[from] EmailError),

    /// The document changed between read and write.
    #[error("Document was changed concurrently, reload and retry")]
    Conflict,

    /// Backing store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BillingError {
    /// Validation error with a code and message.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::InvalidTransition { .. } | Self::Conflict => 409,
            Self::NotFound { .. } => 404,
            Self::Derivation(err) => err.status_code(),
            Self::PlanLimitReached { .. } => 402,
            Self::RateLimited { .. } => 429,
            Self::Delivery(_) => 502,
            Self::Store(err) => err.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => *code,
            Self::InvalidTransition { source, .. } => source.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Derivation(err) => err.error_code(),
            Self::PlanLimitReached { .. } => "PLAN_LIMIT_REACHED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Delivery(_) => "EMAIL_DELIVERY_FAILED",
            Self::Conflict => "CONFLICT",
            Self::Store(err) => err.error_code(),
        }
    }
}

impl From<LifecycleError> for BillingError {
    fn from(source: LifecycleError) -> Self {
        let failure = match source {
            LifecycleError::AlreadyInState { .. } => TransitionFailure::AlreadyInState,
            LifecycleError::Incompatible { .. }
            | LifecycleError::WrongKind { .. }
            | LifecycleError::NotEditable { .. }
            | LifecycleError::Expired { .. } => TransitionFailure::Incompatible,
        };
        Self::InvalidTransition { failure, source }
    }
}

impl From<PricingError> for BillingError {
    fn from(err: PricingError) -> Self {
        Self::validation(err.error_code(), err.to_string())
    }
}

impl From<DraftError> for BillingError {
    fn from(err: DraftError) -> Self {
        Self::validation(err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{DocumentStatus, OfferStatus};

    #[test]
    fn test_lifecycle_errors_keep_failure_kind() {
        let err = BillingError::from(LifecycleError::AlreadyInState {
            status: DocumentStatus::Offer(OfferStatus::Accepted),
        });
        assert!(matches!(
            err,
            BillingError::InvalidTransition {
                failure: TransitionFailure::AlreadyInState,
                ..
            }
        ));
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_IN_STATE");
    }

    #[test]
    fn test_pricing_error_is_validation() {
        let err = BillingError::from(PricingError::BelowMinimum {
            amount: 50,
            minimum: 100,
        });
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "BELOW_MINIMUM_CHARGE");
        assert!(err.to_string().contains("minimum charge"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BillingError::NotFound { what: "Invoice" }.status_code(), 404);
        assert_eq!(BillingError::PlanLimitReached { limit: 5 }.status_code(), 402);
        assert_eq!(
            BillingError::Delivery(EmailError::SendError("x".into())).status_code(),
            502
        );
        assert_eq!(BillingError::Conflict.error_code(), "CONFLICT");
    }
}
