//! Pricing error types.

use thiserror::Error;

/// Errors returned by the Money Calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A document must carry at least one line item.
    #[error("At least one line item is required")]
    NoLineItems,

    /// A line item has a negative unit price.
    #[error("Line item {index} has a negative amount")]
    NegativeLineAmount {
        /// Zero-based position of the offending line.
        index: usize,
    },

    /// Fixed document discount is negative.
    #[error("Fixed discount must not be negative")]
    NegativeDiscount,

    /// Final amount is under the minimum charge.
    #[error("Amount {amount} is below the minimum charge of {minimum}")]
    BelowMinimum {
        /// Computed final amount in minor units.
        amount: i64,
        /// Configured minimum in minor units.
        minimum: i64,
    },

    /// An intermediate value does not fit in minor units.
    #[error("Amount overflow")]
    Overflow,

    /// Settings could not be turned into a pricing configuration.
    #[error("Invalid pricing configuration: {0}")]
    InvalidConfig(String),
}

impl PricingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidConfig(_) => 500,
            _ => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoLineItems => "NO_LINE_ITEMS",
            Self::NegativeLineAmount { .. } => "NEGATIVE_LINE_AMOUNT",
            Self::NegativeDiscount => "NEGATIVE_DISCOUNT",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM_CHARGE",
            Self::Overflow => "AMOUNT_OVERFLOW",
            Self::InvalidConfig(_) => "INVALID_PRICING_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_minimum_message() {
        let err = PricingError::BelowMinimum {
            amount: 99,
            minimum: 100,
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "BELOW_MINIMUM_CHARGE");
        assert_eq!(err.to_string(), "Amount 99 is below the minimum charge of 100");
    }

    #[test]
    fn test_invalid_config_is_server_error() {
        let err = PricingError::InvalidConfig("bad".into());
        assert_eq!(err.status_code(), 500);
    }
}
