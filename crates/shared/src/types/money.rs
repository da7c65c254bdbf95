//! Money type held in integer minor units with a currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Stored amounts are `i64` minor units (cents, pence); fractional
//! intermediates live in `rust_decimal::Decimal` inside the calculator.

use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in the smallest currency unit (e.g., cents).
    pub minor_units: i64,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

/// ISO 4217 currency codes accepted on documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Pound Sterling
    Gbp,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Canadian Dollar
    Cad,
    /// Australian Dollar
    Aud,
}

impl Currency {
    /// Returns the three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
        }
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.minor_units == 0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GBP" => Ok(Self::Gbp),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "CAD" => Ok(Self::Cad),
            "AUD" => Ok(Self::Aud),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
