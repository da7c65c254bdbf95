//! Money Calculator.
//!
//! Pure computation of a document's final charge in minor units from its
//! line items, discount, VAT and processing-fee options.
//!
//! # Modules
//!
//! - `types` - Calculator inputs, configuration and breakdown
//! - `error` - Pricing-specific error types
//! - `calculator` - The rounding pipeline

pub mod calculator;
pub mod error;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::MoneyCalculator;
pub use error::PricingError;
pub use types::{Discount, LineCharge, PriceBreakdown, PricingConfig, PricingInput};
