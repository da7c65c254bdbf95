//! Offer → Invoice derivation.
//!
//! # Modules
//!
//! - `deriver` - Builds the frozen-price invoice
//! - `error` - Derivation errors

pub mod deriver;
pub mod error;

#[cfg(test)]
mod deriver_props;

pub use deriver::OfferDeriver;
pub use error::DerivationError;
