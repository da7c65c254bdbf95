//! Core billing logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage and email are reached through the ports in `store` and
//! `tally_shared::Mailer`.
//!
//! # Modules
//!
//! - `pricing` - Money calculator (lines, discount, VAT, processing fee)
//! - `lifecycle` - Invoice and offer status machines
//! - `document` - Documents, drafts, display status and public view
//! - `activity` - Audit log entries
//! - `derivation` - Offer → Invoice derivation
//! - `store` - Storage ports and the in-memory store
//! - `schedule` - Calendar, recurring and reminder schedulers
//! - `billing` - The service binding it all together

pub mod activity;
pub mod billing;
pub mod derivation;
pub mod document;
pub mod lifecycle;
pub mod pricing;
pub mod schedule;
pub mod store;

#[cfg(test)]
mod test_fixtures;
