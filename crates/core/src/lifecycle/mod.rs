//! Document lifecycle for invoices and offers.
//!
//! # Modules
//!
//! - `types` - Kinds, stored statuses and lifecycle actions
//! - `error` - Transition errors
//! - `service` - State transition logic

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::LifecycleError;
pub use service::LifecycleService;
pub use types::{
    DocumentKind, DocumentStatus, InvoiceStatus, LifecycleAction, Milestone, OfferStatus,
};
