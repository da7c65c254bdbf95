//! Owner, client and scheduler operations.
//!
//! # Modules
//!
//! - `context` - Injected stores, mailer and rules
//! - `error` - Caller-facing error taxonomy
//! - `service` - The operations themselves

pub mod context;
pub mod error;
pub mod service;


pub use context::{BillingContext, BillingPolicy, BillingRules, RulesError};
pub use error::{BillingError, TransitionFailure};
pub use service::{
    AcceptedOffer, BillingService, RecurrenceRequest, ReminderRequest, SettlementEvent,
    SettlementOutcome,
};
