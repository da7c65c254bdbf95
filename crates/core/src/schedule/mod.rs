//! Time-driven schedulers.
//!
//! Neither scheduler runs on its own: both are invoked by an external
//! periodic trigger and tolerate overlapping invocations.
//!
//! # Modules
//!
//! - `calendar` - Local-day arithmetic in the billing time zone
//! - `recurring` - Recurring invoice generation
//! - `reminder` - Automatic payment reminders

pub mod calendar;
pub mod recurring;
pub mod reminder;

pub use calendar::BillingCalendar;
pub use recurring::{RecurringRunSummary, RecurringScheduler, build_successor, next_due};
pub use reminder::{ReminderRunSummary, ReminderScheduler, due_offsets};
