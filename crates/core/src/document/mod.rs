//! Invoice and offer documents.
//!
//! # Modules
//!
//! - `types` - The stored document, line items, recurring and reminder settings
//! - `draft` - Typed create/edit input and its validation
//! - `party` - Owner profile and client directory records
//! - `display` - Overdue/expired projection
//! - `view` - Public share-link projection

pub mod display;
pub mod draft;
pub mod party;
pub mod types;
pub mod view;

pub use display::{DisplayStatus, display_status};
pub use draft::{ClientRef, DocumentDraft, DraftError, LineItemDraft, validate_contact};
pub use party::{ClientRecord, OwnerProfile, Plan};
pub use types::{
    ClientSnapshot, Document, LineItem, RecurrenceUnit, RecurringSchedule, ReminderOffset,
    ReminderSettings, new_public_id,
};
pub use view::{PublicDocumentView, PublicLineItem};
