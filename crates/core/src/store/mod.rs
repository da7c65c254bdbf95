//! Storage ports consumed by the billing core.
//!
//! The relational implementation lives in the `tally-db` crate;
//! `memory::InMemoryStore` backs tests and local runs.
//!
//! # Modules
//!
//! - `types` - Conditional write descriptions
//! - `error` - Store errors
//! - `memory` - In-memory implementation of both stores

pub mod error;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{ClientId, DocumentId, OwnerId, PageRequest};

use crate::activity::ActivityEntry;
use crate::document::{ClientRecord, Document, OwnerProfile, RecurringSchedule, ReminderOffset};
use crate::lifecycle::{DocumentKind, DocumentStatus};

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use types::{ReminderClaim, ReminderSlot, SettlementWrite, StatusChange};

/// Documents, their line items and the activity log.
///
/// Methods returning `bool` are compare-and-swap writes: `false` means the
/// stored state no longer matched and nothing was written.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads a document owned by `owner`.
    async fn find(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Loads a document by its share-link token.
    async fn find_by_public_id(
        &self,
        kind: DocumentKind,
        public_id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Loads an invoice without an owner scope (settlement events).
    async fn find_invoice(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Allocates the next human number for an owner and kind.
    async fn next_number(&self, owner: OwnerId, kind: DocumentKind)
    -> Result<String, StoreError>;

    /// Counts documents of a kind created at or after `since`.
    async fn count_created_since(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Persists a new document with its line items and an audit entry.
    async fn insert(&self, document: &Document, entry: &ActivityEntry) -> Result<(), StoreError>;

    /// Replaces the editable content while the status is still `expected`.
    async fn update_content(
        &self,
        document: &Document,
        expected: DocumentStatus,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError>;

    /// Applies a status transition.
    async fn transition(
        &self,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError>;

    /// Moves a document to sent without an audit entry, reserving the
    /// delivery. Requires `sent_at` to be unset.
    async fn claim_send(&self, change: &StatusChange) -> Result<bool, StoreError>;

    /// Gives a send reservation back after a failed delivery.
    async fn release_send(&self, change: &StatusChange) -> Result<bool, StoreError>;

    /// Accepts an offer and persists its derived invoice in one unit of work.
    ///
    /// The invoice number is allocated inside the same unit of work and
    /// written to `invoice.number`. Either the offer is accepted, the
    /// invoice and its lines exist and the offer links to it, or nothing is
    /// written and no number is used up.
    async fn accept_offer(
        &self,
        change: &StatusChange,
        invoice: &mut Document,
        entries: &[ActivityEntry],
    ) -> Result<bool, StoreError>;

    /// Marks an invoice paid and records the settlement event id in one
    /// unit of work.
    async fn settle_invoice(
        &self,
        event_id: &str,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<SettlementWrite, StoreError>;

    /// Sets or clears the recurring configuration.
    async fn set_recurring(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        recurring: Option<RecurringSchedule>,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError>;

    /// Sets reminder configuration. Firing state is left untouched.
    async fn set_reminders(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        auto_enabled: bool,
        offsets: &[ReminderOffset],
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError>;

    /// Outstanding recurring templates with a client email.
    async fn recurring_templates(&self) -> Result<Vec<Document>, StoreError>;

    /// Outstanding invoices with automatic reminders on and a client email.
    async fn reminder_candidates(&self) -> Result<Vec<Document>, StoreError>;

    /// Reserves a recurring cycle by moving `last_recurred_at` from
    /// `expected_last` to `at`.
    async fn claim_recurrence(
        &self,
        id: DocumentId,
        expected_last: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Restores `previous` after a failed cycle, if `last_recurred_at` is
    /// still `claimed_at`.
    async fn release_recurrence(
        &self,
        id: DocumentId,
        claimed_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    /// Reserves a reminder send.
    async fn claim_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError>;

    /// Gives a reservation back after a failed send.
    async fn release_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError>;

    /// Appends an audit entry on its own.
    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError>;

    /// Owner's audit entries, newest first, with the total count.
    async fn recent_activity(
        &self,
        owner: OwnerId,
        page: &PageRequest,
    ) -> Result<(Vec<ActivityEntry>, u64), StoreError>;
}

/// Read-only owner profile and client directory.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads an owner's billing profile.
    async fn owner_profile(&self, owner: OwnerId) -> Result<Option<OwnerProfile>, StoreError>;

    /// Loads a client from the owner's directory.
    async fn client(
        &self,
        owner: OwnerId,
        id: ClientId,
    ) -> Result<Option<ClientRecord>, StoreError>;
}
