//! In-memory document and profile store.
//!
//! Holds everything behind one mutex, so each method is a single atomic
//! unit of work with the same compare-and-swap semantics as the
//! relational store.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{ClientId, DocumentId, OwnerId, PageRequest};

use crate::activity::ActivityEntry;
use crate::document::{ClientRecord, Document, OwnerProfile, RecurringSchedule, ReminderOffset};
use crate::lifecycle::{DocumentKind, DocumentStatus};
use crate::store::error::StoreError;
use crate::store::types::{ReminderClaim, SettlementWrite, StatusChange};
use crate::store::{DocumentStore, ProfileStore};

#[derive(Debug, Default)]
struct State {
    documents: HashMap<DocumentId, Document>,
    counters: HashMap<(OwnerId, DocumentKind), i64>,
    activity: Vec<ActivityEntry>,
    settlement_events: HashSet<String>,
    profiles: HashMap<OwnerId, OwnerProfile>,
    clients: HashMap<ClientId, ClientRecord>,
    fail_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Database("write rejected".to_string()));
        }
        Ok(())
    }
}

/// Mutex-backed implementation of [`DocumentStore`] and [`ProfileStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    /// Seeds or replaces an owner profile.
    pub fn put_profile(&self, profile: OwnerProfile) -> Result<(), StoreError> {
        self.lock()?.profiles.insert(profile.owner_id, profile);
        Ok(())
    }

    /// Seeds or replaces a directory client.
    pub fn put_client(&self, client: ClientRecord) -> Result<(), StoreError> {
        self.lock()?.clients.insert(client.id, client);
        Ok(())
    }

    /// Makes every following write fail with a database error.
    pub fn fail_writes(&self, fail: bool) -> Result<(), StoreError> {
        self.lock()?.fail_writes = fail;
        Ok(())
    }

    /// Every stored document.
    pub fn documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.lock()?.documents.values().cloned().collect())
    }

    /// Every audit entry in insertion order.
    pub fn activity(&self) -> Result<Vec<ActivityEntry>, StoreError> {
        Ok(self.lock()?.activity.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .get(&id)
            .filter(|d| d.owner_id == owner && d.kind() == kind)
            .cloned())
    }

    async fn find_by_public_id(
        &self,
        kind: DocumentKind,
        public_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .find(|d| d.kind() == kind && d.public_id == public_id)
            .cloned())
    }

    async fn find_invoice(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .get(&id)
            .filter(|d| d.kind() == DocumentKind::Invoice)
            .cloned())
    }

    async fn next_number(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
    ) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let counter = state.counters.entry((owner, kind)).or_insert(0);
        *counter += 1;
        Ok(kind.format_number(*counter))
    }

    async fn count_created_since(
        &self,
        owner: OwnerId,
        kind: DocumentKind,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count = self
            .lock()?
            .documents
            .values()
            .filter(|d| d.owner_id == owner && d.kind() == kind && d.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn insert(&self, document: &Document, entry: &ActivityEntry) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        state.documents.insert(document.id, document.clone());
        state.activity.push(entry.clone());
        Ok(())
    }

    async fn update_content(
        &self,
        document: &Document,
        expected: DocumentStatus,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&document.id)
            .filter(|d| d.owner_id == document.owner_id && d.status == expected)
        else {
            return Ok(false);
        };
        stored.client = document.client.clone();
        stored.currency = document.currency;
        stored.line_items = document.line_items.clone();
        stored.discount = document.discount;
        stored.vat_included = document.vat_included;
        stored.processing_fee_included = document.processing_fee_included;
        stored.processing_fee = document.processing_fee;
        stored.tax_amount = document.tax_amount;
        stored.amount = document.amount;
        stored.due_date = document.due_date;
        stored.updated_at = document.updated_at;
        state.activity.push(entry.clone());
        Ok(true)
    }

    async fn transition(
        &self,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&change.document_id)
            .filter(|d| change.matches(d))
        else {
            return Ok(false);
        };
        change.apply_to(stored);
        state.activity.push(entry.clone());
        Ok(true)
    }

    async fn claim_send(&self, change: &StatusChange) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&change.document_id)
            .filter(|d| change.matches(d))
        else {
            return Ok(false);
        };
        change.apply_to(stored);
        Ok(true)
    }

    async fn release_send(&self, change: &StatusChange) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        Ok(state
            .documents
            .get_mut(&change.document_id)
            .is_some_and(|d| change.revert_send_on(d)))
    }

    async fn accept_offer(
        &self,
        change: &StatusChange,
        invoice: &mut Document,
        entries: &[ActivityEntry],
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(offer) = state
            .documents
            .get_mut(&change.document_id)
            .filter(|d| change.matches(d) && d.invoice_id.is_none())
        else {
            return Ok(false);
        };
        change.apply_to(offer);
        offer.invoice_id = Some(invoice.id);
        let counter = state
            .counters
            .entry((invoice.owner_id, DocumentKind::Invoice))
            .or_insert(0);
        *counter += 1;
        invoice.number = DocumentKind::Invoice.format_number(*counter);
        state.documents.insert(invoice.id, invoice.clone());
        state.activity.extend(entries.iter().cloned());
        Ok(true)
    }

    async fn settle_invoice(
        &self,
        event_id: &str,
        change: &StatusChange,
        entry: &ActivityEntry,
    ) -> Result<SettlementWrite, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        if state.settlement_events.contains(event_id) {
            return Ok(SettlementWrite::Duplicate);
        }
        let Some(stored) = state
            .documents
            .get_mut(&change.document_id)
            .filter(|d| change.matches(d))
        else {
            return Ok(SettlementWrite::Conflict);
        };
        change.apply_to(stored);
        state.settlement_events.insert(event_id.to_string());
        state.activity.push(entry.clone());
        Ok(SettlementWrite::Applied)
    }

    async fn set_recurring(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        recurring: Option<RecurringSchedule>,
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&id)
            .filter(|d| d.owner_id == owner && d.status == expected)
        else {
            return Ok(false);
        };
        stored.recurring = recurring;
        stored.updated_at = entry.occurred_at;
        state.activity.push(entry.clone());
        Ok(true)
    }

    async fn set_reminders(
        &self,
        owner: OwnerId,
        id: DocumentId,
        expected: DocumentStatus,
        auto_enabled: bool,
        offsets: &[ReminderOffset],
        entry: &ActivityEntry,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&id)
            .filter(|d| d.owner_id == owner && d.status == expected)
        else {
            return Ok(false);
        };
        stored.reminders.auto_enabled = auto_enabled;
        stored.reminders.offsets = offsets.to_vec();
        stored.updated_at = entry.occurred_at;
        state.activity.push(entry.clone());
        Ok(true)
    }

    async fn recurring_templates(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .filter(|d| {
                d.is_recurring_template() && d.status.is_outstanding() && d.client.email.is_some()
            })
            .cloned()
            .collect())
    }

    async fn reminder_candidates(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .filter(|d| {
                d.kind() == DocumentKind::Invoice
                    && d.status.is_outstanding()
                    && d.reminders.auto_enabled
                    && d.sent_at.is_some()
                    && d.client.email.is_some()
            })
            .cloned()
            .collect())
    }

    async fn claim_recurrence(
        &self,
        id: DocumentId,
        expected_last: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(schedule) = state
            .documents
            .get_mut(&id)
            .and_then(|d| d.recurring.as_mut())
            .filter(|r| r.last_recurred_at == expected_last)
        else {
            return Ok(false);
        };
        schedule.last_recurred_at = Some(at);
        Ok(true)
    }

    async fn release_recurrence(
        &self,
        id: DocumentId,
        claimed_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(schedule) = state
            .documents
            .get_mut(&id)
            .and_then(|d| d.recurring.as_mut())
            .filter(|r| r.last_recurred_at == Some(claimed_at))
        else {
            return Ok(false);
        };
        schedule.last_recurred_at = previous;
        Ok(true)
    }

    async fn claim_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let Some(stored) = state
            .documents
            .get_mut(&claim.document_id)
            .filter(|d| claim.is_open(d))
        else {
            return Ok(false);
        };
        claim.apply_to(stored);
        Ok(true)
    }

    async fn release_reminder(&self, claim: &ReminderClaim) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        Ok(state
            .documents
            .get_mut(&claim.document_id)
            .is_some_and(|d| claim.revert_on(d)))
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        state.activity.push(entry.clone());
        Ok(())
    }

    async fn recent_activity(
        &self,
        owner: OwnerId,
        page: &PageRequest,
    ) -> Result<(Vec<ActivityEntry>, u64), StoreError> {
        let state = self.lock()?;
        let mut entries: Vec<_> = state
            .activity
            .iter()
            .filter(|e| e.owner_id == owner)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps; reverse for newest first.
        entries.sort_by_key(|e| e.occurred_at);
        entries.reverse();
        let total = entries.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok((entries.into_iter().skip(offset).take(limit).collect(), total))
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn owner_profile(&self, owner: OwnerId) -> Result<Option<OwnerProfile>, StoreError> {
        Ok(self.lock()?.profiles.get(&owner).cloned())
    }

    async fn client(
        &self,
        owner: OwnerId,
        id: ClientId,
    ) -> Result<Option<ClientRecord>, StoreError> {
        Ok(self
            .lock()?
            .clients
            .get(&id)
            .filter(|c| c.owner_id == owner)
            .cloned())
    }
}
