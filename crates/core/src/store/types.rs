//! Write descriptions handed to a store.
//!
//! Every mutation is conditional: it names the state it expects to find
//! and reports whether it won. A lost race is `false`, never an error.

use chrono::{DateTime, Utc};
use tally_shared::types::{DocumentId, OwnerId};

use crate::document::{Document, ReminderOffset};
use crate::lifecycle::{DocumentStatus, LifecycleAction, Milestone};

/// A status transition guarded by the expected current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Owner the document must belong to.
    pub owner_id: OwnerId,
    /// Target document.
    pub document_id: DocumentId,
    /// Status the document must still have.
    pub expected: DocumentStatus,
    /// Validated transition.
    pub action: LifecycleAction,
}

impl StatusChange {
    /// Describes applying `action` to `document` as last read.
    #[must_use]
    pub fn for_document(document: &Document, action: LifecycleAction) -> Self {
        Self {
            owner_id: document.owner_id,
            document_id: document.id,
            expected: document.status,
            action,
        }
    }

    /// Whether `document` still satisfies the write condition.
    ///
    /// A send also requires `sent_at` to be unset.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        document.id == self.document_id
            && document.owner_id == self.owner_id
            && document.status == self.expected
            && (self.action.milestone() != Milestone::Sent || document.sent_at.is_none())
    }

    /// Applies the transition to an in-memory copy.
    pub fn apply_to(&self, document: &mut Document) {
        let at = self.action.occurred_at();
        document.status = self.action.new_status();
        document.updated_at = at;
        match self.action.milestone() {
            Milestone::Sent => document.sent_at = Some(at),
            Milestone::Viewed => document.viewed_at = Some(at),
            Milestone::Closed => document.closed_at = Some(at),
        }
        if let Some(reason) = self.action.reason() {
            document.decline_reason = Some(reason.to_string());
        }
    }

    /// Undoes a send on an in-memory copy, if nothing has moved the
    /// document on since.
    pub fn revert_send_on(&self, document: &mut Document) -> bool {
        let at = self.action.occurred_at();
        if self.action.milestone() != Milestone::Sent
            || document.id != self.document_id
            || document.status != self.action.new_status()
            || document.sent_at != Some(at)
        {
            return false;
        }
        document.status = self.expected;
        document.sent_at = None;
        true
    }
}

/// What a reminder claim is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSlot {
    /// A scheduled offset.
    Auto(ReminderOffset),
    /// An owner-triggered reminder.
    Manual,
}

/// A conditional reservation of a reminder send.
///
/// Claimed before the email goes out so two overlapping runs cannot both
/// send; released again if delivery fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderClaim {
    /// Owner the invoice must belong to.
    pub owner_id: OwnerId,
    /// Target invoice.
    pub document_id: DocumentId,
    /// Which reminder.
    pub slot: ReminderSlot,
    /// For slots without a durable flag, `last_reminder_at` must be null or
    /// earlier than this.
    pub threshold: DateTime<Utc>,
    /// `last_reminder_at` as read, restored on release.
    pub previous_last: Option<DateTime<Utc>>,
    /// Claim timestamp; becomes the sent time.
    pub claimed_at: DateTime<Utc>,
}

impl ReminderClaim {
    /// Whether `document` still allows this claim.
    #[must_use]
    pub fn is_open(&self, document: &Document) -> bool {
        if document.id != self.document_id
            || document.owner_id != self.owner_id
            || !document.status.is_outstanding()
        {
            return false;
        }
        let settings = &document.reminders;
        let before_threshold = settings
            .last_reminder_at
            .is_none_or(|last| last < self.threshold);
        match self.slot {
            ReminderSlot::Auto(offset) if offset.has_durable_flag() => {
                settings.auto_enabled && settings.durable_flag(offset).is_none()
            }
            ReminderSlot::Auto(_) => settings.auto_enabled && before_threshold,
            ReminderSlot::Manual => before_threshold,
        }
    }

    /// Marks the claim on an in-memory copy.
    pub fn apply_to(&self, document: &mut Document) {
        let at = Some(self.claimed_at);
        if let ReminderSlot::Auto(offset) = self.slot {
            set_durable_flag(document, offset, at);
        }
        document.reminders.last_reminder_at = at;
    }

    /// Undoes the claim on an in-memory copy, if it is still the latest write.
    pub fn revert_on(&self, document: &mut Document) -> bool {
        let mut reverted = false;
        if let ReminderSlot::Auto(offset) = self.slot
            && document.reminders.durable_flag(offset) == Some(self.claimed_at)
        {
            set_durable_flag(document, offset, None);
            reverted = true;
        }
        if document.reminders.last_reminder_at == Some(self.claimed_at) {
            document.reminders.last_reminder_at = self.previous_last;
            reverted = true;
        }
        reverted
    }
}

fn set_durable_flag(document: &mut Document, offset: ReminderOffset, at: Option<DateTime<Utc>>) {
    match offset {
        ReminderOffset::D1 => document.reminders.day1_sent_at = at,
        ReminderOffset::D3 => document.reminders.day3_sent_at = at,
        ReminderOffset::D7 => document.reminders.day7_sent_at = at,
        _ => {}
    }
}

/// Result of a settlement write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementWrite {
    /// Invoice marked paid and event recorded.
    Applied,
    /// Event id already recorded; nothing written.
    Duplicate,
    /// Invoice status changed since it was read; nothing written.
    Conflict,
}
