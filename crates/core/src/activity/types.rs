//! Audit log entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_shared::types::{ActivityId, DocumentId, OwnerId};

use crate::document::Document;
use crate::lifecycle::{DocumentKind, DocumentStatus};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Document created.
    Created,
    /// Content replaced by the owner.
    Updated,
    /// Draft → sent.
    Sent,
    /// First client view.
    Viewed,
    /// Invoice paid.
    Paid,
    /// Invoice voided.
    Voided,
    /// Offer accepted.
    Accepted,
    /// Offer declined.
    Declined,
    /// Invoice created from an accepted offer.
    DerivedFromOffer,
    /// Invoice generated from a recurring template.
    RecurringGenerated,
    /// Automatic reminder delivered.
    AutoReminderSent,
    /// Manual reminder delivered.
    ManualReminderSent,
    /// Recurring settings changed.
    RecurringConfigured,
    /// Reminder settings changed.
    RemindersConfigured,
}

impl ActivityKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Paid => "paid",
            Self::Voided => "voided",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::DerivedFromOffer => "derived_from_offer",
            Self::RecurringGenerated => "recurring_generated",
            Self::AutoReminderSent => "auto_reminder_sent",
            Self::ManualReminderSent => "manual_reminder_sent",
            Self::RecurringConfigured => "recurring_configured",
            Self::RemindersConfigured => "reminders_configured",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "sent" => Self::Sent,
            "viewed" => Self::Viewed,
            "paid" => Self::Paid,
            "voided" => Self::Voided,
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "derived_from_offer" => Self::DerivedFromOffer,
            "recurring_generated" => Self::RecurringGenerated,
            "auto_reminder_sent" => Self::AutoReminderSent,
            "manual_reminder_sent" => Self::ManualReminderSent,
            "recurring_configured" => Self::RecurringConfigured,
            "reminders_configured" => Self::RemindersConfigured,
            _ => return None,
        };
        Some(kind)
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// Entry identity.
    pub id: ActivityId,
    /// Owning business.
    pub owner_id: OwnerId,
    /// Kind of the subject document.
    pub document_kind: DocumentKind,
    /// Subject document.
    pub document_id: DocumentId,
    /// What happened.
    pub kind: ActivityKind,
    /// Other document involved (offer ↔ invoice, template ↔ successor).
    pub related_document_id: Option<DocumentId>,
    /// Status before the change.
    pub prior_status: Option<DocumentStatus>,
    /// Amount after the change, in minor units.
    pub amount: Option<i64>,
    /// Free-text detail (decline reason, reminder offset, settlement id).
    pub detail: Option<String>,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEntry {
    /// Starts an entry about `document`.
    #[must_use]
    pub fn for_document(document: &Document, kind: ActivityKind, at: DateTime<Utc>) -> Self {
        Self {
            id: ActivityId::new(),
            owner_id: document.owner_id,
            document_kind: document.kind(),
            document_id: document.id,
            kind,
            related_document_id: None,
            prior_status: None,
            amount: Some(document.amount),
            detail: None,
            occurred_at: at,
        }
    }

    /// Records the status the document had before the change.
    #[must_use]
    pub fn with_prior(mut self, status: DocumentStatus) -> Self {
        self.prior_status = Some(status);
        self
    }

    /// Links a second document.
    #[must_use]
    pub fn with_related(mut self, id: DocumentId) -> Self {
        self.related_document_id = Some(id);
        self
    }

    /// Attaches free-text detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
