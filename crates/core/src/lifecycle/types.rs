//! Lifecycle domain types shared by invoices and offers.
//!
//! Both document kinds have the same shape but a different status
//! vocabulary. Display-only states (overdue, expired) are not stored and
//! live in `document::display`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The two kinds of monetary document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A request for payment.
    Invoice,
    /// A quote the client can accept or decline.
    Offer,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Offer => "offer",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "invoice" => Some(Self::Invoice),
            "offer" => Some(Self::Offer),
            _ => None,
        }
    }

    /// Prefix of the human document number.
    #[must_use]
    pub const fn number_prefix(&self) -> &'static str {
        match self {
            Self::Invoice => "INV",
            Self::Offer => "OFF",
        }
    }

    /// Formats a sequence value as a document number, e.g. `INV-0007`.
    #[must_use]
    pub fn format_number(&self, sequence: i64) -> String {
        format!("{}-{sequence:04}", self.number_prefix())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored invoice status.
///
/// - Draft → Sent → Viewed → Paid
/// - Draft | Sent | Viewed → Void
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Being prepared by the owner.
    Draft,
    /// Delivered to the client.
    Sent,
    /// Opened by the client through the share link.
    Viewed,
    /// Settled (terminal).
    Paid,
    /// Cancelled (terminal).
    Void,
}

/// Stored offer status.
///
/// - Draft → Sent → Viewed → Accepted
/// - Sent | Viewed → Declined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Being prepared by the owner.
    Draft,
    /// Delivered to the client.
    Sent,
    /// Opened by the client through the share link.
    Viewed,
    /// Accepted by the client (terminal).
    Accepted,
    /// Declined by the client (terminal).
    Declined,
}

/// Status of either document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// Status of an invoice.
    Invoice(InvoiceStatus),
    /// Status of an offer.
    Offer(OfferStatus),
}

impl DocumentStatus {
    /// Initial draft status for a kind.
    #[must_use]
    pub const fn draft(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Invoice => Self::Invoice(InvoiceStatus::Draft),
            DocumentKind::Offer => Self::Offer(OfferStatus::Draft),
        }
    }

    /// Sent status for a kind.
    #[must_use]
    pub const fn sent(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Invoice => Self::Invoice(InvoiceStatus::Sent),
            DocumentKind::Offer => Self::Offer(OfferStatus::Sent),
        }
    }

    /// Viewed status for a kind.
    #[must_use]
    pub const fn viewed(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Invoice => Self::Invoice(InvoiceStatus::Viewed),
            DocumentKind::Offer => Self::Offer(OfferStatus::Viewed),
        }
    }

    /// The kind this status belongs to.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        match self {
            Self::Invoice(_) => DocumentKind::Invoice,
            Self::Offer(_) => DocumentKind::Offer,
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice(InvoiceStatus::Draft) | Self::Offer(OfferStatus::Draft) => "draft",
            Self::Invoice(InvoiceStatus::Sent) | Self::Offer(OfferStatus::Sent) => "sent",
            Self::Invoice(InvoiceStatus::Viewed) | Self::Offer(OfferStatus::Viewed) => "viewed",
            Self::Invoice(InvoiceStatus::Paid) => "paid",
            Self::Invoice(InvoiceStatus::Void) => "void",
            Self::Offer(OfferStatus::Accepted) => "accepted",
            Self::Offer(OfferStatus::Declined) => "declined",
        }
    }

    /// Parses a stored status for a kind.
    pub fn parse(kind: DocumentKind, s: &str) -> Option<Self> {
        let status = match (kind, s.to_lowercase().as_str()) {
            (DocumentKind::Invoice, "draft") => Self::Invoice(InvoiceStatus::Draft),
            (DocumentKind::Invoice, "sent") => Self::Invoice(InvoiceStatus::Sent),
            (DocumentKind::Invoice, "viewed") => Self::Invoice(InvoiceStatus::Viewed),
            (DocumentKind::Invoice, "paid") => Self::Invoice(InvoiceStatus::Paid),
            (DocumentKind::Invoice, "void") => Self::Invoice(InvoiceStatus::Void),
            (DocumentKind::Offer, "draft") => Self::Offer(OfferStatus::Draft),
            (DocumentKind::Offer, "sent") => Self::Offer(OfferStatus::Sent),
            (DocumentKind::Offer, "viewed") => Self::Offer(OfferStatus::Viewed),
            (DocumentKind::Offer, "accepted") => Self::Offer(OfferStatus::Accepted),
            (DocumentKind::Offer, "declined") => Self::Offer(OfferStatus::Declined),
            _ => return None,
        };
        Some(status)
    }

    /// Content edits are allowed only while draft, sent or viewed.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !self.is_terminal()
    }

    /// Paid, void, accepted and declined never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Invoice(InvoiceStatus::Paid | InvoiceStatus::Void)
                | Self::Offer(OfferStatus::Accepted | OfferStatus::Declined)
        )
    }

    /// Sent or viewed: delivered and still awaiting the client.
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        matches!(
            self,
            Self::Invoice(InvoiceStatus::Sent | InvoiceStatus::Viewed)
                | Self::Offer(OfferStatus::Sent | OfferStatus::Viewed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which lifecycle timestamp a transition stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// `sent_at`
    Sent,
    /// `viewed_at`
    Viewed,
    /// The terminal timestamp (`closed_at`).
    Closed,
}

/// A validated transition with the data the store must write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Draft → Sent.
    Send {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When the document was sent.
        sent_at: DateTime<Utc>,
    },
    /// First client read of the share link.
    View {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When the document was first viewed.
        viewed_at: DateTime<Utc>,
    },
    /// Invoice settled.
    MarkPaid {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When payment was recorded.
        paid_at: DateTime<Utc>,
    },
    /// Invoice cancelled.
    Void {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When the invoice was voided.
        voided_at: DateTime<Utc>,
    },
    /// Offer accepted by the client.
    Accept {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When the offer was accepted.
        accepted_at: DateTime<Utc>,
    },
    /// Offer declined by the client.
    Decline {
        /// Status after the transition.
        new_status: DocumentStatus,
        /// When the offer was declined.
        declined_at: DateTime<Utc>,
        /// Free-text reason, stored verbatim.
        reason: Option<String>,
    },
}

impl LifecycleAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> DocumentStatus {
        match self {
            Self::Send { new_status, .. }
            | Self::View { new_status, .. }
            | Self::MarkPaid { new_status, .. }
            | Self::Void { new_status, .. }
            | Self::Accept { new_status, .. }
            | Self::Decline { new_status, .. } => *new_status,
        }
    }

    /// Returns when the transition happened.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Send { sent_at: at, .. }
            | Self::View { viewed_at: at, .. }
            | Self::MarkPaid { paid_at: at, .. }
            | Self::Void { voided_at: at, .. }
            | Self::Accept { accepted_at: at, .. }
            | Self::Decline { declined_at: at, .. } => *at,
        }
    }

    /// Returns the timestamp column this transition stamps.
    #[must_use]
    pub const fn milestone(&self) -> Milestone {
        match self {
            Self::Send { .. } => Milestone::Sent,
            Self::View { .. } => Milestone::Viewed,
            Self::MarkPaid { .. }
            | Self::Void { .. }
            | Self::Accept { .. }
            | Self::Decline { .. } => Milestone::Closed,
        }
    }

    /// Decline reason, if this is a decline.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Decline { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}
