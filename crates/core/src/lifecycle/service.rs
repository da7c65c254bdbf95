//! Lifecycle service for document state transitions.
//!
//! Validates a requested transition against the current stored status
//! and returns the `LifecycleAction` the store must apply. Nothing here
//! touches storage; callers apply the action with a conditional write on
//! the status they read.

use chrono::{DateTime, NaiveDate, Utc};

use crate::document::{DisplayStatus, display_status};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::types::{
    DocumentKind, DocumentStatus, InvoiceStatus, LifecycleAction, OfferStatus,
};

/// Stateless service for document lifecycle transitions.
pub struct LifecycleService;

impl LifecycleService {
    /// Draft → Sent, or stamps `sent_at` on a document the client opened
    /// before it was ever sent.
    ///
    /// # Returns
    /// * `Err(AlreadyInState)` if already sent
    /// * `Err(Incompatible)` if terminal
    pub fn send(
        current: DocumentStatus,
        sent_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, LifecycleError> {
        match current {
            DocumentStatus::Invoice(InvoiceStatus::Draft)
            | DocumentStatus::Offer(OfferStatus::Draft) => Ok(LifecycleAction::Send {
                new_status: DocumentStatus::sent(current.kind()),
                sent_at: now,
            }),
            DocumentStatus::Invoice(InvoiceStatus::Viewed)
            | DocumentStatus::Offer(OfferStatus::Viewed)
                if sent_at.is_none() =>
            {
                Ok(LifecycleAction::Send {
                    new_status: current,
                    sent_at: now,
                })
            }
            s if s.is_outstanding() => Err(LifecycleError::AlreadyInState { status: s }),
            s => Err(LifecycleError::Incompatible {
                from: s,
                action: "send",
            }),
        }
    }

    /// Draft | Sent → Viewed on a client read.
    ///
    /// Returns `None` when there is nothing to record: the document was
    /// already viewed, or it has reached a terminal state. Repeat reads
    /// never move `viewed_at` and never regress the status.
    #[must_use]
    pub fn view(current: DocumentStatus, now: DateTime<Utc>) -> Option<LifecycleAction> {
        match current {
            DocumentStatus::Invoice(InvoiceStatus::Draft | InvoiceStatus::Sent)
            | DocumentStatus::Offer(OfferStatus::Draft | OfferStatus::Sent) => {
                Some(LifecycleAction::View {
                    new_status: DocumentStatus::viewed(current.kind()),
                    viewed_at: now,
                })
            }
            _ => None,
        }
    }

    /// Invoice → Paid, manually or from a settlement event.
    pub fn mark_paid(
        current: DocumentStatus,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, LifecycleError> {
        match current {
            DocumentStatus::Invoice(
                InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Viewed,
            ) => Ok(LifecycleAction::MarkPaid {
                new_status: DocumentStatus::Invoice(InvoiceStatus::Paid),
                paid_at: now,
            }),
            DocumentStatus::Invoice(InvoiceStatus::Paid) => {
                Err(LifecycleError::AlreadyInState { status: current })
            }
            DocumentStatus::Invoice(InvoiceStatus::Void) => Err(LifecycleError::Incompatible {
                from: current,
                action: "mark paid",
            }),
            DocumentStatus::Offer(_) => Err(LifecycleError::WrongKind {
                kind: DocumentKind::Offer,
                action: "mark paid",
            }),
        }
    }

    /// Invoice → Void. Voiding twice is an error, not a no-op.
    pub fn void(
        current: DocumentStatus,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, LifecycleError> {
        match current {
            DocumentStatus::Invoice(
                InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Viewed,
            ) => Ok(LifecycleAction::Void {
                new_status: DocumentStatus::Invoice(InvoiceStatus::Void),
                voided_at: now,
            }),
            DocumentStatus::Invoice(InvoiceStatus::Void) => {
                Err(LifecycleError::AlreadyInState { status: current })
            }
            DocumentStatus::Invoice(InvoiceStatus::Paid) => Err(LifecycleError::Incompatible {
                from: current,
                action: "void",
            }),
            DocumentStatus::Offer(_) => Err(LifecycleError::WrongKind {
                kind: DocumentKind::Offer,
                action: "void",
            }),
        }
    }

    /// Offer Sent | Viewed → Accepted.
    pub fn accept(
        current: DocumentStatus,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, LifecycleError> {
        match current {
            DocumentStatus::Offer(OfferStatus::Sent | OfferStatus::Viewed) => {
                Ok(LifecycleAction::Accept {
                    new_status: DocumentStatus::Offer(OfferStatus::Accepted),
                    accepted_at: now,
                })
            }
            DocumentStatus::Offer(OfferStatus::Accepted) => {
                Err(LifecycleError::AlreadyInState { status: current })
            }
            DocumentStatus::Offer(_) => Err(LifecycleError::Incompatible {
                from: current,
                action: "accept",
            }),
            DocumentStatus::Invoice(_) => Err(LifecycleError::WrongKind {
                kind: DocumentKind::Invoice,
                action: "accept",
            }),
        }
    }

    /// Offer Sent | Viewed → Declined, with an optional reason kept verbatim.
    pub fn decline(
        current: DocumentStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LifecycleAction, LifecycleError> {
        match current {
            DocumentStatus::Offer(OfferStatus::Sent | OfferStatus::Viewed) => {
                Ok(LifecycleAction::Decline {
                    new_status: DocumentStatus::Offer(OfferStatus::Declined),
                    declined_at: now,
                    reason,
                })
            }
            DocumentStatus::Offer(OfferStatus::Declined) => {
                Err(LifecycleError::AlreadyInState { status: current })
            }
            DocumentStatus::Offer(_) => Err(LifecycleError::Incompatible {
                from: current,
                action: "decline",
            }),
            DocumentStatus::Invoice(_) => Err(LifecycleError::WrongKind {
                kind: DocumentKind::Invoice,
                action: "decline",
            }),
        }
    }

    /// Content edits are allowed until the document reaches a terminal
    /// state or, for offers, passes its due date.
    pub fn ensure_editable(
        current: DocumentStatus,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), LifecycleError> {
        if !current.is_editable() {
            return Err(LifecycleError::NotEditable { status: current });
        }
        Self::ensure_not_expired(current, due_date, today, "edit")
    }

    /// Rejects `action` on an offer whose display status is expired.
    pub fn ensure_not_expired(
        current: DocumentStatus,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
        action: &'static str,
    ) -> Result<(), LifecycleError> {
        if display_status(current, due_date, today) == DisplayStatus::Expired {
            return Err(LifecycleError::Expired {
                status: current,
                action,
            });
        }
        Ok(())
    }
}
