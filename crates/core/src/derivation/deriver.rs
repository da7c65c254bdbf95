//! Offer → Invoice deriver.
//!
//! The accepted price is frozen: amounts, fee, discount and line items are
//! copied as stored, never recomputed.

use chrono::{DateTime, Utc};
use tally_shared::types::{DocumentId, LineItemId};

use crate::derivation::error::DerivationError;
use crate::document::{Document, LineItem, ReminderSettings};
use crate::lifecycle::{DocumentKind, DocumentStatus};

/// Stateless builder of invoices from accepted offers.
pub struct OfferDeriver;

impl OfferDeriver {
    /// Builds the invoice for `offer`.
    ///
    /// The invoice is created directly in `sent` with `sent_at = now`. It
    /// carries no due date, reminders or recurring settings; the owner sets
    /// those afterwards if wanted.
    pub fn derive_invoice(
        offer: &Document,
        number: String,
        public_id: String,
        now: DateTime<Utc>,
    ) -> Result<Document, DerivationError> {
        if offer.kind() != DocumentKind::Offer {
            return Err(DerivationError::NotAnOffer);
        }
        if offer.invoice_id.is_some() {
            return Err(DerivationError::AlreadyDerived);
        }
        if !offer.status.is_outstanding() {
            return Err(DerivationError::OfferNotAcceptable {
                status: offer.status,
            });
        }

        let line_items = offer
            .line_items
            .iter()
            .map(|line| LineItem {
                id: LineItemId::new(),
                ..line.clone()
            })
            .collect();

        Ok(Document {
            id: DocumentId::new(),
            owner_id: offer.owner_id,
            number,
            public_id,
            status: DocumentStatus::sent(DocumentKind::Invoice),
            currency: offer.currency,
            client: offer.client.clone(),
            line_items,
            discount: offer.discount,
            vat_included: offer.vat_included,
            processing_fee_included: offer.processing_fee_included,
            processing_fee: offer.processing_fee,
            tax_amount: offer.tax_amount,
            amount: offer.amount,
            due_date: None,
            created_at: now,
            updated_at: now,
            sent_at: Some(now),
            viewed_at: None,
            closed_at: None,
            decline_reason: None,
            invoice_id: None,
            recurring: None,
            recurring_parent_id: None,
            reminders: ReminderSettings::default(),
        })
    }
}
