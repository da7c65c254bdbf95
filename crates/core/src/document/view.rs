//! Read projections of a document.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::Currency;

use crate::document::display::{DisplayStatus, display_status};
use crate::document::types::Document;
use crate::lifecycle::DocumentKind;
use crate::pricing::{Discount, MoneyCalculator};

/// A line as shown on the share page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicLineItem {
    /// Description.
    pub description: String,
    /// Unit price in minor units.
    pub unit_amount: i64,
    /// Line discount.
    pub discount_percent: Decimal,
    /// Line total after its discount.
    pub total: i64,
}

/// What an unauthenticated client sees through the share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicDocumentView {
    /// Invoice or offer.
    pub kind: DocumentKind,
    /// Document number.
    pub number: String,
    /// Display status.
    pub status: DisplayStatus,
    /// Owner's business name.
    pub business_name: String,
    /// Addressee.
    pub client_name: String,
    /// Currency.
    pub currency: Currency,
    /// Lines in order.
    pub line_items: Vec<PublicLineItem>,
    /// Document discount.
    pub discount: Discount,
    /// Whether `tax_amount` is contained in the amount.
    pub vat_included: bool,
    /// VAT amount (added or disclosed).
    pub tax_amount: i64,
    /// Processing fee, when passed on.
    pub processing_fee: Option<i64>,
    /// Final charge.
    pub amount: i64,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// When the document was sent.
    pub sent_at: Option<DateTime<Utc>>,
}

impl PublicDocumentView {
    /// Builds the projection. Amounts come from the stored document;
    /// only per-line totals are derived for display.
    #[must_use]
    pub fn build(document: &Document, business_name: &str, today: NaiveDate) -> Self {
        let line_items = document
            .line_items
            .iter()
            .map(|line| PublicLineItem {
                description: line.description.clone(),
                unit_amount: line.unit_amount,
                discount_percent: line.discount_percent,
                total: MoneyCalculator::line_total(line.unit_amount, line.discount_percent)
                    .unwrap_or(line.unit_amount),
            })
            .collect();

        Self {
            kind: document.kind(),
            number: document.number.clone(),
            status: display_status(document.status, document.due_date, today),
            business_name: business_name.to_string(),
            client_name: document.client.name.clone(),
            currency: document.currency,
            line_items,
            discount: document.discount,
            vat_included: document.vat_included,
            tax_amount: document.tax_amount,
            processing_fee: document.processing_fee,
            amount: document.amount,
            due_date: document.due_date,
            sent_at: document.sent_at,
        }
    }
}
