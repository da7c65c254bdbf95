//! Document fixtures shared by unit tests.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{Currency, DocumentId, LineItemId, OwnerId};

use crate::document::{ClientSnapshot, Document, LineItem, ReminderSettings};
use crate::lifecycle::{DocumentStatus, InvoiceStatus, OfferStatus};
use crate::pricing::Discount;

pub fn line(description: &str, unit_amount: i64, discount_percent: Decimal, position: i32) -> LineItem {
    LineItem {
        id: LineItemId::new(),
        description: description.to_string(),
        unit_amount,
        discount_percent,
        position,
    }
}

pub fn offer(status: OfferStatus) -> Document {
    let created = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
    Document {
        id: DocumentId::new(),
        owner_id: OwnerId::new(),
        number: "OFF-0001".to_string(),
        public_id: "offer-public".to_string(),
        status: DocumentStatus::Offer(status),
        currency: Currency::Eur,
        client: ClientSnapshot {
            client_id: None,
            name: "Jo Client".to_string(),
            email: Some("jo@example.com".to_string()),
        },
        line_items: vec![
            line("A", 10_000, Decimal::ZERO, 0),
            line("B", 5_000, Decimal::TEN, 1),
        ],
        discount: Discount::Percent(Decimal::new(5, 0)),
        vat_included: false,
        processing_fee_included: true,
        processing_fee: Some(297),
        tax_amount: 2_755,
        amount: 16_827,
        due_date: None,
        created_at: created,
        updated_at: created,
        sent_at: Some(created),
        viewed_at: None,
        closed_at: None,
        decline_reason: None,
        invoice_id: None,
        recurring: None,
        recurring_parent_id: None,
        reminders: ReminderSettings::default(),
    }
}

pub fn invoice(status: InvoiceStatus) -> Document {
    let created = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
    Document {
        id: DocumentId::new(),
        owner_id: OwnerId::new(),
        number: "INV-0001".to_string(),
        public_id: "invoice-public".to_string(),
        status: DocumentStatus::Invoice(status),
        currency: Currency::Gbp,
        client: ClientSnapshot {
            client_id: None,
            name: "Jo Client".to_string(),
            email: Some("jo@example.com".to_string()),
        },
        line_items: vec![line("Retainer", 10_000, Decimal::ZERO, 0)],
        discount: Discount::None,
        vat_included: false,
        processing_fee_included: false,
        processing_fee: None,
        tax_amount: 2_000,
        amount: 12_000,
        due_date: None,
        created_at: created,
        updated_at: created,
        sent_at: Some(created),
        viewed_at: None,
        closed_at: None,
        decline_reason: None,
        invoice_id: None,
        recurring: None,
        recurring_parent_id: None,
        reminders: ReminderSettings::default(),
    }
}
