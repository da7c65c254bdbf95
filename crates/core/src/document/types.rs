//! Document model shared by invoices and offers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::EmailParams;
use tally_shared::types::{ClientId, Currency, DocumentId, LineItemId, Money, OwnerId};

use crate::lifecycle::{DocumentKind, DocumentStatus};
use crate::pricing::{Discount, LineCharge, PricingInput};

/// Generates an unguessable share-link token (128 random bits, hex).
#[must_use]
pub fn new_public_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Client contact details copied onto the document at creation.
///
/// Later edits to the client record do not reach existing documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    /// Directory record the snapshot was taken from, if any.
    pub client_id: Option<ClientId>,
    /// Client display name.
    pub name: String,
    /// Client email; documents without one are never emailed.
    pub email: Option<String>,
}

/// One line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line identity.
    pub id: LineItemId,
    /// What is being charged for.
    pub description: String,
    /// Pre-discount unit price in minor units.
    pub unit_amount: i64,
    /// Line discount, 0–100.
    pub discount_percent: Decimal,
    /// Sort index within the document.
    pub position: i32,
}

impl LineItem {
    /// The calculator's view of this line.
    #[must_use]
    pub const fn charge(&self) -> LineCharge {
        LineCharge {
            unit_amount: self.unit_amount,
            discount_percent: self.discount_percent,
        }
    }
}

/// Interval unit of a recurring invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    /// Exact wall-clock minutes.
    Minutes,
    /// Calendar days, due at local midnight.
    Days,
}

impl RecurrenceUnit {
    /// Returns the string representation of the unit.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minutes => "minutes",
            Self::Days => "days",
        }
    }

    /// Parses a unit from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minutes" => Some(Self::Minutes),
            "days" => Some(Self::Days),
            _ => None,
        }
    }
}

/// Recurring configuration of an invoice template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    /// Interval unit.
    pub unit: RecurrenceUnit,
    /// Interval length, at least 1.
    pub every: u32,
    /// When the last successor was generated and delivered.
    pub last_recurred_at: Option<DateTime<Utc>>,
}

/// Supported automatic reminder offsets, in days after sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ReminderOffset {
    /// 1 day.
    D1,
    /// 2 days.
    D2,
    /// 3 days.
    D3,
    /// 5 days.
    D5,
    /// 7 days.
    D7,
    /// 10 days.
    D10,
    /// 14 days.
    D14,
}

impl ReminderOffset {
    /// All supported offsets, ascending.
    pub const ALL: [Self; 7] = [
        Self::D1,
        Self::D2,
        Self::D3,
        Self::D5,
        Self::D7,
        Self::D10,
        Self::D14,
    ];

    /// Offset in days.
    #[must_use]
    pub const fn days(&self) -> u32 {
        match self {
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D3 => 3,
            Self::D5 => 5,
            Self::D7 => 7,
            Self::D10 => 10,
            Self::D14 => 14,
        }
    }

    /// Parses an offset from a day count.
    #[must_use]
    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.days() == days)
    }

    /// Offsets 1, 3 and 7 carry their own sent flag. The others are
    /// tracked through `last_reminder_at`.
    #[must_use]
    pub const fn has_durable_flag(&self) -> bool {
        matches!(self, Self::D1 | Self::D3 | Self::D7)
    }
}

impl TryFrom<u32> for ReminderOffset {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::from_days(days).ok_or_else(|| format!("Unsupported reminder offset: {days} days"))
    }
}

impl From<ReminderOffset> for u32 {
    fn from(offset: ReminderOffset) -> Self {
        offset.days()
    }
}

/// Reminder configuration and firing state of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Whether the reminder scheduler looks at this invoice.
    pub auto_enabled: bool,
    /// Configured offsets, ascending and unique.
    pub offsets: Vec<ReminderOffset>,
    /// When the 1-day reminder fired.
    pub day1_sent_at: Option<DateTime<Utc>>,
    /// When the 3-day reminder fired.
    pub day3_sent_at: Option<DateTime<Utc>>,
    /// When the 7-day reminder fired.
    pub day7_sent_at: Option<DateTime<Utc>>,
    /// Last reminder of any kind, manual included.
    pub last_reminder_at: Option<DateTime<Utc>>,
}

impl ReminderSettings {
    /// Sent flag for a durable offset; `None` for the others.
    #[must_use]
    pub const fn durable_flag(&self, offset: ReminderOffset) -> Option<DateTime<Utc>> {
        match offset {
            ReminderOffset::D1 => self.day1_sent_at,
            ReminderOffset::D3 => self.day3_sent_at,
            ReminderOffset::D7 => self.day7_sent_at,
            _ => None,
        }
    }

    /// Whether `offset`, due at `due`, has already fired.
    #[must_use]
    pub fn has_fired(&self, offset: ReminderOffset, due: DateTime<Utc>) -> bool {
        if offset.has_durable_flag() {
            self.durable_flag(offset).is_some()
        } else {
            self.last_reminder_at.is_some_and(|last| last >= due)
        }
    }
}

/// An invoice or offer.
///
/// `amount` is materialized once at creation or edit and never
/// recomputed from the line items on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Identity.
    pub id: DocumentId,
    /// Owning business.
    pub owner_id: OwnerId,
    /// Sequential per owner and kind, e.g. `INV-0007`.
    pub number: String,
    /// Share-link token.
    pub public_id: String,
    /// Stored status.
    pub status: DocumentStatus,
    /// Document currency.
    pub currency: Currency,
    /// Client snapshot.
    pub client: ClientSnapshot,
    /// Ordered line items.
    pub line_items: Vec<LineItem>,
    /// Document-level discount.
    pub discount: Discount,
    /// Whether prices already contain VAT.
    pub vat_included: bool,
    /// Whether the processing fee is passed on.
    pub processing_fee_included: bool,
    /// Materialized processing fee.
    pub processing_fee: Option<i64>,
    /// Materialized VAT amount (added or disclosed).
    pub tax_amount: i64,
    /// Materialized final charge in minor units.
    pub amount: i64,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last content or status change.
    pub updated_at: DateTime<Utc>,
    /// When the document was sent.
    pub sent_at: Option<DateTime<Utc>>,
    /// First client view.
    pub viewed_at: Option<DateTime<Utc>>,
    /// Paid, void, accepted or declined time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Reason given when an offer was declined.
    pub decline_reason: Option<String>,
    /// Invoice derived from this offer.
    pub invoice_id: Option<DocumentId>,
    /// Recurring configuration (invoice templates only).
    pub recurring: Option<RecurringSchedule>,
    /// Template this invoice was generated from.
    pub recurring_parent_id: Option<DocumentId>,
    /// Reminder configuration and state.
    pub reminders: ReminderSettings,
}

impl Document {
    /// Invoice or offer.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.status.kind()
    }

    /// Final charge with its currency.
    #[must_use]
    pub const fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    /// Calculator input rebuilt from the stored content.
    #[must_use]
    pub fn pricing_input(&self) -> PricingInput {
        PricingInput {
            lines: self.line_items.iter().map(LineItem::charge).collect(),
            discount: self.discount,
            vat_included: self.vat_included,
            processing_fee: self.processing_fee_included,
            currency: self.currency,
        }
    }

    /// Whether the recurring scheduler should consider this invoice.
    #[must_use]
    pub fn is_recurring_template(&self) -> bool {
        self.kind() == DocumentKind::Invoice
            && self.recurring.is_some()
            && self.recurring_parent_id.is_none()
    }

    /// Template values for an outgoing email.
    #[must_use]
    pub fn email_params(&self, business_name: &str) -> EmailParams {
        EmailParams {
            business_name: business_name.to_string(),
            client_name: self.client.name.clone(),
            document_number: self.number.clone(),
            amount: self.money(),
            due_date: self.due_date,
            public_id: self.public_id.clone(),
        }
    }
}
