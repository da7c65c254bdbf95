//! Typed creation and edit input.
//!
//! Request payloads are parsed into `DocumentDraft` at the boundary and
//! validated here before anything is priced or written.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_shared::types::{ClientId, Currency, LineItemId};
use thiserror::Error;

use crate::document::types::LineItem;
use crate::pricing::Discount;

/// Who the document is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRef {
    /// A client from the owner's directory; snapshotted at creation.
    Existing(ClientId),
    /// Contact details typed directly onto the document.
    Inline {
        /// Client display name.
        name: String,
        /// Optional client email.
        #[serde(default)]
        email: Option<String>,
    },
}

/// One line as submitted by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItemDraft {
    /// What is being charged for.
    pub description: String,
    /// Unit price in minor units.
    pub unit_amount: i64,
    /// Line discount; clamped to 0–100.
    #[serde(default)]
    pub discount_percent: Decimal,
}

/// Full document content for create and edit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentDraft {
    /// Addressee.
    pub client: ClientRef,
    /// Currency; defaults to the owner's profile currency.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// At least one line.
    pub line_items: Vec<LineItemDraft>,
    /// Document-level discount.
    #[serde(default)]
    pub discount: Discount,
    /// VAT already included; defaults to the owner's preference.
    #[serde(default)]
    pub vat_included: Option<bool>,
    /// Pass the processing fee on to the client.
    #[serde(default)]
    pub processing_fee: bool,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Create directly in `sent` instead of `draft` (creation only).
    #[serde(default)]
    pub send_now: bool,
}

/// Validation failures on a draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Client name is blank.
    #[error("Client name is required")]
    MissingClientName,
    /// No line items.
    #[error("At least one line item is required")]
    NoLineItems,
    /// A line has a blank description.
    #[error("Line item {index} needs a description")]
    EmptyDescription {
        /// Zero-based line position.
        index: usize,
    },
    /// A line has a negative price.
    #[error("Line item {index} has a negative amount")]
    NegativeAmount {
        /// Zero-based line position.
        index: usize,
    },
    /// Fixed discount below zero.
    #[error("Fixed discount must not be negative")]
    NegativeDiscount,
    /// Malformed client email.
    #[error("Invalid client email: {0}")]
    InvalidEmail(String),
}

impl DraftError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingClientName => "MISSING_CLIENT_NAME",
            Self::NoLineItems => "NO_LINE_ITEMS",
            Self::EmptyDescription { .. } => "EMPTY_DESCRIPTION",
            Self::NegativeAmount { .. } => "NEGATIVE_LINE_AMOUNT",
            Self::NegativeDiscount => "NEGATIVE_DISCOUNT",
            Self::InvalidEmail(_) => "INVALID_EMAIL",
        }
    }
}

impl DocumentDraft {
    /// Checks everything that can be checked without a profile lookup.
    pub fn validate(&self) -> Result<(), DraftError> {
        if let ClientRef::Inline { name, email } = &self.client {
            validate_contact(name, email.as_deref())?;
        }
        if self.line_items.is_empty() {
            return Err(DraftError::NoLineItems);
        }
        for (index, line) in self.line_items.iter().enumerate() {
            if line.description.trim().is_empty() {
                return Err(DraftError::EmptyDescription { index });
            }
            if line.unit_amount < 0 {
                return Err(DraftError::NegativeAmount { index });
            }
        }
        if matches!(self.discount, Discount::Fixed(amount) if amount < 0) {
            return Err(DraftError::NegativeDiscount);
        }
        Ok(())
    }

    /// Builds stored line items, clamping discounts and assigning positions.
    #[must_use]
    pub fn to_line_items(&self) -> Vec<LineItem> {
        self.line_items
            .iter()
            .zip(0i32..)
            .map(|(line, position)| LineItem {
                id: LineItemId::new(),
                description: line.description.trim().to_string(),
                unit_amount: line.unit_amount,
                discount_percent: line
                    .discount_percent
                    .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
                position,
            })
            .collect()
    }

    /// Document discount with percent values clamped to 0–100.
    #[must_use]
    pub fn normalized_discount(&self) -> Discount {
        match self.discount {
            Discount::Percent(pct) => {
                Discount::Percent(pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
            }
            other => other,
        }
    }
}

/// Validates a client name and optional email.
pub fn validate_contact(name: &str, email: Option<&str>) -> Result<(), DraftError> {
    if name.trim().is_empty() {
        return Err(DraftError::MissingClientName);
    }
    if let Some(email) = email
        && !is_plausible_email(email)
    {
        return Err(DraftError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
