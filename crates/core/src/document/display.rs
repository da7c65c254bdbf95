//! Display status projection.
//!
//! Overdue and expired are computed from the due date on every read and
//! never stored, so no background job is needed to flip them.

use chrono::NaiveDate;
use serde::Serialize;

use crate::lifecycle::{DocumentStatus, InvoiceStatus, OfferStatus};

/// Status as shown to owners and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// Not sent yet.
    Draft,
    /// Sent, not opened.
    Sent,
    /// Opened by the client.
    Viewed,
    /// Unpaid invoice past its due date.
    Overdue,
    /// Settled invoice.
    Paid,
    /// Cancelled invoice.
    Void,
    /// Accepted offer.
    Accepted,
    /// Declined offer.
    Declined,
    /// Open offer past its due date.
    Expired,
}

/// Projects the display status for `today` in the billing time zone.
///
/// A document is past due from the day after its due date. Drafts are
/// never overdue.
#[must_use]
pub fn display_status(
    status: DocumentStatus,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> DisplayStatus {
    let past_due = due_date.is_some_and(|due| today > due);
    match status {
        DocumentStatus::Invoice(InvoiceStatus::Draft) | DocumentStatus::Offer(OfferStatus::Draft) => {
            DisplayStatus::Draft
        }
        DocumentStatus::Invoice(InvoiceStatus::Sent | InvoiceStatus::Viewed) if past_due => {
            DisplayStatus::Overdue
        }
        DocumentStatus::Offer(OfferStatus::Sent | OfferStatus::Viewed) if past_due => {
            DisplayStatus::Expired
        }
        DocumentStatus::Invoice(InvoiceStatus::Sent) | DocumentStatus::Offer(OfferStatus::Sent) => {
            DisplayStatus::Sent
        }
        DocumentStatus::Invoice(InvoiceStatus::Viewed)
        | DocumentStatus::Offer(OfferStatus::Viewed) => DisplayStatus::Viewed,
        DocumentStatus::Invoice(InvoiceStatus::Paid) => DisplayStatus::Paid,
        DocumentStatus::Invoice(InvoiceStatus::Void) => DisplayStatus::Void,
        DocumentStatus::Offer(OfferStatus::Accepted) => DisplayStatus::Accepted,
        DocumentStatus::Offer(OfferStatus::Declined) => DisplayStatus::Declined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[rstest]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Sent), Some(day(10)), day(10), DisplayStatus::Sent)]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Sent), Some(day(10)), day(11), DisplayStatus::Overdue)]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Viewed), Some(day(1)), day(20), DisplayStatus::Overdue)]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Paid), Some(day(1)), day(20), DisplayStatus::Paid)]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Draft), Some(day(1)), day(20), DisplayStatus::Draft)]
    #[case(DocumentStatus::Invoice(InvoiceStatus::Viewed), None, day(20), DisplayStatus::Viewed)]
    #[case(DocumentStatus::Offer(OfferStatus::Sent), Some(day(1)), day(2), DisplayStatus::Expired)]
    #[case(DocumentStatus::Offer(OfferStatus::Accepted), Some(day(1)), day(2), DisplayStatus::Accepted)]
    fn test_display_status(
        #[case] status: DocumentStatus,
        #[case] due: Option<NaiveDate>,
        #[case] today: NaiveDate,
        #[case] expected: DisplayStatus,
    ) {
        assert_eq!(display_status(status, due, today), expected);
    }
}
