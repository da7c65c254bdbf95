//! Property-based tests for LifecycleService.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::service::LifecycleService;
use crate::lifecycle::types::{DocumentStatus, InvoiceStatus, LifecycleAction, OfferStatus};

/// The documented edges of the status graph.
///
/// - Draft → Sent | Viewed
/// - Sent → Viewed
/// - Viewed → Viewed, only as the late send of a document opened as a draft
/// - Invoice Draft | Sent | Viewed → Paid | Void
/// - Offer Sent | Viewed → Accepted | Declined
fn is_documented(from: DocumentStatus, action: &LifecycleAction) -> bool {
    use DocumentStatus::{Invoice, Offer};
    use InvoiceStatus as I;
    use OfferStatus as O;

    let to = action.new_status();
    if matches!(action, LifecycleAction::Send { .. }) && from == to {
        return matches!(from, Invoice(I::Viewed) | Offer(O::Viewed));
    }
    matches!(
        (from, to),
        (Invoice(I::Draft), Invoice(I::Sent | I::Viewed))
            | (Invoice(I::Sent), Invoice(I::Viewed))
            | (
                Invoice(I::Draft | I::Sent | I::Viewed),
                Invoice(I::Paid | I::Void)
            )
            | (Offer(O::Draft), Offer(O::Sent | O::Viewed))
            | (Offer(O::Sent), Offer(O::Viewed))
            | (Offer(O::Sent | O::Viewed), Offer(O::Accepted | O::Declined))
    )
}

fn arb_status() -> impl Strategy<Value = DocumentStatus> {
    prop_oneof![
        Just(DocumentStatus::Invoice(InvoiceStatus::Draft)),
        Just(DocumentStatus::Invoice(InvoiceStatus::Sent)),
        Just(DocumentStatus::Invoice(InvoiceStatus::Viewed)),
        Just(DocumentStatus::Invoice(InvoiceStatus::Paid)),
        Just(DocumentStatus::Invoice(InvoiceStatus::Void)),
        Just(DocumentStatus::Offer(OfferStatus::Draft)),
        Just(DocumentStatus::Offer(OfferStatus::Sent)),
        Just(DocumentStatus::Offer(OfferStatus::Viewed)),
        Just(DocumentStatus::Offer(OfferStatus::Accepted)),
        Just(DocumentStatus::Offer(OfferStatus::Declined)),
    ]
}

fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn arb_sent_at() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    prop::option::of(arb_time())
}

fn arb_day() -> impl Strategy<Value = NaiveDate> {
    (0u64..3_000).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(days)
    })
}

/// Runs every transition against a status and collects the successful actions.
fn successful_actions(
    status: DocumentStatus,
    sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<LifecycleAction> {
    let results = [
        LifecycleService::send(status, sent_at, now),
        LifecycleService::mark_paid(status, now),
        LifecycleService::void(status, now),
        LifecycleService::accept(status, now),
        LifecycleService::decline(status, None, now),
    ];
    let mut actions: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    actions.extend(LifecycleService::view(status, now));
    actions
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every successful transition is one of the documented edges.
    #[test]
    fn prop_only_documented_transitions_succeed(
        status in arb_status(),
        sent_at in arb_sent_at(),
        now in arb_time(),
    ) {
        for action in successful_actions(status, sent_at, now) {
            prop_assert!(
                is_documented(status, &action),
                "{} -> {} is not documented", status, action.new_status()
            );
        }
    }

    /// Terminal states accept no transition at all.
    #[test]
    fn prop_terminal_states_are_closed(
        status in arb_status(),
        sent_at in arb_sent_at(),
        now in arb_time(),
        today in arb_day(),
    ) {
        prop_assume!(status.is_terminal());
        prop_assert!(successful_actions(status, sent_at, now).is_empty());
        prop_assert!(LifecycleService::ensure_editable(status, None, today).is_err());
    }

    /// Offers past their due date refuse edits; invoices never expire.
    #[test]
    fn prop_only_open_offers_expire(
        status in arb_status(),
        due in arb_day(),
        today in arb_day(),
    ) {
        let result = LifecycleService::ensure_editable(status, Some(due), today);
        let expired = matches!(
            status,
            DocumentStatus::Offer(OfferStatus::Sent | OfferStatus::Viewed)
        ) && today > due;
        prop_assert_eq!(
            matches!(result, Err(LifecycleError::Expired { .. })),
            expired
        );
    }

    /// Transitions never change the document kind.
    #[test]
    fn prop_kind_is_preserved(
        status in arb_status(),
        sent_at in arb_sent_at(),
        now in arb_time(),
    ) {
        for action in successful_actions(status, sent_at, now) {
            prop_assert_eq!(action.new_status().kind(), status.kind());
        }
    }

    /// Applying a view twice records exactly one view.
    #[test]
    fn prop_view_is_idempotent(status in arb_status(), first in arb_time(), second in arb_time()) {
        if let Some(action) = LifecycleService::view(status, first) {
            prop_assert_eq!(action.occurred_at(), first);
            prop_assert!(LifecycleService::view(action.new_status(), second).is_none());
        }
    }

    /// A document that has been sent can never be sent again.
    #[test]
    fn prop_send_happens_once(status in arb_status(), sent in arb_time(), now in arb_time()) {
        prop_assume!(status != DocumentStatus::draft(status.kind()));
        prop_assert!(LifecycleService::send(status, Some(sent), now).is_err());
    }

    /// Failed transitions are reported as a typed error, never a silent no-op.
    #[test]
    fn prop_rejections_are_typed(
        status in arb_status(),
        sent_at in arb_sent_at(),
        now in arb_time(),
    ) {
        let results = [
            LifecycleService::send(status, sent_at, now),
            LifecycleService::mark_paid(status, now),
            LifecycleService::void(status, now),
            LifecycleService::accept(status, now),
            LifecycleService::decline(status, None, now),
        ];
        for result in results {
            match result {
                Ok(action) => prop_assert!(
                    action.new_status() != status || matches!(action, LifecycleAction::Send { .. }),
                    "action kept status {:?}", status
                ),
                Err(LifecycleError::AlreadyInState { status: s }) => prop_assert_eq!(s, status),
                Err(LifecycleError::Incompatible { from, .. }) => prop_assert_eq!(from, status),
                Err(LifecycleError::WrongKind { kind, .. }) => prop_assert_eq!(kind, status.kind()),
                Err(err @ (LifecycleError::NotEditable { .. } | LifecycleError::Expired { .. })) => {
                    prop_assert!(false, "unexpected {:?}", err);
                }
            }
        }
    }
}

#[test]
fn test_documented_edges() {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let send = |to| LifecycleAction::Send { new_status: to, sent_at: at };
    let paid = |to| LifecycleAction::MarkPaid { new_status: to, paid_at: at };
    let inv = DocumentStatus::Invoice;
    let off = DocumentStatus::Offer;

    assert!(is_documented(inv(InvoiceStatus::Draft), &send(inv(InvoiceStatus::Sent))));
    assert!(is_documented(inv(InvoiceStatus::Viewed), &send(inv(InvoiceStatus::Viewed))));
    assert!(is_documented(inv(InvoiceStatus::Draft), &paid(inv(InvoiceStatus::Void))));
    assert!(!is_documented(inv(InvoiceStatus::Viewed), &send(inv(InvoiceStatus::Sent))));
    assert!(!is_documented(inv(InvoiceStatus::Paid), &paid(inv(InvoiceStatus::Void))));
    assert!(!is_documented(off(OfferStatus::Draft), &paid(off(OfferStatus::Accepted))));
    assert!(!is_documented(inv(InvoiceStatus::Sent), &send(off(OfferStatus::Sent))));
}
