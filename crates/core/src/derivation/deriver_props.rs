//! Property-based tests for OfferDeriver.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::derivation::deriver::OfferDeriver;
use crate::test_fixtures::{line, offer};
use crate::lifecycle::OfferStatus;
use crate::pricing::Discount;

fn arb_lines() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..1_000_000, 0i64..=100), 1..10)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever the offer holds, the invoice holds the same money and lines.
    #[test]
    fn prop_derived_invoice_matches_offer(
        lines in arb_lines(),
        amount in 100i64..10_000_000,
        fee in proptest::option::of(0i64..100_000),
        tax in 0i64..1_000_000,
        fixed in 0i64..100_000,
        vat_included in any::<bool>(),
        viewed in any::<bool>(),
        secs in 0i64..4_000_000_000,
    ) {
        let mut source = offer(if viewed { OfferStatus::Viewed } else { OfferStatus::Sent });
        source.line_items = lines
            .iter()
            .zip(0i32..)
            .map(|((unit, pct), pos)| line("item", *unit, Decimal::from(*pct), pos))
            .collect();
        source.amount = amount;
        source.processing_fee = fee;
        source.processing_fee_included = fee.is_some();
        source.tax_amount = tax;
        source.discount = Discount::Fixed(fixed);
        source.vat_included = vat_included;

        let now = Utc.timestamp_opt(secs, 0).unwrap();
        let invoice = OfferDeriver::derive_invoice(&source, "INV-0001".into(), "p".into(), now).unwrap();

        prop_assert_eq!(invoice.amount, source.amount);
        prop_assert_eq!(invoice.currency, source.currency);
        prop_assert_eq!(invoice.processing_fee, source.processing_fee);
        prop_assert_eq!(invoice.processing_fee_included, source.processing_fee_included);
        prop_assert_eq!(invoice.tax_amount, source.tax_amount);
        prop_assert_eq!(invoice.discount, source.discount);
        prop_assert_eq!(invoice.vat_included, source.vat_included);
        prop_assert_eq!(&invoice.client, &source.client);

        let strip = |items: &[crate::document::LineItem]| {
            items
                .iter()
                .map(|l| (l.description.clone(), l.unit_amount, l.discount_percent, l.position))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(strip(&invoice.line_items), strip(&source.line_items));
    }
}
