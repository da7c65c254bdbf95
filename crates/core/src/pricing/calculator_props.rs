//! Property-based tests for the Money Calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::Currency;

use crate::pricing::calculator::MoneyCalculator;
use crate::pricing::error::PricingError;
use crate::pricing::types::{Discount, LineCharge, PricingConfig, PricingInput};

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Gbp),
        Just(Currency::Usd),
        Just(Currency::Eur),
        Just(Currency::Cad),
        Just(Currency::Aud),
    ]
}

/// Percentages with up to two decimal places, including out-of-range values.
fn arb_percent() -> impl Strategy<Value = Decimal> {
    (-2_000i64..12_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

fn arb_line() -> impl Strategy<Value = LineCharge> {
    (0i64..5_000_000, arb_percent()).prop_map(|(unit_amount, discount_percent)| LineCharge {
        unit_amount,
        discount_percent,
    })
}

fn arb_discount() -> impl Strategy<Value = Discount> {
    prop_oneof![
        Just(Discount::None),
        arb_percent().prop_map(Discount::Percent),
        (0i64..1_000_000).prop_map(Discount::Fixed),
    ]
}

prop_compose! {
    fn arb_input()(
        lines in prop::collection::vec(arb_line(), 1..8),
        discount in arb_discount(),
        vat_included in any::<bool>(),
        processing_fee in any::<bool>(),
        currency in arb_currency(),
    ) -> PricingInput {
        PricingInput { lines, discount, vat_included, processing_fee, currency }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Same input, same output.
    #[test]
    fn prop_calculation_is_deterministic(input in arb_input()) {
        let config = PricingConfig::default();
        let first = MoneyCalculator::calculate(&input, &config);
        let second = MoneyCalculator::calculate(&input, &config);
        prop_assert_eq!(first, second);
    }

    /// Any accepted result respects the minimum charge; anything under it is rejected.
    #[test]
    fn prop_minimum_charge_enforced(input in arb_input()) {
        let config = PricingConfig::default();
        match MoneyCalculator::calculate(&input, &config) {
            Ok(breakdown) => prop_assert!(breakdown.total >= config.minimum_charge),
            Err(PricingError::BelowMinimum { amount, minimum }) => {
                prop_assert!(amount < minimum);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// The breakdown adds up: lines → subtotal → before fee → total.
    #[test]
    fn prop_breakdown_is_consistent(input in arb_input()) {
        let config = PricingConfig::default();
        if let Ok(b) = MoneyCalculator::calculate(&input, &config) {
            prop_assert_eq!(b.line_totals.iter().sum::<i64>(), b.line_subtotal);
            prop_assert_eq!(b.line_subtotal - b.discount_amount, b.subtotal);
            prop_assert!(b.discount_amount >= 0);
            if b.vat_included {
                prop_assert_eq!(b.amount_before_fee, b.subtotal);
            } else {
                prop_assert_eq!(b.amount_before_fee, b.subtotal + b.tax_amount);
            }
            prop_assert_eq!(b.total, b.amount_before_fee + b.processing_fee.unwrap_or(0));
        }
    }

    /// A line total never exceeds its unit price and is never negative.
    #[test]
    fn prop_line_totals_bounded(input in arb_input()) {
        let config = PricingConfig::default();
        if let Ok(b) = MoneyCalculator::calculate(&input, &config) {
            for (total, line) in b.line_totals.iter().zip(&input.lines) {
                prop_assert!(*total >= 0);
                prop_assert!(*total <= line.unit_amount);
            }
        }
    }

    /// After the fee is taken back out, the owner keeps at least the pre-fee amount.
    #[test]
    fn prop_fee_covers_processor_deduction(amount in 0i64..10_000_000, currency in arb_currency()) {
        let config = PricingConfig::default();
        let fixed = config.fixed_fee_for(currency);
        let fee = MoneyCalculator::processing_fee(amount, config.fee_percent, fixed).unwrap();
        let gross = Decimal::from(amount + fee);
        let deducted = gross * config.fee_percent + Decimal::from(fixed);
        prop_assert!(gross - deducted >= Decimal::from(amount));
    }
}
