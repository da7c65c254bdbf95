//! Money Calculator.
//!
//! Turns line items, a document discount, VAT and processing-fee options
//! into a final charge in minor units. Every step rounds to a whole minor
//! unit and feeds the rounded value into the next step, so the result is
//! reproducible from the stored inputs.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::pricing::error::PricingError;
use crate::pricing::types::{Discount, PriceBreakdown, PricingConfig, PricingInput};

/// Stateless calculator. All state comes in through the arguments.
pub struct MoneyCalculator;

impl MoneyCalculator {
    /// Computes the full breakdown for a document.
    ///
    /// Steps, in order:
    /// 1. line total = round(unit × (1 − line%/100))
    /// 2. subtotal = Σ line totals
    /// 3. document discount: percent → round(subtotal × (1 − %/100)),
    ///    fixed → max(0, subtotal − fixed)
    /// 4. VAT: added as round(subtotal × rate) unless already included
    /// 5. fee: ceil((amount × fee% + fixed fee) / (1 − fee%))
    /// 6. reject when the final amount is under the minimum charge
    pub fn calculate(
        input: &PricingInput,
        config: &PricingConfig,
    ) -> Result<PriceBreakdown, PricingError> {
        if input.lines.is_empty() {
            return Err(PricingError::NoLineItems);
        }

        let mut line_totals = Vec::with_capacity(input.lines.len());
        let mut line_subtotal: i64 = 0;
        for (index, line) in input.lines.iter().enumerate() {
            if line.unit_amount < 0 {
                return Err(PricingError::NegativeLineAmount { index });
            }
            let total = Self::apply_percent_off(line.unit_amount, line.discount_percent)?;
            line_subtotal = line_subtotal
                .checked_add(total)
                .ok_or(PricingError::Overflow)?;
            line_totals.push(total);
        }

        let subtotal = match input.discount {
            Discount::None => line_subtotal,
            Discount::Percent(pct) => Self::apply_percent_off(line_subtotal, pct)?,
            Discount::Fixed(amount) if amount < 0 => return Err(PricingError::NegativeDiscount),
            Discount::Fixed(amount) => (line_subtotal - amount).max(0),
        };
        let discount_amount = line_subtotal - subtotal;

        let (tax_amount, amount_before_fee) = if input.vat_included {
            let net = round_half_up(Decimal::from(subtotal) / (Decimal::ONE + config.vat_rate))?;
            (subtotal - net, subtotal)
        } else {
            let tax = round_half_up(Decimal::from(subtotal) * config.vat_rate)?;
            (
                tax,
                subtotal.checked_add(tax).ok_or(PricingError::Overflow)?,
            )
        };

        let processing_fee = if input.processing_fee {
            Some(Self::processing_fee(
                amount_before_fee,
                config.fee_percent,
                config.fixed_fee_for(input.currency),
            )?)
        } else {
            None
        };

        let total = amount_before_fee
            .checked_add(processing_fee.unwrap_or(0))
            .ok_or(PricingError::Overflow)?;

        if total < config.minimum_charge {
            return Err(PricingError::BelowMinimum {
                amount: total,
                minimum: config.minimum_charge,
            });
        }

        Ok(PriceBreakdown {
            line_totals,
            line_subtotal,
            discount_amount,
            subtotal,
            tax_amount,
            vat_included: input.vat_included,
            amount_before_fee,
            processing_fee,
            total,
        })
    }

    /// Fee that leaves `amount` in hand after the processor deducts
    /// `fee_percent` of the gross plus `fixed_fee`.
    pub fn processing_fee(
        amount: i64,
        fee_percent: Decimal,
        fixed_fee: i64,
    ) -> Result<i64, PricingError> {
        let gross_up = Decimal::ONE - fee_percent;
        if gross_up <= Decimal::ZERO {
            return Err(PricingError::InvalidConfig(
                "fee_percent must be below 1".to_string(),
            ));
        }
        let fee = (Decimal::from(amount) * fee_percent + Decimal::from(fixed_fee)) / gross_up;
        fee.ceil().to_i64().ok_or(PricingError::Overflow)
    }

    /// Total of a single line after its own discount.
    pub fn line_total(unit_amount: i64, discount_percent: Decimal) -> Result<i64, PricingError> {
        Self::apply_percent_off(unit_amount, discount_percent)
    }

    fn apply_percent_off(amount: i64, percent: Decimal) -> Result<i64, PricingError> {
        let percent = percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        if percent.is_zero() {
            return Ok(amount);
        }
        let kept = Decimal::ONE_HUNDRED - percent;
        let value = Decimal::from(amount)
            .checked_mul(kept)
            .ok_or(PricingError::Overflow)?
            / Decimal::ONE_HUNDRED;
        round_half_up(value)
    }
}

/// Rounds to a whole minor unit, halves away from zero.
fn round_half_up(value: Decimal) -> Result<i64, PricingError> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::types::LineCharge;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_shared::types::Currency;

    fn line(unit_amount: i64, discount_percent: Decimal) -> LineCharge {
        LineCharge {
            unit_amount,
            discount_percent,
        }
    }

    fn input(lines: Vec<LineCharge>) -> PricingInput {
        PricingInput {
            lines,
            discount: Discount::None,
            vat_included: false,
            processing_fee: false,
            currency: Currency::Gbp,
        }
    }

    #[test]
    fn test_vat_added_on_top() {
        let input = input(vec![line(10_000, dec!(0)), line(5_000, dec!(10))]);
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();

        assert_eq!(result.line_totals, vec![10_000, 4_500]);
        assert_eq!(result.subtotal, 14_500);
        assert_eq!(result.tax_amount, 2_900);
        assert_eq!(result.total, 17_400);
    }

    #[test]
    fn test_vat_included_is_disclosed_only() {
        let mut input = input(vec![line(10_000, dec!(0)), line(5_000, dec!(10))]);
        input.vat_included = true;
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();

        assert_eq!(result.total, 14_500);
        // 14500 / 1.2 = 12083.33 -> 12083 net, 2417 disclosed
        assert_eq!(result.tax_amount, 2_417);
        assert!(result.vat_included);
    }

    #[test]
    fn test_processing_fee_usd() {
        let mut input = input(vec![line(100, dec!(0))]);
        input.vat_included = true;
        input.processing_fee = true;
        input.currency = Currency::Usd;
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();

        assert_eq!(result.processing_fee, Some(32));
        assert_eq!(result.total, 132);
    }

    #[rstest]
    #[case(Currency::Gbp, 22)]
    #[case(Currency::Usd, 32)]
    #[case(Currency::Eur, 32)]
    #[case(Currency::Cad, 32)]
    fn test_fixed_fee_by_currency(#[case] currency: Currency, #[case] expected: i64) {
        let config = PricingConfig::default();
        let fee =
            MoneyCalculator::processing_fee(100, config.fee_percent, config.fixed_fee_for(currency))
                .unwrap();
        assert_eq!(fee, expected);
    }

    #[test]
    fn test_line_rounding_half_up() {
        // 333 * 0.85 = 283.05 -> 283 ; 1 * 0.5 = 0.5 -> 1
        let input = input(vec![line(333, dec!(15)), line(1, dec!(50)), line(10_000, dec!(0))]);
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();
        assert_eq!(result.line_totals, vec![283, 1, 10_000]);
    }

    #[test]
    fn test_line_discount_clamped() {
        let input = input(vec![line(5_000, dec!(150)), line(1_000, dec!(-20))]);
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();
        assert_eq!(result.line_totals, vec![0, 1_000]);
    }

    #[test]
    fn test_percent_document_discount() {
        let mut input = input(vec![line(10_000, dec!(0))]);
        input.discount = Discount::Percent(dec!(12.5));
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();
        assert_eq!(result.subtotal, 8_750);
        assert_eq!(result.discount_amount, 1_250);
        assert_eq!(result.total, 10_500);
    }

    #[test]
    fn test_fixed_discount_floors_at_zero() {
        let mut input = input(vec![line(1_000, dec!(0))]);
        input.discount = Discount::Fixed(5_000);
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default());
        assert_eq!(
            result,
            Err(PricingError::BelowMinimum {
                amount: 0,
                minimum: 100
            })
        );
    }

    #[test]
    fn test_negative_fixed_discount_rejected() {
        let mut input = input(vec![line(1_000, dec!(0))]);
        input.discount = Discount::Fixed(-1);
        assert_eq!(
            MoneyCalculator::calculate(&input, &PricingConfig::default()),
            Err(PricingError::NegativeDiscount)
        );
    }

    #[test]
    fn test_empty_lines_rejected() {
        assert_eq!(
            MoneyCalculator::calculate(&input(vec![]), &PricingConfig::default()),
            Err(PricingError::NoLineItems)
        );
    }

    #[test]
    fn test_negative_line_rejected() {
        let input = input(vec![line(500, dec!(0)), line(-1, dec!(0))]);
        assert_eq!(
            MoneyCalculator::calculate(&input, &PricingConfig::default()),
            Err(PricingError::NegativeLineAmount { index: 1 })
        );
    }

    #[test]
    fn test_below_minimum_rejected() {
        let mut input = input(vec![line(99, dec!(0))]);
        input.vat_included = true;
        assert_eq!(
            MoneyCalculator::calculate(&input, &PricingConfig::default()),
            Err(PricingError::BelowMinimum {
                amount: 99,
                minimum: 100
            })
        );
    }

    #[test]
    fn test_fee_lifts_amount_over_minimum() {
        let mut input = input(vec![line(70, dec!(0))]);
        input.vat_included = true;
        input.processing_fee = true;
        input.currency = Currency::Usd;
        let result = MoneyCalculator::calculate(&input, &PricingConfig::default()).unwrap();
        assert_eq!(result.processing_fee, Some(32));
        assert_eq!(result.total, 102);
    }
}
