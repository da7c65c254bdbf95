//! Pricing domain types.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::BillingConfig;
use tally_shared::types::Currency;

use crate::pricing::error::PricingError;

/// Document-level discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    /// No document-level discount.
    #[default]
    None,
    /// Percentage off the subtotal, clamped to 0–100.
    Percent(Decimal),
    /// Fixed amount off the subtotal, in minor units.
    Fixed(i64),
}

impl Discount {
    /// Returns the storage tag for this discount type.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Percent(_) => "percent",
            Self::Fixed(_) => "fixed",
        }
    }

    /// Returns the raw stored value (percent or minor units).
    #[must_use]
    pub fn value(&self) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Percent(pct) => *pct,
            Self::Fixed(amount) => Decimal::from(*amount),
        }
    }

    /// Rebuilds a discount from its storage tag and value.
    #[must_use]
    pub fn from_parts(kind: &str, value: Decimal) -> Option<Self> {
        match kind {
            "none" => Some(Self::None),
            "percent" => Some(Self::Percent(value)),
            "fixed" => rust_decimal::prelude::ToPrimitive::to_i64(&value).map(Self::Fixed),
            _ => None,
        }
    }
}

/// One priced line as seen by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCharge {
    /// Pre-discount unit price in minor units.
    pub unit_amount: i64,
    /// Line discount percentage; values outside 0–100 are clamped.
    pub discount_percent: Decimal,
}

/// Everything the calculator needs for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingInput {
    /// Ordered line charges.
    pub lines: Vec<LineCharge>,
    /// Document-level discount.
    pub discount: Discount,
    /// Whether the line prices already contain VAT.
    pub vat_included: bool,
    /// Whether the processing fee is passed on to the client.
    pub processing_fee: bool,
    /// Document currency (selects the fixed fee).
    pub currency: Currency,
}

/// Tax, fee and minimum-charge settings injected into the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// VAT rate as a fraction (0.20).
    pub vat_rate: Decimal,
    /// Percentage fee as a fraction (0.015).
    pub fee_percent: Decimal,
    /// Fixed fee per currency, in minor units.
    pub fixed_fees: HashMap<Currency, i64>,
    /// Fixed fee for currencies not in `fixed_fees`.
    pub default_fixed_fee: i64,
    /// Minimum final charge in minor units.
    pub minimum_charge: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            vat_rate: Decimal::new(20, 2),
            fee_percent: Decimal::new(15, 3),
            fixed_fees: HashMap::from([
                (Currency::Gbp, 20),
                (Currency::Usd, 30),
                (Currency::Eur, 30),
            ]),
            default_fixed_fee: 30,
            minimum_charge: 100,
        }
    }
}

impl PricingConfig {
    /// Builds the calculator configuration from loaded settings.
    ///
    /// Fee table keys are matched case-insensitively because environment
    /// overrides arrive lower-cased.
    pub fn from_settings(settings: &BillingConfig) -> Result<Self, PricingError> {
        let unit = Decimal::ONE;
        if settings.vat_rate < Decimal::ZERO || settings.vat_rate >= unit {
            return Err(PricingError::InvalidConfig(format!(
                "vat_rate {} must be in [0, 1)",
                settings.vat_rate
            )));
        }
        if settings.fee_percent < Decimal::ZERO || settings.fee_percent >= unit {
            return Err(PricingError::InvalidConfig(format!(
                "fee_percent {} must be in [0, 1)",
                settings.fee_percent
            )));
        }
        if settings.minimum_charge < 0 || settings.default_fixed_fee < 0 {
            return Err(PricingError::InvalidConfig(
                "minimum_charge and default_fixed_fee must be non-negative".to_string(),
            ));
        }

        let mut fixed_fees = HashMap::with_capacity(settings.fixed_fees.len());
        for (code, fee) in &settings.fixed_fees {
            let currency = Currency::from_str(code).map_err(PricingError::InvalidConfig)?;
            if *fee < 0 {
                return Err(PricingError::InvalidConfig(format!(
                    "fixed fee for {currency} must be non-negative"
                )));
            }
            fixed_fees.insert(currency, *fee);
        }

        Ok(Self {
            vat_rate: settings.vat_rate,
            fee_percent: settings.fee_percent,
            fixed_fees,
            default_fixed_fee: settings.default_fixed_fee,
            minimum_charge: settings.minimum_charge,
        })
    }

    /// Fixed processing fee for a currency.
    #[must_use]
    pub fn fixed_fee_for(&self, currency: Currency) -> i64 {
        self.fixed_fees
            .get(&currency)
            .copied()
            .unwrap_or(self.default_fixed_fee)
    }
}

/// Every intermediate of a calculation, for display and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// Rounded total per line, in input order.
    pub line_totals: Vec<i64>,
    /// Sum of line totals before the document discount.
    pub line_subtotal: i64,
    /// Amount removed by the document discount.
    pub discount_amount: i64,
    /// Subtotal after the document discount.
    pub subtotal: i64,
    /// VAT amount; added on top or disclosed, see `vat_included`.
    pub tax_amount: i64,
    /// Whether `tax_amount` is contained in `subtotal` rather than added.
    pub vat_included: bool,
    /// Amount owed before any processing fee.
    pub amount_before_fee: i64,
    /// Processing fee, when requested.
    pub processing_fee: Option<i64>,
    /// Final charge.
    pub total: i64,
}
