//! Collaborators and rules shared by the billing service and schedulers.

use std::sync::Arc;

use chrono::TimeDelta;
use tally_shared::types::OwnerId;
use tally_shared::{BillingConfig, Mailer};
use thiserror::Error;

use crate::billing::error::BillingError;
use crate::document::OwnerProfile;
use crate::pricing::{PricingConfig, PricingError};
use crate::schedule::BillingCalendar;
use crate::store::{DocumentStore, ProfileStore};

/// Settings could not be turned into billing rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid billing configuration: {0}")]
pub struct RulesError(pub String);

impl From<PricingError> for RulesError {
    fn from(err: PricingError) -> Self {
        Self(err.to_string())
    }
}

/// Limits that are not about money.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Rolling window between manual reminders.
    pub manual_reminder_cooldown: TimeDelta,
    /// Documents per kind per month on the free plan.
    pub free_plan_monthly_limit: u32,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            manual_reminder_cooldown: TimeDelta::hours(24),
            free_plan_monthly_limit: 5,
        }
    }
}

/// Every injected setting the core needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BillingRules {
    /// Calculator configuration.
    pub pricing: PricingConfig,
    /// Calendar for day truncation and monthly counters.
    pub calendar: BillingCalendar,
    /// Reminder and plan limits.
    pub policy: BillingPolicy,
}

impl BillingRules {
    /// Builds rules from loaded settings.
    pub fn from_config(settings: &BillingConfig) -> Result<Self, RulesError> {
        let pricing = PricingConfig::from_settings(settings)?;
        let calendar = BillingCalendar::from_name(&settings.timezone).map_err(RulesError)?;
        if settings.manual_reminder_cooldown_hours < 0 {
            return Err(RulesError(
                "manual_reminder_cooldown_hours must be non-negative".to_string(),
            ));
        }
        let cooldown = TimeDelta::try_hours(settings.manual_reminder_cooldown_hours)
            .ok_or_else(|| RulesError("manual_reminder_cooldown_hours is too large".to_string()))?;
        Ok(Self {
            pricing,
            calendar,
            policy: BillingPolicy {
                manual_reminder_cooldown: cooldown,
                free_plan_monthly_limit: settings.free_plan_monthly_limit,
            },
        })
    }
}

/// Stores, mailer and rules, cheaply clonable.
#[derive(Clone)]
pub struct BillingContext {
    /// Document store.
    pub documents: Arc<dyn DocumentStore>,
    /// Profile and client directory.
    pub profiles: Arc<dyn ProfileStore>,
    /// Outbound email.
    pub mailer: Arc<dyn Mailer>,
    /// Injected settings.
    pub rules: Arc<BillingRules>,
}

impl BillingContext {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        profiles: Arc<dyn ProfileStore>,
        mailer: Arc<dyn Mailer>,
        rules: BillingRules,
    ) -> Self {
        Self {
            documents,
            profiles,
            mailer,
            rules: Arc::new(rules),
        }
    }

    /// Loads the owner's profile or fails with `NotFound`.
    pub async fn profile(&self, owner: OwnerId) -> Result<OwnerProfile, BillingError> {
        self.profiles
            .owner_profile(owner)
            .await?
            .ok_or(BillingError::NotFound {
                what: "Owner profile",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rules_from_default_config() {
        let rules = BillingRules::from_config(&BillingConfig::default()).unwrap();
        assert_eq!(rules, BillingRules::default());
    }

    #[test]
    fn test_rules_reject_bad_zone() {
        let settings = BillingConfig {
            timezone: "Nowhere/Land".to_string(),
            ..BillingConfig::default()
        };
        assert!(BillingRules::from_config(&settings).is_err());
    }

    #[test]
    fn test_rules_reject_bad_fee() {
        let settings = BillingConfig {
            fee_percent: dec!(1.5),
            ..BillingConfig::default()
        };
        let err = BillingRules::from_config(&settings).unwrap_err();
        assert!(err.to_string().contains("fee_percent"));
    }
}
