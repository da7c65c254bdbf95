//! Owner profile and client directory records.
//!
//! Both are read once when a document is created; documents keep their
//! own snapshot afterwards.

use serde::{Deserialize, Serialize};
use tally_shared::types::{ClientId, Currency, OwnerId};

/// Subscription plan of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Monthly document limit applies.
    Free,
    /// Unlimited.
    Pro,
}

impl Plan {
    /// Returns the string representation of the plan.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }

    /// Parses a plan from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

/// Owner settings relevant to billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    /// Owner identity.
    pub owner_id: OwnerId,
    /// Name shown to clients.
    pub business_name: String,
    /// Currency used when a draft names none.
    pub default_currency: Currency,
    /// VAT-included preference used when a draft names none.
    pub vat_included_default: bool,
    /// Subscription plan.
    pub plan: Plan,
}

/// A client in the owner's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Client identity.
    pub id: ClientId,
    /// Owning business.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
}
