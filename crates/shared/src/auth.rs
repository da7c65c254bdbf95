//! Owner identity carried in bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OwnerId;

/// JWT claims for owner access tokens.
///
/// Sessions and login live outside this service; only the owner id is
/// needed to scope document access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (owner ID).
    pub sub: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an owner.
    #[must_use]
    pub fn new(owner_id: OwnerId, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: owner_id.into_inner(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the owner ID from claims.
    #[must_use]
    pub const fn owner_id(&self) -> OwnerId {
        OwnerId::from_uuid(self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_new_sets_correct_fields() {
        let owner = OwnerId::new();
        let expires_at = Utc::now() + Duration::hours(1);

        let claims = Claims::new(owner, expires_at);

        assert_eq!(claims.owner_id(), owner);
        assert!(claims.iat <= Utc::now().timestamp());
        assert_eq!(claims.exp, expires_at.timestamp());
    }
}
