//! Owner profile and client directory repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tally_core::document::{ClientRecord, OwnerProfile};
use tally_core::store::{ProfileStore, StoreError};
use tally_shared::types::{ClientId, OwnerId};

use crate::entities::{clients, owner_profiles};
use crate::mapping::{client_from_row, db_err, profile_from_row};

/// Relational profile store.
#[derive(Debug)]
pub struct ProfileRepository {
    db: DatabaseConnection,
}

impl ProfileRepository {
    /// Creates a new profile repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates or replaces an owner's billing profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn upsert_profile(&self, profile: &OwnerProfile) -> Result<(), StoreError> {
        let now = Utc::now().fixed_offset();
        let model = owner_profiles::ActiveModel {
            owner_id: Set(profile.owner_id.into_inner()),
            business_name: Set(profile.business_name.clone()),
            default_currency: Set(profile.default_currency.code().to_string()),
            vat_included_default: Set(profile.vat_included_default),
            plan: Set(profile.plan.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        owner_profiles::Entity::insert(model)
            .on_conflict(
                OnConflict::column(owner_profiles::Column::OwnerId)
                    .update_columns([
                        owner_profiles::Column::BusinessName,
                        owner_profiles::Column::DefaultCurrency,
                        owner_profiles::Column::VatIncludedDefault,
                        owner_profiles::Column::Plan,
                        owner_profiles::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Adds a client to an owner's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_client(&self, client: &ClientRecord) -> Result<(), StoreError> {
        let model = clients::ActiveModel {
            id: Set(client.id.into_inner()),
            owner_id: Set(client.owner_id.into_inner()),
            name: Set(client.name.clone()),
            email: Set(client.email.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        clients::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn owner_profile(&self, owner: OwnerId) -> Result<Option<OwnerProfile>, StoreError> {
        owner_profiles::Entity::find_by_id(owner.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(profile_from_row)
            .transpose()
    }

    async fn client(
        &self,
        owner: OwnerId,
        id: ClientId,
    ) -> Result<Option<ClientRecord>, StoreError> {
        Ok(clients::Entity::find_by_id(id.into_inner())
            .filter(clients::Column::OwnerId.eq(owner.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(client_from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_core::document::Plan;
    use tally_shared::types::Currency;

    #[tokio::test]
    async fn test_profile_row_is_mapped() {
        let owner = OwnerId::new();
        let now = Utc::now().fixed_offset();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![owner_profiles::Model {
                owner_id: owner.into_inner(),
                business_name: "Studio Nine".to_string(),
                default_currency: "USD".to_string(),
                vat_included_default: true,
                plan: "pro".to_string(),
                created_at: now,
                updated_at: now,
            }]])
            .into_connection();
        let repo = ProfileRepository::new(db);

        let profile = repo.owner_profile(owner).await.unwrap().unwrap();
        assert_eq!(profile.default_currency, Currency::Usd);
        assert_eq!(profile.plan, Plan::Pro);
        assert!(profile.vat_included_default);
    }

    #[tokio::test]
    async fn test_missing_client_is_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<clients::Model>::new()])
            .into_connection();
        let repo = ProfileRepository::new(db);
        assert!(
            repo.client(OwnerId::new(), ClientId::new())
                .await
                .unwrap()
                .is_none()
        );
    }
}
