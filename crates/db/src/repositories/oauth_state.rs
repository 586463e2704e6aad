//! OAuth CSRF state repository.
//!
//! State rows are single-use and expire after ten minutes, checked lazily at
//! read time. Validation and deletion are separate calls: the hosted-account
//! re-redirect deliberately keeps the row alive for a second round trip.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use paylink_core::PaymentProvider;
use paylink_core::connect::state_expiry;

use crate::entities::oauth_states;

/// OAuth state repository.
#[derive(Debug, Clone)]
pub struct OAuthStateRepository {
    db: DatabaseConnection,
}

impl OAuthStateRepository {
    /// Creates a new OAuth state repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issues a state row for a connect attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        company_id: Uuid,
        provider: PaymentProvider,
        state_token: &str,
    ) -> Result<oauth_states::Model, DbErr> {
        let now: DateTime<Utc> = Utc::now();

        let state = oauth_states::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            provider: Set(provider.as_str().to_string()),
            state_token: Set(state_token.to_string()),
            expires_at: Set(state_expiry(now).into()),
            created_at: Set(now.into()),
        };

        state.insert(&self.db).await
    }

    /// Finds an unexpired state row matching the token and provider.
    ///
    /// Does not consume the row; callers delete it explicitly once the
    /// attempt is terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_valid(
        &self,
        state_token: &str,
        provider: PaymentProvider,
    ) -> Result<Option<oauth_states::Model>, DbErr> {
        oauth_states::Entity::find()
            .filter(oauth_states::Column::StateToken.eq(state_token))
            .filter(oauth_states::Column::Provider.eq(provider.as_str()))
            .filter(oauth_states::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
    }

    /// Deletes a state row by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbErr> {
        oauth_states::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Sweeps expired state rows, returning how many were removed.
    ///
    /// Called opportunistically from successful callbacks; there is no
    /// timer-driven cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn sweep_expired(&self) -> Result<u64, DbErr> {
        let result = oauth_states::Entity::delete_many()
            .filter(oauth_states::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
