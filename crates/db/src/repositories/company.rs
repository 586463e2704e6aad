//! Company repository for tenant registration and provider credentials.
//!
//! Provider credential columns are written only through `apply_credentials`,
//! `set_stripe_account`, `set_paypal_email`, and `clear_provider`, keeping
//! the one-credential-set-per-provider invariant in a single place.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use paylink_core::PaymentProvider;

use crate::entities::companies;

/// Input for registering a company.
#[derive(Debug, Clone)]
pub struct CreateCompanyInput {
    /// Company display name.
    pub name: String,
    /// Optional logo shown on portal pages.
    pub logo_url: Option<String>,
    /// Contact email, also passed to providers during onboarding.
    pub contact_email: Option<String>,
    /// Pre-generated API key (64 hex).
    pub api_key: String,
}

/// Credentials produced by a completed connect callback.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    /// Account / merchant identifier.
    pub account_id: Option<String>,
    /// Access credential, where the provider issues one.
    pub access_token: Option<String>,
    /// Location identifier, where applicable.
    pub location_id: Option<String>,
    /// Merchant email, where reported.
    pub email: Option<String>,
    /// Whether the provider reports the account charge-ready.
    pub charges_enabled: bool,
}

/// Company repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a new company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, input: CreateCompanyInput) -> Result<companies::Model, DbErr> {
        let now = chrono::Utc::now().into();

        let company = companies::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            logo_url: Set(input.logo_url),
            api_key: Set(input.api_key),
            contact_email: Set(input.contact_email),
            stripe_account_id: Set(None),
            stripe_charges_enabled: Set(false),
            paypal_merchant_id: Set(None),
            paypal_email: Set(None),
            square_merchant_id: Set(None),
            square_access_token: Set(None),
            square_location_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        company.insert(&self.db).await
    }

    /// Finds a company by its API key (unique-indexed).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<companies::Model>, DbErr> {
        companies::Entity::find()
            .filter(companies::Column::ApiKey.eq(api_key))
            .one(&self.db)
            .await
    }

    /// Finds a company by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<companies::Model>, DbErr> {
        companies::Entity::find_by_id(id).one(&self.db).await
    }

    /// Persists a freshly provisioned Stripe connected-account id.
    ///
    /// Called during connect initiation, before the user is redirected, so
    /// the id survives an abandoned onboarding and is reused next time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn set_stripe_account(&self, company_id: Uuid, account_id: &str) -> Result<(), DbErr> {
        companies::ActiveModel {
            id: Set(company_id),
            stripe_account_id: Set(Some(account_id.to_string())),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        Ok(())
    }

    /// Persists credentials from a completed connect callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn apply_credentials(
        &self,
        company_id: Uuid,
        provider: PaymentProvider,
        update: &CredentialUpdate,
    ) -> Result<companies::Model, DbErr> {
        let mut company = companies::ActiveModel {
            id: Set(company_id),
            ..Default::default()
        };

        match provider {
            PaymentProvider::Stripe => {
                company.stripe_account_id = Set(update.account_id.clone());
                company.stripe_charges_enabled = Set(update.charges_enabled);
            }
            PaymentProvider::Paypal => {
                company.paypal_merchant_id = Set(update.account_id.clone());
                company.paypal_email = Set(update.email.clone());
            }
            PaymentProvider::Square => {
                company.square_merchant_id = Set(update.account_id.clone());
                company.square_access_token = Set(update.access_token.clone());
                company.square_location_id = Set(update.location_id.clone());
            }
        }

        company.update(&self.db).await
    }

    /// Persists a PayPal payee email from the form-based variant flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn set_paypal_email(
        &self,
        company_id: Uuid,
        email: &str,
    ) -> Result<companies::Model, DbErr> {
        companies::ActiveModel {
            id: Set(company_id),
            paypal_email: Set(Some(email.to_string())),
            ..Default::default()
        }
        .update(&self.db)
        .await
    }

    /// Clears a provider's credential columns (disconnect).
    ///
    /// Idempotent: clearing already-empty columns is a no-op, not an error,
    /// and the company row itself is never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn clear_provider(
        &self,
        company_id: Uuid,
        provider: PaymentProvider,
    ) -> Result<companies::Model, DbErr> {
        let cleared = CredentialUpdate::default();
        self.apply_credentials(company_id, provider, &cleared).await
    }
}
