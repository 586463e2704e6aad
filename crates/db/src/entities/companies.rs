//! `SeaORM` Entity for the companies table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use paylink_core::PaymentProvider;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    /// Server-to-server secret; high-entropy and unique-indexed.
    pub api_key: String,
    pub contact_email: Option<String>,
    pub stripe_account_id: Option<String>,
    pub stripe_charges_enabled: bool,
    pub paypal_merchant_id: Option<String>,
    pub paypal_email: Option<String>,
    pub square_merchant_id: Option<String>,
    pub square_access_token: Option<String>,
    pub square_location_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoices::Entity")]
    Invoices,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
    #[sea_orm(has_many = "super::oauth_states::Entity")]
    OauthStates,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::oauth_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OauthStates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this company can take payments through the given provider.
    ///
    /// These aggregate flags are the only provider detail ever exposed to
    /// customer-facing responses.
    #[must_use]
    pub fn provider_connected(&self, provider: PaymentProvider) -> bool {
        match provider {
            PaymentProvider::Stripe => {
                self.stripe_account_id.is_some() && self.stripe_charges_enabled
            }
            PaymentProvider::Paypal => {
                self.paypal_merchant_id.is_some() || self.paypal_email.is_some()
            }
            PaymentProvider::Square => {
                self.square_access_token.is_some() && self.square_location_id.is_some()
            }
        }
    }
}
