//! `SeaORM` Entity for the payments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub invoice_id: Uuid,
    /// Denormalized external id so the client app can match its own records.
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub processing_fee: Decimal,
    pub currency: String,
    /// Which provider settled the payment.
    pub method: String,
    /// Provider-assigned payment id; unique when present (idempotency key).
    pub provider_payment_id: Option<String>,
    pub provider_transaction_id: Option<String>,
    /// Human-readable reference: `PAY-YYYYMMDD-<6 hex>`.
    pub reference_number: String,
    pub status: String,
    /// Whether the client app has pulled and acknowledged this payment.
    pub synced: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id"
    )]
    Invoices,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
