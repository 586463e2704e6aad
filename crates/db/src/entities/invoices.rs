//! `SeaORM` Entity for the invoices table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    /// Company-scoped external id assigned by the client app.
    pub invoice_number: String,
    /// Globally unique unguessable token granting read/pay access.
    pub invoice_token: String,
    /// Groups every invoice for one customer at one company.
    pub customer_token: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    /// Opaque line items/totals/notes; schema owned by the client app.
    pub payload: Json,
    pub status: String,
    pub total_amount: Decimal,
    pub balance_due: Decimal,
    pub currency: String,
    pub due_date: Option<Date>,
    pub viewed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
