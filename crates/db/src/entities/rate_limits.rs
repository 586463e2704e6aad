//! `SeaORM` Entity for the rate_limits table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_limits")]
pub struct Model {
    /// SHA-256 hex of the client IP; raw addresses are never stored.
    #[sea_orm(primary_key, auto_increment = false)]
    pub ip_hash: String,
    pub failed_count: i32,
    pub window_start: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
