//! `SeaORM` Entity for exchange_rates table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    /// ISO currency code.
    #[sea_orm(primary_key, auto_increment = false)]
    pub currency_code: String,
    /// Units of USD per unit of this currency. Last write wins; no history.
    #[sea_orm(column_type = "Decimal(Some((18, 9)))")]
    pub rate_to_usd: Decimal,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
