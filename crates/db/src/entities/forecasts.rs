//! `SeaORM` Entity for forecast_values table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "forecast_values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    /// Forecast type; `OB` rows aggregate additively.
    pub forecast_type: String,
    pub source_country: Option<String>,
    /// Absolute calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: i32,
    /// Amount in the project currency.
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub amount: Decimal,
    /// USD snapshot frozen at write time; never recomputed on rate changes.
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub forecast_usd: Decimal,
    /// Reconciled actual amount, 0 until an actuals import lands.
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub actuals: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_delete = "Cascade"
    )]
    Projects,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
