//! `SeaORM` Entity for projects table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_country: String,
    /// Business key; groups OB forecasts across OP IDs.
    pub project_number: Option<String>,
    /// Comma-joined OP ID set, merged append-only on aggregation.
    pub op_ids: Option<String>,
    pub project_name: String,
    /// Region code: `APAC`, `NA` or `EU`.
    pub region: String,
    pub cluster_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_group: Option<String>,
    pub vertical: Option<String>,
    pub project_type: Option<String>,
    pub project_group: Option<String>,
    pub execution_country: Option<String>,
    pub currency: Option<String>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clusters::Entity",
        from = "Column::ClusterId",
        to = "super::clusters::Column::Id"
    )]
    Clusters,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ManagerId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::forecasts::Entity")]
    Forecasts,
}

impl Related<super::clusters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clusters.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::forecasts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forecasts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
