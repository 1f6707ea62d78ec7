//! Project repository: role-scoped listing, creation with OB aggregation,
//! updates, deletion, and cluster-head resolution.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use foresight_core::currency::{RateTable, USD, round_amount};
use foresight_core::reconcile::{
    ForecastAction, OB_FORECAST, append_remarks, merge_op_ids, reconcile_amount,
};
use foresight_core::scope::{ProjectFacts, ProjectScope};
use foresight_shared::Role;

use crate::entities::{forecasts, projects, users};

use super::forecast::ForecastLine;

/// Error types for project operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Project not found.
    #[error("Project not found: {0}")]
    NotFound(Uuid),

    /// The OP ID set is already claimed by a project with an OB forecast.
    #[error("OP ID '{0}' already has an OB forecast on project '{1}'")]
    OpIdsInUse(String, String),

    /// OB forecasts need a project number to aggregate under.
    #[error("Project number is required for a new OP ID with an OB forecast")]
    MissingProjectNumber,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a project with its forecast lines.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateProjectInput {
    /// Country the revenue is booked from.
    pub source_country: String,
    /// Business key shared by aggregated OB projects.
    pub project_number: Option<String>,
    /// Comma-joined OP ID set.
    pub op_ids: Option<String>,
    /// Display name.
    pub project_name: String,
    /// Region code.
    pub region: String,
    /// Owning cluster.
    pub cluster_id: Option<Uuid>,
    /// Owning project manager.
    pub manager_id: Option<Uuid>,
    /// Customer name.
    pub customer_name: Option<String>,
    /// Customer group.
    pub customer_group: Option<String>,
    /// Industry vertical.
    pub vertical: Option<String>,
    /// Project type.
    pub project_type: Option<String>,
    /// Project group.
    pub project_group: Option<String>,
    /// Execution country.
    pub execution_country: Option<String>,
    /// Project currency code.
    pub currency: Option<String>,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Status label.
    pub status: Option<String>,
    /// Forecast lines to persist with the project.
    #[serde(default)]
    pub forecasts: Vec<ForecastLine>,
}

/// Field updates for an existing project; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateProjectInput {
    /// Country the revenue is booked from.
    pub source_country: Option<String>,
    /// Business key.
    pub project_number: Option<String>,
    /// Comma-joined OP ID set.
    pub op_ids: Option<String>,
    /// Display name.
    pub project_name: Option<String>,
    /// Region code.
    pub region: Option<String>,
    /// Owning cluster.
    pub cluster_id: Option<Uuid>,
    /// Owning project manager.
    pub manager_id: Option<Uuid>,
    /// Customer name.
    pub customer_name: Option<String>,
    /// Customer group.
    pub customer_group: Option<String>,
    /// Industry vertical.
    pub vertical: Option<String>,
    /// Project type.
    pub project_type: Option<String>,
    /// Project group.
    pub project_group: Option<String>,
    /// Execution country.
    pub execution_country: Option<String>,
    /// Project currency code.
    pub currency: Option<String>,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Status label.
    pub status: Option<String>,
}

/// How a create request was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new project row was inserted.
    Created(Uuid),
    /// OB lines were merged into an existing project with the same number.
    Aggregated(Uuid),
}

/// Result of the pre-flight aggregation probe used by the entry form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpForecastCheck {
    /// The OP ID set is free; a new project will be created.
    New,
    /// An OB import against this number will aggregate into this project.
    WillAggregate {
        /// The project the OB lines would merge into.
        project_id: Uuid,
    },
    /// The OP ID set already belongs to a project.
    OpIdsInUse {
        /// Name of the claiming project.
        project_name: String,
    },
}

/// Reduces a stored row to the facts shape filters and breakdowns consume.
#[must_use]
pub fn to_facts(project: &projects::Model) -> ProjectFacts {
    ProjectFacts {
        id: project.id,
        project_number: project.project_number.clone(),
        region: project.region.clone(),
        status: project.status.clone(),
        vertical: project.vertical.clone(),
        customer_group: project.customer_group.clone(),
        customer_name: project.customer_name.clone(),
        currency: project.currency.clone(),
        cluster_id: project.cluster_id,
        manager_id: project.manager_id,
    }
}

/// Project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a project by id.
    pub async fn find(&self, id: Uuid) -> Result<Option<projects::Model>, DbErr> {
        projects::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a project by its business key.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<projects::Model>, DbErr> {
        projects::Entity::find()
            .filter(projects::Column::ProjectNumber.eq(number))
            .one(&self.db)
            .await
    }

    /// Finds a project by its exact OP ID set.
    pub async fn find_by_op_ids(&self, op_ids: &str) -> Result<Option<projects::Model>, DbErr> {
        projects::Entity::find()
            .filter(projects::Column::OpIds.eq(op_ids))
            .one(&self.db)
            .await
    }

    /// Lists the projects visible to a scope. This is the only project
    /// listing path; every endpoint goes through it.
    pub async fn list_visible(&self, scope: ProjectScope) -> Result<Vec<projects::Model>, DbErr> {
        let query = projects::Entity::find();
        match scope {
            ProjectScope::All => query.all(&self.db).await,
            ProjectScope::Cluster(cluster_id) => {
                query
                    .filter(projects::Column::ClusterId.eq(cluster_id))
                    .all(&self.db)
                    .await
            }
            ProjectScope::Manager(manager_id) => {
                query
                    .filter(projects::Column::ManagerId.eq(manager_id))
                    .all(&self.db)
                    .await
            }
            ProjectScope::Empty => Ok(vec![]),
        }
    }

    /// Pre-flight probe: what would creating this OP ID / forecast type do?
    pub async fn check_op_forecast(
        &self,
        op_ids: &str,
        forecast_type: &str,
        project_number: Option<&str>,
    ) -> Result<OpForecastCheck, ProjectError> {
        if let Some(existing) = self.find_by_op_ids(op_ids).await? {
            return Ok(OpForecastCheck::OpIdsInUse {
                project_name: existing.project_name,
            });
        }

        if forecast_type == OB_FORECAST {
            let number = project_number.ok_or(ProjectError::MissingProjectNumber)?;
            if let Some(existing) = self.find_by_number(number).await? {
                return Ok(OpForecastCheck::WillAggregate {
                    project_id: existing.id,
                });
            }
        }

        Ok(OpForecastCheck::New)
    }

    /// Creates a project with its forecast lines, or aggregates OB lines
    /// into an existing project sharing the same project number.
    ///
    /// Aggregation merges the OP ID sets, pipe-appends remarks, and *adds*
    /// incoming OB amounts (native and USD snapshot) into existing rows at
    /// the same (year, month). Non-OB lines never aggregate.
    pub async fn create(
        &self,
        input: CreateProjectInput,
        rates: &RateTable,
    ) -> Result<CreateOutcome, ProjectError> {
        let has_ob = input
            .forecasts
            .iter()
            .any(|f| f.forecast_type == OB_FORECAST);

        if has_ob {
            let existing_op_project = match input.op_ids.as_deref() {
                Some(op_ids) => self.find_by_op_ids(op_ids).await?,
                None => None,
            };

            if let Some(op_project) = &existing_op_project {
                let has_ob_forecast = forecasts::Entity::find()
                    .filter(forecasts::Column::ProjectId.eq(op_project.id))
                    .filter(forecasts::Column::ForecastType.eq(OB_FORECAST))
                    .one(&self.db)
                    .await?
                    .is_some();
                if has_ob_forecast {
                    return Err(ProjectError::OpIdsInUse(
                        input.op_ids.unwrap_or_default(),
                        op_project.project_name.clone(),
                    ));
                }
            }

            if existing_op_project.is_none() {
                let Some(number) = input.project_number.as_deref() else {
                    return Err(ProjectError::MissingProjectNumber);
                };
                if let Some(target) = self.find_by_number(number).await? {
                    let id = self.aggregate_into(&target, &input, rates).await?;
                    return Ok(CreateOutcome::Aggregated(id));
                }
            }
        }

        let id = self.insert_project(&input, rates).await?;
        Ok(CreateOutcome::Created(id))
    }

    async fn aggregate_into(
        &self,
        target: &projects::Model,
        input: &CreateProjectInput,
        rates: &RateTable,
    ) -> Result<Uuid, ProjectError> {
        let txn = self.db.begin().await?;
        let currency = input.currency.as_deref().unwrap_or(USD);

        let mut active: projects::ActiveModel = target.clone().into();
        active.op_ids = Set(merge_op_ids(
            target.op_ids.as_deref(),
            input.op_ids.as_deref(),
        ));
        active.remarks = Set(append_remarks(
            target.remarks.as_deref(),
            input.remarks.as_deref(),
        ));
        active.updated_at = Set(Some(Utc::now().into()));
        active.update(&txn).await?;

        for line in &input.forecasts {
            if line.forecast_type != OB_FORECAST {
                continue;
            }
            let incoming_usd = round_amount(rates.to_usd(line.amount, currency));

            let existing = forecasts::Entity::find()
                .filter(forecasts::Column::ProjectId.eq(target.id))
                .filter(forecasts::Column::ForecastType.eq(OB_FORECAST))
                .filter(forecasts::Column::Year.eq(line.year))
                .filter(forecasts::Column::Month.eq(i32::try_from(line.month).unwrap_or(0)))
                .one(&txn)
                .await?;

            let action = reconcile_amount(
                OB_FORECAST,
                existing.as_ref().map(|row| (row.amount, row.forecast_usd)),
                line.amount,
                incoming_usd,
            );
            match (existing, action) {
                (
                    Some(row),
                    ForecastAction::Accumulate {
                        amount,
                        forecast_usd,
                    }
                    | ForecastAction::Overwrite {
                        amount,
                        forecast_usd,
                    },
                ) => {
                    let mut active: forecasts::ActiveModel = row.into();
                    active.amount = Set(amount);
                    active.forecast_usd = Set(forecast_usd);
                    active.updated_at = Set(Some(Utc::now().into()));
                    active.update(&txn).await?;
                }
                _ => {
                    insert_forecast_row(&txn, target.id, line, incoming_usd, target.manager_id)
                        .await?;
                }
            }
        }

        txn.commit().await?;
        Ok(target.id)
    }

    async fn insert_project(
        &self,
        input: &CreateProjectInput,
        rates: &RateTable,
    ) -> Result<Uuid, ProjectError> {
        let txn = self.db.begin().await?;
        let currency = input.currency.as_deref().unwrap_or(USD);
        let project_id = Uuid::new_v4();

        let row = projects::ActiveModel {
            id: Set(project_id),
            source_country: Set(input.source_country.clone()),
            project_number: Set(input.project_number.clone()),
            op_ids: Set(input.op_ids.clone()),
            project_name: Set(input.project_name.clone()),
            region: Set(input.region.clone()),
            cluster_id: Set(input.cluster_id),
            manager_id: Set(input.manager_id),
            customer_name: Set(input.customer_name.clone()),
            customer_group: Set(input.customer_group.clone()),
            vertical: Set(input.vertical.clone()),
            project_type: Set(input.project_type.clone()),
            project_group: Set(input.project_group.clone()),
            execution_country: Set(input.execution_country.clone()),
            currency: Set(input.currency.clone()),
            remarks: Set(input.remarks.clone()),
            status: Set(input.status.clone()),
            created_at: Set(Utc::now().into()),
            updated_by: Set(None),
            updated_at: Set(None),
        };
        row.insert(&txn).await?;

        for line in &input.forecasts {
            let forecast_usd = round_amount(rates.to_usd(line.amount, currency));
            insert_forecast_row(&txn, project_id, line, forecast_usd, input.manager_id).await?;
        }

        txn.commit().await?;
        Ok(project_id)
    }

    /// Applies field updates to a project.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProjectInput,
        updated_by: Uuid,
    ) -> Result<projects::Model, ProjectError> {
        let project = self.find(id).await?.ok_or(ProjectError::NotFound(id))?;

        let mut active: projects::ActiveModel = project.into();
        if let Some(v) = input.source_country {
            active.source_country = Set(v);
        }
        if let Some(v) = input.project_number {
            active.project_number = Set(Some(v));
        }
        if let Some(v) = input.op_ids {
            active.op_ids = Set(Some(v));
        }
        if let Some(v) = input.project_name {
            active.project_name = Set(v);
        }
        if let Some(v) = input.region {
            active.region = Set(v);
        }
        if let Some(v) = input.cluster_id {
            active.cluster_id = Set(Some(v));
        }
        if let Some(v) = input.manager_id {
            active.manager_id = Set(Some(v));
        }
        if let Some(v) = input.customer_name {
            active.customer_name = Set(Some(v));
        }
        if let Some(v) = input.customer_group {
            active.customer_group = Set(Some(v));
        }
        if let Some(v) = input.vertical {
            active.vertical = Set(Some(v));
        }
        if let Some(v) = input.project_type {
            active.project_type = Set(Some(v));
        }
        if let Some(v) = input.project_group {
            active.project_group = Set(Some(v));
        }
        if let Some(v) = input.execution_country {
            active.execution_country = Set(Some(v));
        }
        if let Some(v) = input.currency {
            active.currency = Set(Some(v));
        }
        if let Some(v) = input.remarks {
            active.remarks = Set(Some(v));
        }
        if let Some(v) = input.status {
            active.status = Set(Some(v));
        }
        active.updated_by = Set(Some(updated_by));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Deletes a project and all its forecast rows.
    pub async fn delete(&self, id: Uuid) -> Result<(), ProjectError> {
        let project = self.find(id).await?.ok_or(ProjectError::NotFound(id))?;

        let txn = self.db.begin().await?;
        forecasts::Entity::delete_many()
            .filter(forecasts::Column::ProjectId.eq(project.id))
            .exec(&txn)
            .await?;
        projects::Entity::delete_by_id(project.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Resolves the cluster head for a cluster, if one is assigned.
    ///
    /// Cluster headship is modelled by the (role = CH, cluster_id) join
    /// rather than a direct foreign key; this is the one place that join
    /// lives.
    pub async fn resolve_cluster_head(
        &self,
        cluster_id: Uuid,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Role.eq(Role::ClusterHead.as_str()))
            .filter(users::Column::ClusterId.eq(cluster_id))
            .one(&self.db)
            .await
    }

    /// Maps user ids to display names, for response shaping.
    pub async fn user_names(&self) -> Result<HashMap<Uuid, String>, DbErr> {
        let all = users::Entity::find().all(&self.db).await?;
        Ok(all.into_iter().map(|u| (u.id, u.name)).collect())
    }

    /// Maps every cluster with a head to that head's display name.
    pub async fn cluster_head_names(&self) -> Result<HashMap<Uuid, String>, DbErr> {
        let heads = users::Entity::find()
            .filter(users::Column::Role.eq(Role::ClusterHead.as_str()))
            .all(&self.db)
            .await?;

        Ok(heads
            .into_iter()
            .filter_map(|head| head.cluster_id.map(|cluster| (cluster, head.name)))
            .collect())
    }
}

async fn insert_forecast_row<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    line: &ForecastLine,
    forecast_usd: Decimal,
    created_by: Option<Uuid>,
) -> Result<(), DbErr> {
    let row = forecasts::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        forecast_type: Set(line.forecast_type.clone()),
        source_country: Set(None),
        year: Set(line.year),
        month: Set(i32::try_from(line.month).unwrap_or(0)),
        amount: Set(line.amount),
        forecast_usd: Set(forecast_usd),
        actuals: Set(Decimal::ZERO),
        created_by: Set(created_by),
        created_at: Set(Utc::now().into()),
        updated_by: Set(None),
        updated_at: Set(None),
    };
    row.insert(conn).await?;
    Ok(())
}
