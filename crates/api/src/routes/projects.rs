//! Project routes: role-scoped listing, detail, creation with OB
//! aggregation, updates, forecast edits, and deletion.

use std::collections::{BTreeMap, HashMap};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use foresight_core::fiscal::{fiscal_months, fiscal_year_of};
use foresight_core::scope::{IdFilter, ProjectFilters, sentinel};
use foresight_db::entities::{forecasts, projects};
use foresight_db::repositories::exchange_rate::ExchangeRateRepository;
use foresight_db::repositories::forecast::{ForecastLine, ForecastRepository, to_fact};
use foresight_db::repositories::project::{
    CreateOutcome, CreateProjectInput, OpForecastCheck, ProjectRepository, UpdateProjectInput,
    to_facts,
};

use crate::error::{ApiError, forbidden, validation};
use crate::{AppState, middleware::AuthUser};

/// Creates the project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects", post(create_project))
        .route("/projects/check-op-forecast", get(check_op_forecast))
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}", put(update_project))
        .route("/projects/{id}", delete(delete_project))
        .route("/projects/{id}/forecasts", put(replace_forecasts))
        .route("/projects/{id}/forecasts/edited", put(edit_forecasts))
}

fn month_map() -> BTreeMap<u32, Decimal> {
    fiscal_months().iter().map(|m| (*m, Decimal::ZERO)).collect()
}

fn ensure_access(auth: &AuthUser, project: &projects::Model) -> Result<(), ApiError> {
    if auth.scope().permits(project.manager_id, project.cluster_id) {
        Ok(())
    } else {
        Err(forbidden("You do not have access to this project"))
    }
}

fn validate_lines(lines: &[ForecastLine]) -> Result<(), ApiError> {
    for line in lines {
        line.validate().map_err(validation)?;
    }
    Ok(())
}

// ============================================================================
// Listing
// ============================================================================

/// Query parameters for the project list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Fiscal start year; defaults to the current one.
    pub year: Option<i32>,
    /// Exact project number, or `all`.
    pub project_number: Option<String>,
    /// Region code, or `all`.
    pub region: Option<String>,
    /// Status label, or `all`.
    pub status: Option<String>,
    /// Project currency, or `all`.
    pub currency: Option<String>,
    /// Vertical, or `all`.
    pub vertical: Option<String>,
    /// Cluster id, or `all`.
    pub cluster: Option<String>,
    /// Manager id, or `all`.
    pub manager: Option<String>,
    /// Customer group, or `all`.
    pub customer_group: Option<String>,
    /// Customer name, or `all`.
    pub customer_name: Option<String>,
    /// Forecast type, or `all`.
    pub forecast_type: Option<String>,
}

/// One project with its fiscal-year forecast breakdown.
#[derive(Debug, Serialize)]
pub struct ProjectWithForecasts {
    /// Project id.
    pub id: Uuid,
    /// Country the revenue is booked from.
    pub source_country: String,
    /// Forecast type of the project's rows, `N/A` when it has none.
    pub forecast_type: String,
    /// Business key.
    pub project_number: Option<String>,
    /// Comma-joined OP ID set.
    pub op_ids: Option<String>,
    /// Project type.
    pub project_type: Option<String>,
    /// Project group.
    pub project_group: Option<String>,
    /// Display name.
    pub project_name: String,
    /// Customer group.
    pub customer_group: Option<String>,
    /// Customer name.
    pub customer_name: Option<String>,
    /// Region code.
    pub region: String,
    /// Status label.
    pub status: Option<String>,
    /// Project currency.
    pub currency: Option<String>,
    /// Vertical.
    pub vertical: Option<String>,
    /// Execution country.
    pub execution_country: Option<String>,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Manager display name, empty when unassigned.
    pub manager_name: String,
    /// Cluster head display name, empty when unresolved.
    pub cluster_head_name: String,
    /// USD snapshots keyed by calendar month.
    pub forecasts_usd: BTreeMap<u32, Decimal>,
    /// Native-currency amounts keyed by calendar month.
    pub forecasts_po: BTreeMap<u32, Decimal>,
    /// Reconciled actuals keyed by calendar month.
    pub actuals: BTreeMap<u32, Decimal>,
    /// Total native-currency forecast across the fiscal year.
    pub total_forecast_regional: Decimal,
    /// Total USD forecast across the fiscal year.
    pub total_forecast_usd: Decimal,
    /// Total actuals across the fiscal year.
    pub total_actual_usd: Decimal,
}

/// GET `/projects` - role-scoped list with fiscal-year forecast maps.
async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProjectWithForecasts>>, ApiError> {
    let fiscal_year = query
        .year
        .unwrap_or_else(|| fiscal_year_of(Utc::now().date_naive()));

    let filters = ProjectFilters {
        project_number: sentinel(query.project_number.as_deref()).map(str::to_owned),
        region: sentinel(query.region.as_deref()).map(str::to_owned),
        status: sentinel(query.status.as_deref()).map(str::to_owned),
        vertical: sentinel(query.vertical.as_deref()).map(str::to_owned),
        customer_group: sentinel(query.customer_group.as_deref()).map(str::to_owned),
        customer_name: sentinel(query.customer_name.as_deref()).map(str::to_owned),
        currency: sentinel(query.currency.as_deref()).map(str::to_owned),
        cluster: IdFilter::parse(query.cluster.as_deref()),
        manager: IdFilter::parse(query.manager.as_deref()),
    };

    let project_repo = ProjectRepository::new((*state.db).clone());
    let forecast_repo = ForecastRepository::new((*state.db).clone());

    let mut visible: Vec<projects::Model> = project_repo
        .list_visible(auth.scope())
        .await?
        .into_iter()
        .filter(|p| filters.matches(&to_facts(p)))
        .collect();

    if let Some(forecast_type) = sentinel(query.forecast_type.as_deref()) {
        let ids: Vec<Uuid> = visible.iter().map(|p| p.id).collect();
        let with_type = forecast_repo
            .project_ids_with_type(&ids, forecast_type)
            .await?;
        visible.retain(|p| with_type.contains(&p.id));
    }

    let ids: Vec<Uuid> = visible.iter().map(|p| p.id).collect();
    let mut by_project: HashMap<Uuid, Vec<forecasts::Model>> = HashMap::new();
    for row in forecast_repo
        .for_fiscal_year(&ids, fiscal_year, None, None)
        .await?
    {
        by_project.entry(row.project_id).or_default().push(row);
    }

    let user_names = project_repo.user_names().await?;
    let cluster_heads = project_repo.cluster_head_names().await?;

    let result = visible
        .into_iter()
        .map(|project| {
            let rows = by_project.remove(&project.id).unwrap_or_default();
            shape_project(&project, &rows, &user_names, &cluster_heads)
        })
        .collect();

    Ok(Json(result))
}

fn shape_project(
    project: &projects::Model,
    rows: &[forecasts::Model],
    user_names: &HashMap<Uuid, String>,
    cluster_heads: &HashMap<Uuid, String>,
) -> ProjectWithForecasts {
    let mut forecasts_usd = month_map();
    let mut forecasts_po = month_map();
    let mut actuals = month_map();

    let mut total_forecast_regional = Decimal::ZERO;
    let mut total_forecast_usd = Decimal::ZERO;
    let mut total_actual_usd = Decimal::ZERO;

    for row in rows {
        let fact = to_fact(row);
        if let Some(slot) = forecasts_usd.get_mut(&fact.month) {
            *slot = row.forecast_usd;
        }
        if let Some(slot) = forecasts_po.get_mut(&fact.month) {
            *slot = row.amount;
        }
        if let Some(slot) = actuals.get_mut(&fact.month) {
            *slot = row.actuals;
        }
        total_forecast_regional += row.amount;
        total_forecast_usd += row.forecast_usd;
        total_actual_usd += row.actuals;
    }

    let forecast_type = rows
        .first()
        .map_or_else(|| "N/A".to_string(), |r| r.forecast_type.clone());

    ProjectWithForecasts {
        id: project.id,
        source_country: project.source_country.clone(),
        forecast_type,
        project_number: project.project_number.clone(),
        op_ids: project.op_ids.clone(),
        project_type: project.project_type.clone(),
        project_group: project.project_group.clone(),
        project_name: project.project_name.clone(),
        customer_group: project.customer_group.clone(),
        customer_name: project.customer_name.clone(),
        region: project.region.clone(),
        status: project.status.clone(),
        currency: project.currency.clone(),
        vertical: project.vertical.clone(),
        execution_country: project.execution_country.clone(),
        remarks: project.remarks.clone(),
        manager_name: project
            .manager_id
            .and_then(|id| user_names.get(&id).cloned())
            .unwrap_or_default(),
        cluster_head_name: project
            .cluster_id
            .and_then(|id| cluster_heads.get(&id).cloned())
            .unwrap_or_default(),
        forecasts_usd,
        forecasts_po,
        actuals,
        total_forecast_regional,
        total_forecast_usd,
        total_actual_usd,
    }
}

// ============================================================================
// Detail / mutation
// ============================================================================

/// GET `/projects/{id}` - detail with current-fiscal-year forecasts.
async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project_repo = ProjectRepository::new((*state.db).clone());
    let project = project_repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError(foresight_shared::AppError::NotFound(format!("project {id}"))))?;
    ensure_access(&auth, &project)?;

    let fiscal_year = fiscal_year_of(Utc::now().date_naive());
    let rows = ForecastRepository::new((*state.db).clone())
        .for_project(id, fiscal_year)
        .await?;

    let mut forecast_values = month_map();
    let mut actual_values = month_map();
    for row in &rows {
        let fact = to_fact(row);
        if let Some(slot) = forecast_values.get_mut(&fact.month) {
            *slot = row.amount;
        }
        if let Some(slot) = actual_values.get_mut(&fact.month) {
            *slot = row.actuals;
        }
    }
    let forecast_type = rows.first().map(|r| r.forecast_type.clone());

    Ok(Json(json!({
        "id": project.id,
        "source_country": project.source_country,
        "project_number": project.project_number,
        "op_ids": project.op_ids,
        "project_name": project.project_name,
        "region": project.region,
        "cluster_id": project.cluster_id,
        "manager_id": project.manager_id,
        "customer_name": project.customer_name,
        "customer_group": project.customer_group,
        "vertical": project.vertical,
        "project_type": project.project_type,
        "project_group": project.project_group,
        "execution_country": project.execution_country,
        "currency": project.currency,
        "remarks": project.remarks,
        "status": project.status,
        "forecast_type": forecast_type,
        "forecasts": forecast_values,
        "actuals": actual_values,
    })))
}

/// POST `/projects` - create with forecasts, aggregating OB duplicates.
async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateProjectInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_lines(&input.forecasts)?;

    let rates = ExchangeRateRepository::new((*state.db).clone())
        .rate_table()
        .await?;
    let repo = ProjectRepository::new((*state.db).clone());

    let outcome = repo.create(input, &rates).await?;
    info!(user = %auth.user_id(), ?outcome, "project create handled");

    let response = match outcome {
        CreateOutcome::Created(id) => json!({
            "message": "Project created successfully",
            "project_id": id,
            "aggregated": false,
        }),
        CreateOutcome::Aggregated(id) => json!({
            "message": "OB forecasts aggregated successfully",
            "project_id": id,
            "aggregated": true,
        }),
    };
    Ok(Json(response))
}

/// PUT `/projects/{id}` - field updates.
async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = ProjectRepository::new((*state.db).clone());
    let project = repo
        .find(id)
        .await?
        .ok_or_else(|| ApiError(foresight_shared::AppError::NotFound(format!("project {id}"))))?;
    ensure_access(&auth, &project)?;

    repo.update(id, input, auth.user_id()).await?;
    Ok(Json(json!({ "message": "Project updated successfully" })))
}

/// DELETE `/projects/{id}` - delete the project and its forecasts.
async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if auth.role() != foresight_shared::Role::SeniorHead {
        return Err(forbidden("Only senior heads can delete projects"));
    }

    let repo = ProjectRepository::new((*state.db).clone());
    repo.delete(id).await?;
    info!(user = %auth.user_id(), project = %id, "project deleted");
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

// ============================================================================
// Forecast edits
// ============================================================================

/// Body for replacing one fiscal year of forecasts.
#[derive(Debug, Deserialize)]
pub struct ReplaceForecastsRequest {
    /// Fiscal start year whose rows are replaced.
    pub year: i32,
    /// Replacement lines; zero amounts are skipped.
    pub forecasts: Vec<ForecastLine>,
}

/// Body for editing individual forecast cells.
#[derive(Debug, Deserialize)]
pub struct EditForecastsRequest {
    /// The edited lines.
    pub forecasts: Vec<ForecastLine>,
}

async fn load_checked_project(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<projects::Model, ApiError> {
    let project = ProjectRepository::new((*state.db).clone())
        .find(id)
        .await?
        .ok_or_else(|| ApiError(foresight_shared::AppError::NotFound(format!("project {id}"))))?;
    ensure_access(auth, &project)?;
    Ok(project)
}

/// PUT `/projects/{id}/forecasts` - replace a fiscal year's forecasts.
async fn replace_forecasts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceForecastsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_lines(&payload.forecasts)?;
    let project = load_checked_project(&state, &auth, id).await?;

    let rates = ExchangeRateRepository::new((*state.db).clone())
        .rate_table()
        .await?;
    let inserted = ForecastRepository::new((*state.db).clone())
        .replace_fiscal_year(
            id,
            payload.year,
            &payload.forecasts,
            project.currency.as_deref(),
            &rates,
            auth.user_id(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Forecasts updated successfully",
        "inserted": inserted,
    })))
}

/// PUT `/projects/{id}/forecasts/edited` - upsert individual edited cells.
async fn edit_forecasts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditForecastsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_lines(&payload.forecasts)?;
    let project = load_checked_project(&state, &auth, id).await?;

    let rates = ExchangeRateRepository::new((*state.db).clone())
        .rate_table()
        .await?;
    let touched = ForecastRepository::new((*state.db).clone())
        .upsert_edits(
            id,
            &payload.forecasts,
            project.currency.as_deref(),
            &rates,
            auth.user_id(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Edited forecasts updated successfully",
        "touched": touched,
    })))
}

// ============================================================================
// Aggregation probe
// ============================================================================

/// Query for the pre-flight aggregation probe.
#[derive(Debug, Deserialize)]
pub struct CheckOpQuery {
    /// The OP ID set being proposed.
    pub op_ids: String,
    /// The forecast type being proposed.
    pub forecast_type: String,
    /// The project number, required for OB.
    pub project_number: Option<String>,
}

/// GET `/projects/check-op-forecast` - what would this create request do?
async fn check_op_forecast(
    State(state): State<AppState>,
    Query(query): Query<CheckOpQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.op_ids.trim().is_empty() || query.forecast_type.trim().is_empty() {
        return Err(validation("op_ids and forecast_type are required"));
    }

    let repo = ProjectRepository::new((*state.db).clone());
    let check = repo
        .check_op_forecast(
            &query.op_ids,
            &query.forecast_type,
            query.project_number.as_deref(),
        )
        .await?;

    let response = match check {
        OpForecastCheck::OpIdsInUse { project_name } => json!({
            "exists": true,
            "is_new_op": false,
            "will_aggregate": false,
            "message": format!("OP ID '{}' already exists in project '{project_name}'", query.op_ids),
        }),
        OpForecastCheck::WillAggregate { project_id } => json!({
            "exists": false,
            "is_new_op": true,
            "will_aggregate": true,
            "aggregate_with_project_id": project_id,
            "message": format!(
                "Will aggregate OB forecasts with existing project number '{}'",
                query.project_number.unwrap_or_default()
            ),
        }),
        OpForecastCheck::New => json!({
            "exists": false,
            "is_new_op": true,
            "will_aggregate": false,
        }),
    };
    Ok(Json(response))
}
