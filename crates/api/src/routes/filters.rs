//! Filter option routes.

use axum::{Json, Router, extract::State, routing::get};

use foresight_db::repositories::dashboard::{DashboardRepository, FilterOptions};

use crate::error::ApiError;
use crate::{AppState, middleware::AuthUser};

/// Creates the filter routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/filters", get(filter_options))
}

/// GET `/filters` - distinct filter options for the caller's visible set.
async fn filter_options(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FilterOptions>, ApiError> {
    let repo = DashboardRepository::new((*state.db).clone());
    let options = repo
        .filter_options(
            auth.scope(),
            auth.role(),
            auth.user_id(),
            auth.cluster_id(),
        )
        .await?;
    Ok(Json(options))
}
