//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod dashboard;
pub mod filters;
pub mod health;
pub mod imports;
pub mod projects;
pub mod rates;

/// Creates the API router with protected routes behind the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(dashboard::routes())
        .merge(filters::routes())
        .merge(imports::routes())
        .merge(projects::routes())
        .merge(rates::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}
