//! Exchange rate routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use foresight_db::repositories::exchange_rate::{ExchangeRateRepository, RateUpdate};
use foresight_shared::Role;

use crate::error::{ApiError, forbidden, validation};
use crate::{AppState, middleware::AuthUser};

/// Creates the exchange rate routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exchange-rates", get(list_rates))
        .route("/currency-rates", get(list_rates_privileged))
        .route("/currency-rates", put(update_rates))
}

/// One stored rate in a response.
#[derive(Debug, Serialize)]
pub struct RateRow {
    /// ISO currency code.
    pub currency_code: String,
    /// Units of USD per unit of this currency.
    pub rate_to_usd: Decimal,
    /// When the rate was last written.
    pub last_updated: DateTime<Utc>,
}

/// Body of a bulk rate update.
#[derive(Debug, Deserialize)]
pub struct RatesUpdateRequest {
    /// The (currency, rate) pairs to apply.
    pub rates: Vec<RateUpdate>,
}

async fn fetch_rates(state: &AppState) -> Result<Vec<RateRow>, ApiError> {
    let repo = ExchangeRateRepository::new((*state.db).clone());
    let rates = repo.list().await?;
    Ok(rates
        .into_iter()
        .map(|r| RateRow {
            currency_code: r.currency_code,
            rate_to_usd: r.rate_to_usd,
            last_updated: r.last_updated.into(),
        })
        .collect())
}

/// GET `/exchange-rates` - current rates, any authenticated caller.
async fn list_rates(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let rates = fetch_rates(&state).await?;
    Ok(Json(json!({ "rates": rates })))
}

/// GET `/currency-rates` - rate administration view, senior heads only.
async fn list_rates_privileged(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RateRow>>, ApiError> {
    require_senior_head(&auth)?;
    let rates = fetch_rates(&state).await?;
    Ok(Json(rates))
}

/// PUT `/currency-rates` - atomic bulk upsert, senior heads only.
async fn update_rates(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<RatesUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_senior_head(&auth)?;
    if payload.rates.is_empty() {
        return Err(validation("rates must not be empty"));
    }

    let repo = ExchangeRateRepository::new((*state.db).clone());
    let applied = repo.set_rates(&payload.rates).await?;
    info!(applied, user = %auth.user_id(), "currency rates updated");

    Ok(Json(json!({
        "message": "Currency rates updated successfully",
        "applied": applied,
    })))
}

fn require_senior_head(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.role() == Role::SeniorHead {
        Ok(())
    } else {
        Err(forbidden(
            "Only senior heads can access currency rate administration",
        ))
    }
}
