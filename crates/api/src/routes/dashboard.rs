//! Dashboard reporting routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use foresight_core::dashboard::{DashboardSummary, TrendAnalysis};
use foresight_core::fiscal::Quarter;
use foresight_core::scope::{IdFilter, ProjectFilters, sentinel};
use foresight_db::repositories::dashboard::{DashboardRepository, SummaryRequest};

use crate::error::{ApiError, validation};
use crate::{AppState, middleware::AuthUser};

const DEFAULT_DISPLAY_CURRENCY: &str = "INR";

/// Creates the dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/summary", get(summary))
        .route("/dashboard/trends", get(trends))
}

/// Query parameters for the dashboard summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Exact project number, or `all`.
    pub project_number: Option<String>,
    /// Region code, or `all`.
    pub region: Option<String>,
    /// Status label, or `all`.
    pub status: Option<String>,
    /// Cluster id, or `all`.
    pub cluster: Option<String>,
    /// Manager id, or `all`.
    pub manager: Option<String>,
    /// Vertical, or `all`.
    pub vertical: Option<String>,
    /// Forecast type, or `all`.
    pub forecast_type: Option<String>,
    /// Project currency, or `all`.
    pub currency: Option<String>,
    /// Currency the payload is shaped in.
    pub display_currency: Option<String>,
    /// Fiscal start year.
    pub year: Option<i32>,
    /// `Q1`..`Q4`, or `all`.
    pub quarter: Option<String>,
    /// Customer group, or `all`.
    pub customer_group: Option<String>,
}

/// Dashboard summary payload plus the caller's role.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// The caller's role code.
    pub role: String,
    /// The aggregated summary.
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

fn parse_quarter(raw: Option<&str>) -> Result<Option<Quarter>, ApiError> {
    match sentinel(raw) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| validation(format!("unknown quarter '{value}'"))),
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    sentinel(value).map(str::to_owned)
}

impl SummaryQuery {
    fn into_request(self) -> Result<SummaryRequest, ApiError> {
        let quarter = parse_quarter(self.quarter.as_deref())?;
        Ok(SummaryRequest {
            filters: ProjectFilters {
                project_number: owned(self.project_number.as_deref()),
                region: owned(self.region.as_deref()),
                status: owned(self.status.as_deref()),
                vertical: owned(self.vertical.as_deref()),
                customer_group: owned(self.customer_group.as_deref()),
                customer_name: None,
                currency: owned(self.currency.as_deref()),
                cluster: IdFilter::parse(self.cluster.as_deref()),
                manager: IdFilter::parse(self.manager.as_deref()),
            },
            forecast_type: owned(self.forecast_type.as_deref()),
            display_currency: self
                .display_currency
                .unwrap_or_else(|| DEFAULT_DISPLAY_CURRENCY.to_string()),
            year: self.year,
            quarter,
        })
    }
}

/// GET `/dashboard/summary` - month/quarter/year rollups and breakdowns.
async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let request = query.into_request()?;
    let repo = DashboardRepository::new((*state.db).clone());
    let summary = repo.summary(auth.scope(), &request).await?;

    Ok(Json(SummaryResponse {
        role: auth.role().as_str().to_string(),
        summary,
    }))
}

/// Query parameters for the trend comparison.
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// Currency the totals are shaped in.
    pub display_currency: Option<String>,
    /// `Q1`..`Q4`, or `all`.
    pub quarter: Option<String>,
}

/// GET `/dashboard/trends` - current vs previous fiscal year totals.
async fn trends(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendAnalysis>, ApiError> {
    let quarter = parse_quarter(query.quarter.as_deref())?;
    let display_currency = query
        .display_currency
        .unwrap_or_else(|| DEFAULT_DISPLAY_CURRENCY.to_string());

    let repo = DashboardRepository::new((*state.db).clone());
    let analysis = repo
        .trends(auth.scope(), &display_currency, quarter)
        .await?;

    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quarter_sentinel() {
        assert_eq!(parse_quarter(None).unwrap(), None);
        assert_eq!(parse_quarter(Some("all")).unwrap(), None);
        assert_eq!(parse_quarter(Some("Q3")).unwrap(), Some(Quarter::Q3));
        assert!(parse_quarter(Some("Q5")).is_err());
    }

    #[test]
    fn test_into_request_defaults() {
        let request = SummaryQuery::default().into_request().unwrap();
        assert_eq!(request.display_currency, "INR");
        assert_eq!(request.year, None);
        assert_eq!(request.quarter, None);
    }

    #[test]
    fn test_into_request_all_sentinels_are_noops() {
        let query = SummaryQuery {
            region: Some("all".to_string()),
            cluster: Some("all".to_string()),
            forecast_type: Some("all".to_string()),
            ..Default::default()
        };
        let request = query.into_request().unwrap();
        assert_eq!(request.filters.region, None);
        assert_eq!(request.filters.cluster, IdFilter::Any);
        assert_eq!(request.forecast_type, None);
    }
}
