//! Dashboard aggregation types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::fiscal::Quarter;

/// One persisted forecast row, reduced to what aggregation needs.
#[derive(Debug, Clone)]
pub struct ForecastFact {
    /// Owning project.
    pub project_id: Uuid,
    /// Absolute calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Frozen USD snapshot taken when the forecast was written.
    pub forecast_usd: Decimal,
    /// Reconciled actual amount (USD snapshot basis), 0 when absent.
    pub actuals: Decimal,
}

/// Parameters for a summary computation.
#[derive(Debug, Clone)]
pub struct SummaryParams {
    /// Fiscal start year being reported.
    pub fiscal_year: i32,
    /// Optional quarter restriction.
    pub quarter: Option<Quarter>,
    /// Currency the payload is shaped in.
    pub display_currency: String,
    /// Fiscal years to pre-seed the per-year maps with (zero-filled), so
    /// years known to the system appear even without rows in range.
    pub fy_seed_years: Vec<i32>,
}

/// Per-currency slice of the filtered project set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencySlice {
    /// Projects carrying this currency.
    pub project_count: usize,
    /// Forecast total in the display currency.
    pub total_forecast: Decimal,
}

/// Aggregated dashboard payload for one fiscal year.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Label of the selected fiscal year, e.g. `"2025-2026"`.
    pub financial_year: String,
    /// Currency the amounts are shaped in.
    pub display_currency: String,
    /// Symbol for the display currency.
    pub currency_symbol: String,
    /// Number of projects after role scoping and filters.
    pub total_projects: usize,
    /// Blended total: actuals supersede forecast wherever actuals are
    /// non-zero.
    pub total_forecast_amount: Decimal,
    /// Total of reconciled actuals.
    pub total_actual_amount: Decimal,
    /// Forecast totals keyed by calendar month.
    pub forecast_by_month: BTreeMap<u32, Decimal>,
    /// Actual totals keyed by calendar month.
    pub actual_by_month: BTreeMap<u32, Decimal>,
    /// Per-month variance: actual minus forecast.
    pub fa_variance_by_month: BTreeMap<u32, Decimal>,
    /// Forecast totals per quarter.
    pub forecast_by_quarter: BTreeMap<String, Decimal>,
    /// Actual totals per quarter.
    pub actual_by_quarter: BTreeMap<String, Decimal>,
    /// Forecast totals keyed by fiscal start year.
    pub fy_years_forecast: BTreeMap<i32, Decimal>,
    /// Actual totals keyed by fiscal start year.
    pub fy_years_actual: BTreeMap<i32, Decimal>,
    /// Project counts by region.
    pub projects_by_region: BTreeMap<String, usize>,
    /// Project counts by status.
    pub projects_by_status: BTreeMap<String, usize>,
    /// Project counts by vertical.
    pub projects_by_vertical: BTreeMap<String, usize>,
    /// Project counts by cluster display name.
    pub projects_by_cluster: BTreeMap<String, usize>,
    /// Project counts by project currency.
    pub projects_by_currency: BTreeMap<String, usize>,
    /// Count and forecast total per project currency.
    pub currency_breakdown: BTreeMap<String, CurrencySlice>,
    /// Forecast totals by region.
    pub region_forecast: BTreeMap<String, Decimal>,
    /// Forecast totals by vertical.
    pub vertical_forecast: BTreeMap<String, Decimal>,
}

/// Current-vs-previous fiscal year comparison.
#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    /// Forecast total for the current fiscal year.
    pub current_fy_total: Decimal,
    /// Forecast total for the previous fiscal year.
    pub previous_fy_total: Decimal,
    /// Growth in percent, 0 when the previous total is not positive.
    pub growth_rate: Decimal,
    /// Label of the current fiscal year.
    pub current_fy: String,
    /// Label of the previous fiscal year.
    pub previous_fy: String,
    /// Currency the totals are shaped in.
    pub display_currency: String,
    /// Symbol for the display currency.
    pub currency_symbol: String,
}
