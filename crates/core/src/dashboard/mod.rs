//! The aggregation engine behind the reporting endpoints.
//!
//! Pure fold over role-scoped projects and their fiscal-year forecasts.
//! Amounts come in as frozen USD snapshots and leave in the display currency.

pub mod engine;
pub mod types;

pub use engine::{summarize, trends};
pub use types::{
    CurrencySlice, DashboardSummary, ForecastFact, SummaryParams, TrendAnalysis,
};
