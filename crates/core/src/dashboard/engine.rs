//! Summary and trend aggregation.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::currency::{RateTable, USD, currency_symbol};
use crate::fiscal::{Quarter, fiscal_months, fiscal_year_for};
use crate::scope::ProjectFacts;

use super::types::{CurrencySlice, DashboardSummary, ForecastFact, SummaryParams, TrendAnalysis};

fn fy_label(fy_start_year: i32) -> String {
    format!("{}-{}", fy_start_year, fy_start_year + 1)
}

fn convert_usd(rates: &RateTable, display_currency: &str, usd: Decimal) -> Decimal {
    if display_currency == USD {
        usd
    } else {
        rates.from_usd(usd, display_currency)
    }
}

/// Computes the dashboard summary for an already-filtered project set.
///
/// `forecasts` must already be restricted to the selected fiscal year (and
/// quarter, when one is selected); rows outside the displayed months are
/// ignored defensively.
#[must_use]
pub fn summarize(
    projects: &[ProjectFacts],
    forecasts: &[ForecastFact],
    rates: &RateTable,
    cluster_names: &HashMap<Uuid, String>,
    params: &SummaryParams,
) -> DashboardSummary {
    let display = params.display_currency.as_str();
    let display_months: Vec<u32> = params
        .quarter
        .map_or_else(|| fiscal_months().to_vec(), |q| q.months().to_vec());

    let mut forecast_by_month: BTreeMap<u32, Decimal> =
        display_months.iter().map(|m| (*m, Decimal::ZERO)).collect();
    let mut actual_by_month = forecast_by_month.clone();

    let mut fy_years_forecast: BTreeMap<i32, Decimal> = params
        .fy_seed_years
        .iter()
        .map(|fy| (*fy, Decimal::ZERO))
        .collect();
    let mut fy_years_actual = fy_years_forecast.clone();

    let project_map: HashMap<Uuid, &ProjectFacts> = projects.iter().map(|p| (p.id, p)).collect();

    let mut total_forecast = Decimal::ZERO;
    let mut total_actual = Decimal::ZERO;
    let mut region_forecast: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut vertical_forecast: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut currency_forecast: BTreeMap<String, Decimal> = BTreeMap::new();

    for fact in forecasts {
        if !forecast_by_month.contains_key(&fact.month) {
            continue;
        }

        let converted = convert_usd(rates, display, fact.forecast_usd);
        let actual_converted = convert_usd(rates, display, fact.actuals);

        *forecast_by_month.entry(fact.month).or_default() += converted;
        *actual_by_month.entry(fact.month).or_default() += actual_converted;
        total_actual += actual_converted;

        // Blended policy: actuals supersede forecast once reconciled.
        if fact.actuals.is_zero() {
            total_forecast += converted;
        } else {
            total_forecast += actual_converted;
        }

        let fy = fiscal_year_for(fact.year, fact.month);
        *fy_years_forecast.entry(fy).or_default() += converted;
        *fy_years_actual.entry(fy).or_default() += actual_converted;

        let Some(project) = project_map.get(&fact.project_id) else {
            continue;
        };
        if !project.region.is_empty() {
            *region_forecast.entry(project.region.clone()).or_default() += converted;
        }
        if let Some(vertical) = &project.vertical {
            *vertical_forecast.entry(vertical.clone()).or_default() += converted;
        }
        if let Some(currency) = &project.currency {
            *currency_forecast.entry(currency.clone()).or_default() += converted;
        }
    }

    let fa_variance_by_month: BTreeMap<u32, Decimal> = display_months
        .iter()
        .map(|month| {
            let forecast = forecast_by_month.get(month).copied().unwrap_or_default();
            let actual = actual_by_month.get(month).copied().unwrap_or_default();
            (*month, actual - forecast)
        })
        .collect();

    let quarters: &[Quarter] = match params.quarter {
        Some(ref q) => std::slice::from_ref(q),
        None => &Quarter::ALL,
    };
    let sum_months = |buckets: &BTreeMap<u32, Decimal>, quarter: Quarter| -> Decimal {
        quarter
            .months()
            .iter()
            .filter_map(|m| buckets.get(m))
            .copied()
            .sum()
    };
    let forecast_by_quarter: BTreeMap<String, Decimal> = quarters
        .iter()
        .map(|q| (q.to_string(), sum_months(&forecast_by_month, *q)))
        .collect();
    let actual_by_quarter: BTreeMap<String, Decimal> = quarters
        .iter()
        .map(|q| (q.to_string(), sum_months(&actual_by_month, *q)))
        .collect();

    let mut projects_by_region: BTreeMap<String, usize> = BTreeMap::new();
    let mut projects_by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut projects_by_vertical: BTreeMap<String, usize> = BTreeMap::new();
    let mut projects_by_cluster: BTreeMap<String, usize> = BTreeMap::new();
    let mut projects_by_currency: BTreeMap<String, usize> = BTreeMap::new();

    for project in projects {
        if !project.region.is_empty() {
            *projects_by_region.entry(project.region.clone()).or_default() += 1;
        }
        if let Some(status) = &project.status {
            *projects_by_status.entry(status.clone()).or_default() += 1;
        }
        if let Some(vertical) = &project.vertical {
            *projects_by_vertical.entry(vertical.clone()).or_default() += 1;
        }
        if let Some(currency) = &project.currency {
            *projects_by_currency.entry(currency.clone()).or_default() += 1;
        }
        if let Some(cluster_id) = project.cluster_id {
            let head = cluster_names
                .get(&cluster_id)
                .map_or("Unknown", String::as_str);
            *projects_by_cluster
                .entry(format!("Cluster - {head}"))
                .or_default() += 1;
        }
    }

    let currency_breakdown: BTreeMap<String, CurrencySlice> = projects_by_currency
        .iter()
        .map(|(currency, count)| {
            let total = currency_forecast
                .get(currency)
                .copied()
                .unwrap_or_default();
            (
                currency.clone(),
                CurrencySlice {
                    project_count: *count,
                    total_forecast: total,
                },
            )
        })
        .collect();

    DashboardSummary {
        financial_year: fy_label(params.fiscal_year),
        display_currency: display.to_string(),
        currency_symbol: currency_symbol(display).to_string(),
        total_projects: projects.len(),
        total_forecast_amount: total_forecast,
        total_actual_amount: total_actual,
        forecast_by_month,
        actual_by_month,
        fa_variance_by_month,
        forecast_by_quarter,
        actual_by_quarter,
        fy_years_forecast,
        fy_years_actual,
        projects_by_region,
        projects_by_status,
        projects_by_vertical,
        projects_by_cluster,
        projects_by_currency,
        currency_breakdown,
        region_forecast,
        vertical_forecast,
    }
}

/// Compares forecast totals across the current and previous fiscal years.
#[must_use]
pub fn trends(
    current: &[ForecastFact],
    previous: &[ForecastFact],
    rates: &RateTable,
    current_fy: i32,
    display_currency: &str,
    quarter: Option<Quarter>,
) -> TrendAnalysis {
    let total = |rows: &[ForecastFact]| -> Decimal {
        rows.iter()
            .map(|f| convert_usd(rates, display_currency, f.forecast_usd))
            .sum()
    };

    let current_total = total(current);
    let previous_total = total(previous);

    let growth_rate = if previous_total > Decimal::ZERO {
        ((current_total - previous_total) / previous_total * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let suffix = quarter.map(|q| format!(" ({q})")).unwrap_or_default();

    TrendAnalysis {
        current_fy_total: current_total,
        previous_fy_total: previous_total,
        growth_rate,
        current_fy: format!("{}{suffix}", fy_label(current_fy)),
        previous_fy: format!("{}{suffix}", fy_label(current_fy - 1)),
        display_currency: display_currency.to_string(),
        currency_symbol: currency_symbol(display_currency).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn facts(id: Uuid, currency: &str) -> ProjectFacts {
        ProjectFacts {
            id,
            project_number: Some("P1".to_string()),
            region: "EU".to_string(),
            status: Some("active".to_string()),
            vertical: Some("Automotive".to_string()),
            customer_group: None,
            customer_name: None,
            currency: Some(currency.to_string()),
            cluster_id: None,
            manager_id: None,
        }
    }

    fn row(project_id: Uuid, year: i32, month: u32, forecast_usd: Decimal, actuals: Decimal) -> ForecastFact {
        ForecastFact {
            project_id,
            year,
            month,
            forecast_usd,
            actuals,
        }
    }

    fn params(fy: i32, quarter: Option<Quarter>, currency: &str) -> SummaryParams {
        SummaryParams {
            fiscal_year: fy,
            quarter,
            display_currency: currency.to_string(),
            fy_seed_years: vec![],
        }
    }

    /// OB forecast Apr-2025 of 100 USD: the summary totals 100; once actuals
    /// of 150 land, the blended total becomes 150 and April's variance 50.
    #[test]
    fn test_actuals_supersede_forecast() {
        let project_id = Uuid::new_v4();
        let projects = vec![facts(project_id, "USD")];
        let rates = RateTable::new();
        let p = params(2025, None, "USD");

        let before = summarize(
            &projects,
            &[row(project_id, 2025, 4, dec!(100), dec!(0))],
            &rates,
            &HashMap::new(),
            &p,
        );
        assert_eq!(before.financial_year, "2025-2026");
        assert_eq!(before.total_forecast_amount, dec!(100));
        assert_eq!(before.total_actual_amount, dec!(0));

        let after = summarize(
            &projects,
            &[row(project_id, 2025, 4, dec!(100), dec!(150))],
            &rates,
            &HashMap::new(),
            &p,
        );
        assert_eq!(after.total_forecast_amount, dec!(150));
        assert_eq!(after.total_actual_amount, dec!(150));
        assert_eq!(after.fa_variance_by_month[&4], dec!(50));
    }

    #[test]
    fn test_display_currency_conversion() {
        let project_id = Uuid::new_v4();
        let projects = vec![facts(project_id, "USD")];
        // 1 INR = 0.0125 USD, so 100 USD displays as 8000 INR
        let rates = RateTable::from_rates([("INR".to_string(), dec!(0.0125))]);

        let summary = summarize(
            &projects,
            &[row(project_id, 2025, 4, dec!(100), dec!(0))],
            &rates,
            &HashMap::new(),
            &params(2025, None, "INR"),
        );
        assert_eq!(summary.total_forecast_amount, dec!(8000));
        assert_eq!(summary.currency_symbol, "\u{20b9}");
    }

    #[test]
    fn test_quarter_rollups_sum_their_months() {
        let project_id = Uuid::new_v4();
        let projects = vec![facts(project_id, "USD")];
        let rates = RateTable::new();

        let summary = summarize(
            &projects,
            &[
                row(project_id, 2025, 4, dec!(10), dec!(0)),
                row(project_id, 2025, 5, dec!(20), dec!(0)),
                row(project_id, 2025, 7, dec!(40), dec!(0)),
                // Jan 2026 belongs to Q4 of FY 2025
                row(project_id, 2026, 1, dec!(80), dec!(0)),
            ],
            &rates,
            &HashMap::new(),
            &params(2025, None, "USD"),
        );

        assert_eq!(summary.forecast_by_quarter["Q1"], dec!(30));
        assert_eq!(summary.forecast_by_quarter["Q2"], dec!(40));
        assert_eq!(summary.forecast_by_quarter["Q3"], dec!(0));
        assert_eq!(summary.forecast_by_quarter["Q4"], dec!(80));
    }

    #[test]
    fn test_quarter_filter_restricts_months() {
        let project_id = Uuid::new_v4();
        let projects = vec![facts(project_id, "USD")];
        let rates = RateTable::new();

        let summary = summarize(
            &projects,
            &[
                row(project_id, 2025, 4, dec!(10), dec!(0)),
                row(project_id, 2025, 7, dec!(40), dec!(0)),
            ],
            &rates,
            &HashMap::new(),
            &params(2025, Some(Quarter::Q1), "USD"),
        );

        // Only Q1 months are displayed; the July row is ignored
        assert_eq!(summary.total_forecast_amount, dec!(10));
        assert_eq!(summary.forecast_by_quarter.len(), 1);
        assert_eq!(summary.forecast_by_quarter["Q1"], dec!(10));
        assert!(!summary.forecast_by_month.contains_key(&7));
    }

    #[test]
    fn test_fy_years_keyed_by_fiscal_start_year() {
        let project_id = Uuid::new_v4();
        let projects = vec![facts(project_id, "USD")];
        let rates = RateTable::new();

        let summary = summarize(
            &projects,
            &[
                row(project_id, 2025, 4, dec!(10), dec!(0)),
                // Feb 2026 is still fiscal year 2025
                row(project_id, 2026, 2, dec!(5), dec!(0)),
            ],
            &rates,
            &HashMap::new(),
            &params(2025, None, "USD"),
        );

        assert_eq!(summary.fy_years_forecast[&2025], dec!(15));
        assert_eq!(summary.fy_years_forecast.len(), 1);
    }

    #[test]
    fn test_fy_seed_years_zero_filled() {
        let summary = summarize(
            &[],
            &[],
            &RateTable::new(),
            &HashMap::new(),
            &SummaryParams {
                fiscal_year: 2025,
                quarter: None,
                display_currency: "USD".to_string(),
                fy_seed_years: vec![2024, 2025],
            },
        );
        assert_eq!(summary.fy_years_forecast[&2024], dec!(0));
        assert_eq!(summary.fy_years_forecast[&2025], dec!(0));
    }

    #[test]
    fn test_breakdowns() {
        let cluster_id = Uuid::new_v4();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let mut project_one = facts(p1, "USD");
        project_one.cluster_id = Some(cluster_id);
        let mut project_two = facts(p2, "EUR");
        project_two.region = "NA".to_string();
        project_two.vertical = Some("Aerospace".to_string());

        let cluster_names: HashMap<Uuid, String> =
            [(cluster_id, "North".to_string())].into_iter().collect();
        let rates = RateTable::new();

        let summary = summarize(
            &[project_one, project_two],
            &[
                row(p1, 2025, 4, dec!(100), dec!(0)),
                row(p2, 2025, 5, dec!(50), dec!(0)),
            ],
            &rates,
            &cluster_names,
            &params(2025, None, "USD"),
        );

        assert_eq!(summary.total_projects, 2);
        assert_eq!(summary.projects_by_region["EU"], 1);
        assert_eq!(summary.projects_by_region["NA"], 1);
        assert_eq!(summary.projects_by_cluster["Cluster - North"], 1);
        assert_eq!(summary.region_forecast["EU"], dec!(100));
        assert_eq!(summary.region_forecast["NA"], dec!(50));
        assert_eq!(summary.vertical_forecast["Automotive"], dec!(100));
        assert_eq!(
            summary.currency_breakdown["USD"],
            CurrencySlice {
                project_count: 1,
                total_forecast: dec!(100),
            }
        );
        assert_eq!(
            summary.currency_breakdown["EUR"],
            CurrencySlice {
                project_count: 1,
                total_forecast: dec!(50),
            }
        );
    }

    #[test]
    fn test_forecast_for_unknown_project_still_totals() {
        // A forecast whose project fell out of the filtered set still counts
        // toward month totals, but not toward breakdowns.
        let summary = summarize(
            &[],
            &[row(Uuid::new_v4(), 2025, 4, dec!(100), dec!(0))],
            &RateTable::new(),
            &HashMap::new(),
            &params(2025, None, "USD"),
        );
        assert_eq!(summary.total_forecast_amount, dec!(100));
        assert!(summary.region_forecast.is_empty());
    }

    #[test]
    fn test_trends_growth_rate() {
        let id = Uuid::new_v4();
        let rates = RateTable::new();
        let current = vec![row(id, 2025, 4, dec!(150), dec!(0))];
        let previous = vec![row(id, 2024, 4, dec!(100), dec!(0))];

        let analysis = trends(&current, &previous, &rates, 2025, "USD", None);
        assert_eq!(analysis.current_fy_total, dec!(150));
        assert_eq!(analysis.previous_fy_total, dec!(100));
        assert_eq!(analysis.growth_rate, dec!(50.00));
        assert_eq!(analysis.current_fy, "2025-2026");
        assert_eq!(analysis.previous_fy, "2024-2025");
    }

    #[test]
    fn test_trends_zero_previous_guarded() {
        let analysis = trends(&[], &[], &RateTable::new(), 2025, "USD", Some(Quarter::Q2));
        assert_eq!(analysis.growth_rate, dec!(0));
        assert_eq!(analysis.current_fy, "2025-2026 (Q2)");
    }
}
