//! Import merge rules and run reports.
//!
//! The database-facing reconciliation lives in the db crate; the merge rules
//! and report shapes are pure and live here so they can be tested without a
//! database.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;

/// The forecast type that participates in additive aggregation.
///
/// Only OB forecasts merge additively when a project number is shared across
/// OP IDs; every other type inserts or overwrites.
pub const OB_FORECAST: &str = "OB";

/// Merges two comma-joined OP ID sets: union, deduplicated, sorted.
#[must_use]
pub fn merge_op_ids(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    for list in [existing, incoming].into_iter().flatten() {
        ids.extend(list.split(',').map(str::trim).filter(|id| !id.is_empty()));
    }
    if ids.is_empty() {
        None
    } else {
        Some(ids.into_iter().collect::<Vec<_>>().join(","))
    }
}

/// How one incoming amount lands on a project's forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastAction {
    /// Add into the existing OB row, native amount and USD snapshot both.
    Accumulate {
        /// New native-currency amount.
        amount: Decimal,
        /// New USD snapshot.
        forecast_usd: Decimal,
    },
    /// Overwrite the existing non-OB row.
    Overwrite {
        /// Replacement native-currency amount.
        amount: Decimal,
        /// Replacement USD snapshot.
        forecast_usd: Decimal,
    },
    /// Insert a new row.
    Insert {
        /// Native-currency amount.
        amount: Decimal,
        /// USD snapshot.
        forecast_usd: Decimal,
    },
}

/// Decides how an incoming amount reconciles with an existing row at the
/// same (project, year, month, type).
///
/// `existing` carries the current (amount, forecast_usd) when a row exists.
/// Only OB aggregates additively; every other type inserts or overwrites.
#[must_use]
pub fn reconcile_amount(
    forecast_type: &str,
    existing: Option<(Decimal, Decimal)>,
    incoming_amount: Decimal,
    incoming_usd: Decimal,
) -> ForecastAction {
    match existing {
        Some((amount, forecast_usd)) if forecast_type == OB_FORECAST => {
            ForecastAction::Accumulate {
                amount: amount + incoming_amount,
                forecast_usd: forecast_usd + incoming_usd,
            }
        }
        Some(_) => ForecastAction::Overwrite {
            amount: incoming_amount,
            forecast_usd: incoming_usd,
        },
        None => ForecastAction::Insert {
            amount: incoming_amount,
            forecast_usd: incoming_usd,
        },
    }
}

/// Appends remarks with a pipe separator, skipping blanks.
#[must_use]
pub fn append_remarks(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    fn clean(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }
    match (clean(existing), clean(incoming)) {
        (Some(old), Some(new)) => Some(format!("{old} | {new}")),
        (Some(old), None) => Some(old.to_string()),
        (None, Some(new)) => Some(new.to_string()),
        (None, None) => None,
    }
}

/// Outcome counters for a full workbook import run.
///
/// Per-row failures never abort the run; they are counted here and reported
/// at the end.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportSummary {
    /// Rows read from the sheet.
    pub rows_processed: usize,
    /// Rows skipped for missing identifier or name.
    pub rows_skipped: usize,
    /// Rows lost to a failed batch.
    pub rows_failed: usize,
    /// New project rows inserted.
    pub projects_created: usize,
    /// Rows merged into an existing project number.
    pub projects_aggregated: usize,
    /// New forecast rows inserted.
    pub forecasts_created: usize,
    /// OB forecast rows additively merged.
    pub forecasts_merged: usize,
    /// Users created on demand for managers and cluster heads.
    pub users_created: usize,
}

impl ImportSummary {
    /// Folds a committed batch's counters into the run totals.
    pub fn absorb(&mut self, batch: &Self) {
        self.rows_processed += batch.rows_processed;
        self.rows_skipped += batch.rows_skipped;
        self.rows_failed += batch.rows_failed;
        self.projects_created += batch.projects_created;
        self.projects_aggregated += batch.projects_aggregated;
        self.forecasts_created += batch.forecasts_created;
        self.forecasts_merged += batch.forecasts_merged;
        self.users_created += batch.users_created;
    }
}

/// Report for an actuals-only import run.
///
/// Actuals imports never create projects or forecast rows; everything that
/// could not land is accumulated here instead of aborting the batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ActualsReport {
    /// Forecast rows whose actuals were overwritten.
    pub forecasts_updated: usize,
    /// Project numbers that matched a project.
    pub projects_matched: BTreeSet<String>,
    /// Project numbers with no matching project; their rows were skipped.
    pub projects_not_found: BTreeSet<String>,
    /// Parsed values with no OB forecast at (project, year, month).
    pub unmatched: Vec<UnmatchedActual>,
}

/// An actual value that had no forecast row to land on.
#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedActual {
    /// Project number from the sheet.
    pub project_number: String,
    /// Calendar year of the column.
    pub year: i32,
    /// Calendar month of the column.
    pub month: u32,
    /// The cleaned amount that was dropped.
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_op_ids_union_sorted_dedup() {
        let merged = merge_op_ids(Some("OP-3,OP-1"), Some("OP-2,OP-1"));
        assert_eq!(merged.as_deref(), Some("OP-1,OP-2,OP-3"));
    }

    #[test]
    fn test_merge_op_ids_handles_blanks() {
        assert_eq!(
            merge_op_ids(Some(" OP-1 , "), None).as_deref(),
            Some("OP-1")
        );
        assert_eq!(merge_op_ids(None, None), None);
        assert_eq!(merge_op_ids(Some(""), Some("")), None);
    }

    #[test]
    fn test_merge_op_ids_idempotent() {
        let once = merge_op_ids(Some("OP-1"), Some("OP-2"));
        let twice = merge_op_ids(once.as_deref(), Some("OP-2"));
        assert_eq!(once, twice);
    }

    /// Two OB lines for the same (year, month) end up in one row carrying
    /// the sum of both amounts and both USD snapshots.
    #[test]
    fn test_ob_amounts_accumulate() {
        use rust_decimal_macros::dec;

        let first = reconcile_amount(OB_FORECAST, None, dec!(100), dec!(110));
        assert_eq!(
            first,
            ForecastAction::Insert {
                amount: dec!(100),
                forecast_usd: dec!(110),
            }
        );

        let second = reconcile_amount(
            OB_FORECAST,
            Some((dec!(100), dec!(110))),
            dec!(50),
            dec!(55),
        );
        assert_eq!(
            second,
            ForecastAction::Accumulate {
                amount: dec!(150),
                forecast_usd: dec!(165),
            }
        );
    }

    #[test]
    fn test_non_ob_overwrites_never_adds() {
        use rust_decimal_macros::dec;

        let action = reconcile_amount("PO", Some((dec!(100), dec!(110))), dec!(40), dec!(44));
        assert_eq!(
            action,
            ForecastAction::Overwrite {
                amount: dec!(40),
                forecast_usd: dec!(44),
            }
        );
    }

    #[test]
    fn test_append_remarks() {
        assert_eq!(
            append_remarks(Some("old"), Some("new")).as_deref(),
            Some("old | new")
        );
        assert_eq!(append_remarks(None, Some("new")).as_deref(), Some("new"));
        assert_eq!(append_remarks(Some("old"), None).as_deref(), Some("old"));
        assert_eq!(append_remarks(Some("  "), None), None);
    }

    #[test]
    fn test_summary_absorb() {
        let mut total = ImportSummary::default();
        let batch = ImportSummary {
            rows_processed: 5,
            projects_created: 2,
            forecasts_created: 10,
            ..Default::default()
        };
        total.absorb(&batch);
        total.absorb(&batch);
        assert_eq!(total.rows_processed, 10);
        assert_eq!(total.projects_created, 4);
        assert_eq!(total.forecasts_created, 20);
    }
}
