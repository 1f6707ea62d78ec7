//! Fiscal year and quarter math.
//!
//! The financial year runs April through March: "fiscal year 2025" starts
//! on 1 Apr 2025 and ends 31 Mar 2026. A forecast row (year, month) belongs
//! to fiscal year `year` when `month >= 4`, else to `year - 1`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// First month of the financial year (April).
pub const FISCAL_START_MONTH: u32 = 4;

/// Returns the fiscal start year containing a calendar date.
#[must_use]
pub fn fiscal_year_of(date: NaiveDate) -> i32 {
    fiscal_year_for(date.year(), date.month())
}

/// Returns the fiscal start year for a (calendar year, month) pair.
#[must_use]
pub const fn fiscal_year_for(year: i32, month: u32) -> i32 {
    if month < FISCAL_START_MONTH {
        year - 1
    } else {
        year
    }
}

/// Returns the first and last day of a fiscal year.
#[must_use]
pub fn fiscal_year_bounds(fy_start_year: i32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(fy_start_year, 4, 1).expect("Apr 1 is always valid");
    let end = NaiveDate::from_ymd_opt(fy_start_year + 1, 3, 31).expect("Mar 31 is always valid");
    (start, end)
}

/// Months in fiscal order: April through December, then January through March.
#[must_use]
pub const fn fiscal_months() -> [u32; 12] {
    [4, 5, 6, 7, 8, 9, 10, 11, 12, 1, 2, 3]
}

/// Quarter of the financial year.
///
/// Q4 covers January-March, which fall in the *following* calendar year
/// within the same fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quarter {
    /// April - June.
    Q1,
    /// July - September.
    Q2,
    /// October - December.
    Q3,
    /// January - March of the following calendar year.
    Q4,
}

impl Quarter {
    /// All quarters in fiscal order.
    pub const ALL: [Self; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// Calendar months covered by this quarter.
    #[must_use]
    pub const fn months(self) -> [u32; 3] {
        match self {
            Self::Q1 => [4, 5, 6],
            Self::Q2 => [7, 8, 9],
            Self::Q3 => [10, 11, 12],
            Self::Q4 => [1, 2, 3],
        }
    }

    /// Returns the quarter containing a calendar month, or `None` for
    /// months outside 1..=12.
    #[must_use]
    pub const fn of_month(month: u32) -> Option<Self> {
        match month {
            4..=6 => Some(Self::Q1),
            7..=9 => Some(Self::Q2),
            10..=12 => Some(Self::Q3),
            1..=3 => Some(Self::Q4),
            _ => None,
        }
    }

    /// Returns the label used in query parameters and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Quarter {
    type Err = UnknownQuarter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            other => Err(UnknownQuarter(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown quarter label.
#[derive(Debug, thiserror::Error)]
#[error("unknown quarter: {0}")]
pub struct UnknownQuarter(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_fiscal_year_for_row() {
        // Apr 2025 onwards belongs to FY 2025
        assert_eq!(fiscal_year_for(2025, 4), 2025);
        assert_eq!(fiscal_year_for(2025, 12), 2025);
        // Jan-Mar 2026 still belongs to FY 2025
        assert_eq!(fiscal_year_for(2026, 1), 2025);
        assert_eq!(fiscal_year_for(2026, 3), 2025);
    }

    #[test]
    fn test_fiscal_year_bounds() {
        let (start, end) = fiscal_year_bounds(2025);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    }

    #[test]
    fn test_fiscal_months_ordering() {
        let months = fiscal_months();
        assert_eq!(months[0], 4);
        assert_eq!(months[8], 12);
        assert_eq!(months[9], 1);
        assert_eq!(months[11], 3);
    }

    #[rstest]
    #[case(Quarter::Q1, [4, 5, 6])]
    #[case(Quarter::Q2, [7, 8, 9])]
    #[case(Quarter::Q3, [10, 11, 12])]
    #[case(Quarter::Q4, [1, 2, 3])]
    fn test_quarter_months(#[case] quarter: Quarter, #[case] expected: [u32; 3]) {
        assert_eq!(quarter.months(), expected);
    }

    #[test]
    fn test_quarter_of_month_out_of_range() {
        assert_eq!(Quarter::of_month(0), None);
        assert_eq!(Quarter::of_month(13), None);
    }

    #[test]
    fn test_quarter_parse() {
        assert_eq!("Q2".parse::<Quarter>().unwrap(), Quarter::Q2);
        assert!("q2".parse::<Quarter>().is_err());
        assert!("all".parse::<Quarter>().is_err());
    }

    proptest! {
        /// Forward and inverse fiscal-year mapping agree: a (year, month)
        /// pair maps to fiscal year `fy` exactly when its date falls inside
        /// `fiscal_year_bounds(fy)`.
        #[test]
        fn prop_fiscal_year_inverse_law(year in 1990i32..2100, month in 1u32..13) {
            let fy = fiscal_year_for(year, month);
            let (start, end) = fiscal_year_bounds(fy);
            let date = NaiveDate::from_ymd_opt(year, month, 15).unwrap();
            prop_assert!(date >= start && date <= end);
            prop_assert_eq!(fiscal_year_of(date), fy);
        }

        /// Every valid month belongs to exactly one quarter, and that
        /// quarter's month list contains it.
        #[test]
        fn prop_quarters_partition_months(month in 1u32..13) {
            let quarter = Quarter::of_month(month).unwrap();
            prop_assert!(quarter.months().contains(&month));
            let owners = Quarter::ALL
                .iter()
                .filter(|q| q.months().contains(&month))
                .count();
            prop_assert_eq!(owners, 1);
        }
    }
}
