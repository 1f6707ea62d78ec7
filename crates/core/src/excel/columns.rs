//! Header detection for project-identifier and month-year columns.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::error::ExcelError;

/// Default aliases accepted for the project identifier column.
///
/// Matching is case-insensitive, exact or by substring containment, and the
/// first matching column by sheet order wins.
pub const IDENTIFIER_ALIASES: &[&str] = &[
    "ipms id",
    "ipms_id",
    "ipmsid",
    "project id",
    "project_id",
    "projectid",
    "project number",
    "project_number",
    "project",
];

const MONTH_FULL_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static MONTH_NAMES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut names = HashMap::new();
    for (index, name) in MONTH_FULL_NAMES.into_iter().enumerate() {
        let month = u32::try_from(index).expect("month index fits u32") + 1;
        names.insert(name, month);
        names.insert(&name[..3], month);
    }
    names
});

/// A header recognised as a month-year amount column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthColumn {
    /// Zero-based column index in the sheet.
    pub index: usize,
    /// The original header text.
    pub header: String,
    /// Absolute calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

/// The resolved column layout of an import sheet.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// Index of the project identifier column.
    pub identifier: usize,
    /// Month-year amount columns in sheet order.
    pub months: Vec<MonthColumn>,
}

/// Expands a two-digit year around the configured pivot.
///
/// `yy <= pivot` lands in 20xx, anything above in 19xx.
#[must_use]
pub const fn expand_two_digit_year(yy: u8, pivot: u8) -> i32 {
    if yy <= pivot {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

/// Parses an apostrophe-delimited `<month>'<yy>` token out of a header.
///
/// The month part must be a full English month name or its 3-letter
/// abbreviation; the year part must start with exactly two digits (trailing
/// text such as `" Forecast"` is ignored). Headers that do not parse are
/// simply not month columns.
#[must_use]
pub fn parse_month_year(header: &str, year_pivot: u8) -> Option<(i32, u32)> {
    let lowered = header.trim().to_lowercase();
    let (month_part, year_part) = lowered.split_once('\'')?;
    let month = MONTH_NAMES.get(month_part.trim()).copied()?;

    let digits: String = year_part
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.len() != 2 {
        return None;
    }
    let yy: u8 = digits.parse().ok()?;
    Some((expand_two_digit_year(yy, year_pivot), month))
}

/// Finds a column whose normalised header contains `name` (case-insensitive).
#[must_use]
pub fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let want = name.to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase().contains(&want))
}

/// Resolves the identifier column and month-year columns of a header row.
///
/// # Errors
///
/// Returns [`ExcelError::IdentifierColumnNotFound`] (listing the available
/// headers) when no header matches any alias.
pub fn map_columns(
    headers: &[String],
    aliases: &[&str],
    year_pivot: u8,
) -> Result<ColumnMap, ExcelError> {
    let identifier = headers
        .iter()
        .position(|header| {
            let normalized = header.trim().to_lowercase();
            aliases
                .iter()
                .any(|alias| normalized == *alias || normalized.contains(alias))
        })
        .ok_or_else(|| ExcelError::IdentifierColumnNotFound {
            available: headers.to_vec(),
        })?;

    let months = headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            parse_month_year(header, year_pivot).map(|(year, month)| MonthColumn {
                index,
                header: header.clone(),
                year,
                month,
            })
        })
        .collect();

    Ok(ColumnMap { identifier, months })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Apr'25", 2025, 4)]
    #[case("Apr'25 Forecast", 2025, 4)]
    #[case("  april'25  ", 2025, 4)]
    #[case("DEC'26", 2026, 12)]
    #[case("May'25", 2025, 5)]
    fn test_parse_month_year(#[case] header: &str, #[case] year: i32, #[case] month: u32) {
        assert_eq!(parse_month_year(header, 50), Some((year, month)));
    }

    #[rstest]
    #[case("April")] // no apostrophe
    #[case("Apr-25")] // wrong delimiter
    #[case("Total'25")] // not a month
    #[case("Apr'2025")] // four-digit year
    #[case("Apr'2")] // one-digit year
    fn test_unparseable_headers_excluded(#[case] header: &str) {
        assert_eq!(parse_month_year(header, 50), None);
    }

    /// Locks the configured two-digit-year pivot at 50: `'50` is 2050 and
    /// `'51` is 1951. (The source system used both 30 and 50; 50 is the
    /// single documented value here.)
    #[test]
    fn test_year_pivot_locked_at_50() {
        assert_eq!(parse_month_year("Apr'50", 50), Some((2050, 4)));
        assert_eq!(parse_month_year("Apr'51", 50), Some((1951, 4)));
        assert_eq!(expand_two_digit_year(0, 50), 2000);
        assert_eq!(expand_two_digit_year(99, 50), 1999);
    }

    #[test]
    fn test_map_columns() {
        let headers: Vec<String> = ["S.No", "IPMS ID", "Customer", "Apr'25", "May'25", "Notes"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let map = map_columns(&headers, IDENTIFIER_ALIASES, 50).unwrap();
        assert_eq!(map.identifier, 1);
        assert_eq!(map.months.len(), 2);
        assert_eq!(map.months[0].index, 3);
        assert_eq!(map.months[0].year, 2025);
        assert_eq!(map.months[0].month, 4);
        assert_eq!(map.months[1].month, 5);
    }

    #[test]
    fn test_identifier_matches_by_substring() {
        let headers: Vec<String> = ["Region", "Project No / OP Number"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let map = map_columns(&headers, IDENTIFIER_ALIASES, 50).unwrap();
        assert_eq!(map.identifier, 1);
    }

    #[test]
    fn test_first_matching_column_wins() {
        let headers: Vec<String> = ["Project Name", "Project Number"]
            .iter()
            .map(ToString::to_string)
            .collect();
        // both contain the "project" alias; column order decides
        let map = map_columns(&headers, IDENTIFIER_ALIASES, 50).unwrap();
        assert_eq!(map.identifier, 0);
    }

    #[test]
    fn test_missing_identifier_reports_available_headers() {
        let headers: Vec<String> = ["Region", "Apr'25"].iter().map(ToString::to_string).collect();
        let err = map_columns(&headers, IDENTIFIER_ALIASES, 50).unwrap_err();
        match err {
            ExcelError::IdentifierColumnNotFound { available } => {
                assert_eq!(available, headers);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_column() {
        let headers: Vec<String> = ["Project Name", "Cluster Head"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(find_column(&headers, "cluster head"), Some(1));
        assert_eq!(find_column(&headers, "currency"), None);
    }
}
