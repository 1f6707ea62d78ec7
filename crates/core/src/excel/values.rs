//! Cell value cleaning for amount columns.

use calamine::Data;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::currency::round_amount;

/// Options governing amount cleaning.
#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    /// Whether `(123)` in a cell is read as a negative amount before
    /// clamping. (Source import paths disagreed; pinned by configuration.)
    pub parenthesized_negatives: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            parenthesized_negatives: true,
        }
    }
}

/// Parses a raw cell into a signed decimal amount.
///
/// Null, empty, `-`, `nan` and `null` cells are zero. Thousands separators
/// and embedded whitespace are stripped. Unparseable residue is zero with a
/// warning. The sign is preserved; see [`clean_amount`] for the clamped
/// variant used by imports.
#[must_use]
pub fn parse_amount(cell: &Data, opts: CleanOptions) -> Decimal {
    match cell {
        Data::Empty => Decimal::ZERO,
        Data::Int(i) => Decimal::from(*i),
        Data::Float(f) => Decimal::from_f64(*f).unwrap_or_else(|| {
            tracing::warn!(value = %f, "unrepresentable numeric cell, substituting 0");
            Decimal::ZERO
        }),
        Data::String(s) => parse_text(s, opts),
        other => {
            tracing::warn!(value = %other, "non-numeric cell, substituting 0");
            Decimal::ZERO
        }
    }
}

/// Coerces a raw cell into a non-negative amount with storage precision.
///
/// Negative results are clamped to zero with a warning; they are never
/// propagated into forecast or actual rows.
#[must_use]
pub fn clean_amount(cell: &Data, opts: CleanOptions) -> Decimal {
    let parsed = parse_amount(cell, opts);
    if parsed < Decimal::ZERO {
        tracing::warn!(value = %parsed, "negative amount clamped to 0");
        return Decimal::ZERO;
    }
    round_amount(parsed)
}

fn parse_text(raw: &str, opts: CleanOptions) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "-"
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none")
    {
        return Decimal::ZERO;
    }

    let mut text = trimmed.replace([',', ' '], "");
    if opts.parenthesized_negatives
        && text.len() > 2
        && text.starts_with('(')
        && text.ends_with(')')
    {
        text = format!("-{}", &text[1..text.len() - 1]);
    }

    text.parse::<Decimal>().unwrap_or_else(|_| {
        tracing::warn!(value = raw, "unparseable amount, substituting 0");
        Decimal::ZERO
    })
}

/// Reads a cell as trimmed text, treating blanks and `nan`/`none` as absent.
#[must_use]
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty()
        || text.eq_ignore_ascii_case("nan")
        || text.eq_ignore_ascii_case("none")
        || text.eq_ignore_ascii_case("null")
    {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn opts() -> CleanOptions {
        CleanOptions::default()
    }

    #[rstest]
    #[case(Data::Empty)]
    #[case(Data::String("".to_string()))]
    #[case(Data::String("-".to_string()))]
    #[case(Data::String("null".to_string()))]
    #[case(Data::String("NULL".to_string()))]
    #[case(Data::String("nan".to_string()))]
    fn test_blankish_cells_are_zero(#[case] cell: Data) {
        assert_eq!(clean_amount(&cell, opts()), Decimal::ZERO);
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(clean_amount(&Data::Int(1200), opts()), dec!(1200));
        assert_eq!(clean_amount(&Data::Float(12.5), opts()), dec!(12.5));
    }

    #[test]
    fn test_thousands_separators_stripped() {
        let cell = Data::String("1,234,567.89".to_string());
        assert_eq!(clean_amount(&cell, opts()), dec!(1234567.89));

        let cell = Data::String(" 12 500 ".to_string());
        assert_eq!(clean_amount(&cell, opts()), dec!(12500));
    }

    #[test]
    fn test_parenthesized_negative_enabled() {
        let cell = Data::String("(123)".to_string());
        // parsed as -123, then clamped to 0
        assert_eq!(parse_amount(&cell, opts()), dec!(-123));
        assert_eq!(clean_amount(&cell, opts()), Decimal::ZERO);
    }

    #[test]
    fn test_parenthesized_negative_disabled() {
        let cell = Data::String("(123)".to_string());
        let opts = CleanOptions {
            parenthesized_negatives: false,
        };
        // unparseable residue rather than a negative
        assert_eq!(parse_amount(&cell, opts), Decimal::ZERO);
        assert_eq!(clean_amount(&cell, opts), Decimal::ZERO);
    }

    #[test]
    fn test_negative_clamped_to_zero() {
        assert_eq!(clean_amount(&Data::Int(-42), opts()), Decimal::ZERO);
        assert_eq!(
            clean_amount(&Data::String("-42.5".to_string()), opts()),
            Decimal::ZERO
        );
        assert_eq!(parse_amount(&Data::Int(-42), opts()), dec!(-42));
    }

    #[test]
    fn test_junk_is_zero() {
        let cell = Data::String("TBD".to_string());
        assert_eq!(clean_amount(&cell, opts()), Decimal::ZERO);
    }

    #[test]
    fn test_rounded_to_storage_precision() {
        let cell = Data::String("1.23456".to_string());
        assert_eq!(clean_amount(&cell, opts()), dec!(1.235));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  nan ".to_string())), None);
        assert_eq!(
            cell_text(&Data::String(" P-100 ".to_string())),
            Some("P-100".to_string())
        );
        assert_eq!(cell_text(&Data::Int(42)), Some("42".to_string()));
    }
}
