//! Spreadsheet column mapping and value cleaning.
//!
//! Import sheets arrive with arbitrary, inconsistently-cased, whitespace-dirty
//! header rows. This module finds the project-identifier column and the
//! `<Month>'<yy>` amount columns, and coerces raw cells into storable amounts.

pub mod columns;
pub mod error;
pub mod sheet;
pub mod values;

pub use calamine::Data;
pub use columns::{
    ColumnMap, IDENTIFIER_ALIASES, MonthColumn, expand_two_digit_year, find_column, map_columns,
    parse_month_year,
};
pub use error::ExcelError;
pub use sheet::{SheetData, read_first_sheet};
pub use values::{CleanOptions, cell_text, clean_amount, parse_amount};
