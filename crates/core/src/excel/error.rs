//! Spreadsheet ingestion errors.

use thiserror::Error;

/// Errors raised while reading and mapping a workbook.
#[derive(Debug, Error)]
pub enum ExcelError {
    /// No header matched any of the configured identifier aliases.
    ///
    /// Fatal for the file; the available headers are carried for diagnostics.
    #[error(
        "no project identifier column found; available headers: {}",
        available.join(", ")
    )]
    IdentifierColumnNotFound {
        /// The headers that were present.
        available: Vec<String>,
    },

    /// The workbook could not be read.
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    /// The first worksheet is missing or has no header row.
    #[error("workbook has no usable worksheet")]
    EmptyWorkbook,
}
