//! Workbook reading.

use std::io::{Read, Seek};

use calamine::{Data, Range, Reader, Xlsx};

use super::error::ExcelError;

/// The first worksheet of a workbook, split into headers and data rows.
#[derive(Debug, Clone)]
pub struct SheetData {
    /// Trimmed header texts; blank headers become `Unnamed_{i}`.
    pub headers: Vec<String>,
    /// Data rows below the header row, in file order.
    pub rows: Vec<Vec<Data>>,
}

/// Reads the first worksheet of an `.xlsx` workbook.
///
/// `header_row` is the zero-based worksheet row holding the column headers;
/// anything above it is ignored.
///
/// # Errors
///
/// Returns [`ExcelError::Workbook`] when the bytes are not a readable
/// workbook and [`ExcelError::EmptyWorkbook`] when there is no sheet or no
/// header row.
pub fn read_first_sheet<R: Read + Seek>(
    reader: R,
    header_row: usize,
) -> Result<SheetData, ExcelError> {
    let mut workbook: Xlsx<R> = Xlsx::new(reader)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ExcelError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet_name)?;
    sheet_from_range(&range, header_row)
}

fn sheet_from_range(range: &Range<Data>, header_row: usize) -> Result<SheetData, ExcelError> {
    let mut rows = range.rows().skip(header_row);
    let header_cells = rows.next().ok_or(ExcelError::EmptyWorkbook)?;

    let headers = header_cells
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let text = cell.to_string();
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                format!("Unnamed_{index}")
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let data_rows = rows.map(<[Data]>::to_vec).collect();

    Ok(SheetData {
        headers,
        rows: data_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_of(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut range = Range::new((0, 0), (height as u32 - 1, width as u32 - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_sheet_from_range_header_offset() {
        let range = range_of(vec![
            vec![Data::String("Report".to_string())],
            vec![
                Data::String(" IPMS ID ".to_string()),
                Data::String("Apr'25".to_string()),
            ],
            vec![Data::String("P-1".to_string()), Data::Float(100.0)],
        ]);

        let sheet = sheet_from_range(&range, 1).unwrap();
        assert_eq!(sheet.headers, vec!["IPMS ID", "Apr'25"]);
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_blank_headers_named() {
        let range = range_of(vec![
            vec![Data::String("IPMS ID".to_string()), Data::Empty],
            vec![Data::String("P-1".to_string()), Data::Empty],
        ]);

        let sheet = sheet_from_range(&range, 0).unwrap();
        assert_eq!(sheet.headers[1], "Unnamed_1");
    }

    #[test]
    fn test_missing_header_row() {
        let range = range_of(vec![vec![Data::String("only row".to_string())]]);
        assert!(matches!(
            sheet_from_range(&range, 3),
            Err(ExcelError::EmptyWorkbook)
        ));
    }
}
