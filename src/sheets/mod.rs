//! Spreadsheet access: rectangular ranges of string cells.

pub mod csv_book;
pub mod google;
pub mod grid;
pub mod range;

pub use csv_book::CsvWorkbook;
pub use google::GoogleSheets;
pub use grid::MemorySheet;
pub use range::A1Range;

use anyhow::{bail, Result};

pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub updated_range: String,
    pub updated_rows: usize,
    pub updated_columns: usize,
}

pub trait SheetGateway {
    fn name(&self) -> &str;

    /// Rows in order, trailing empty cells and trailing empty rows omitted.
    fn read_range(&self, range: &A1Range) -> Result<Vec<Row>>;

    /// Overwrites cells from the top-left of `range`. For a range with a
    /// bounded end row, rows past `rows` up to that end are cleared.
    fn write_range(&self, range: &A1Range, rows: &[Row]) -> Result<WriteSummary>;
}

/// Rows as they should be sent for `range`: checked against its bounds and,
/// for a row-bounded range, padded with blank rows so the rest is cleared.
pub fn prepare_write(range: &A1Range, rows: &[Row]) -> Result<Vec<Row>> {
    let data_width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if let Some(width) = range.width() {
        if data_width > width {
            bail!("{} columns do not fit in range {}", data_width, range);
        }
    }

    let mut payload = rows.to_vec();
    if let Some(height) = range.height() {
        if rows.len() > height {
            bail!("{} rows do not fit in range {}", rows.len(), range);
        }
        let blank_width = range.width().unwrap_or(data_width.max(1));
        payload.resize(height, vec![String::new(); blank_width]);
    }
    Ok(payload)
}

/// Drops trailing empty cells of each row and trailing empty rows.
pub fn trim_rows(mut rows: Vec<Row>) -> Vec<Row> {
    for row in rows.iter_mut() {
        while row.last().is_some_and(|cell| cell.is_empty()) {
            row.pop();
        }
    }
    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }
    rows
}

/// First cell of every row, blank rows kept as empty strings so positions line up.
pub fn first_column(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn bounded_write_pads_with_blank_rows() {
        let range: A1Range = "A1:B4".parse().unwrap();
        let payload = prepare_write(&range, &[row(&["a", "b"])]).unwrap();
        assert_eq!(payload.len(), 4);
        assert_eq!(payload[3], row(&["", ""]));
    }

    #[test]
    fn unbounded_write_is_sent_as_is() {
        let range: A1Range = "Sheet1!L1".parse().unwrap();
        let rows = vec![row(&["x"]), row(&["y", "z"])];
        assert_eq!(prepare_write(&range, &rows).unwrap(), rows);
    }

    #[test]
    fn oversized_writes_are_rejected() {
        let range: A1Range = "A1:A2".parse().unwrap();
        assert!(prepare_write(&range, &[row(&["a", "b"])]).is_err());
        assert!(prepare_write(&range, &[row(&["a"]), row(&["b"]), row(&["c"])]).is_err());
    }

    #[test]
    fn trim_drops_trailing_blanks_only() {
        let rows = vec![row(&["a", "", ""]), row(&[""]), row(&["", "b"]), row(&["", ""])];
        assert_eq!(trim_rows(rows), vec![row(&["a"]), row(&[]), row(&["", "b"])]);
    }

    #[test]
    fn first_column_keeps_blank_rows() {
        let rows = vec![row(&["A"]), row(&[]), row(&["C", "x"])];
        assert_eq!(first_column(&rows), vec!["A", "", "C"]);
    }
}
