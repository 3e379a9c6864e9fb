use super::{prepare_write, trim_rows, A1Range, Row, SheetGateway, WriteSummary};
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

/// A single sheet held in memory as ragged rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Row>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn read(&self, range: &A1Range) -> Vec<Row> {
        let last_row = range
            .end_row
            .map_or(self.rows.len(), |end| (end + 1).min(self.rows.len()));

        let rows = (range.start_row..last_row)
            .map(|r| {
                let row = &self.rows[r];
                let last_col = range.end_col.map_or(row.len(), |end| (end + 1).min(row.len()));
                row.get(range.start_col..last_col)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default()
            })
            .collect();
        trim_rows(rows)
    }

    /// Writes already prepared rows cell by cell, growing the grid as needed.
    pub fn write(&mut self, range: &A1Range, rows: &[Row]) -> WriteSummary {
        for (i, cells) in rows.iter().enumerate() {
            let r = range.start_row + i;
            if self.rows.len() <= r {
                self.rows.resize(r + 1, Vec::new());
            }
            let target = &mut self.rows[r];
            for (j, cell) in cells.iter().enumerate() {
                let c = range.start_col + j;
                if target.len() <= c {
                    if cell.is_empty() {
                        continue;
                    }
                    target.resize(c + 1, String::new());
                }
                target[c] = cell.clone();
            }
        }

        WriteSummary {
            updated_range: range.to_string(),
            updated_rows: rows.len(),
            updated_columns: rows.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// In-process workbook with the same range semantics as the real backends.
#[derive(Debug, Default)]
pub struct MemorySheet {
    sheets: RefCell<HashMap<String, Grid>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a sheet with rows starting at cell A1.
    pub fn with_sheet(self, name: &str, rows: Vec<Row>) -> Self {
        self.sheets
            .borrow_mut()
            .insert(name.to_string(), Grid::from_rows(rows));
        self
    }

    pub fn sheet(&self, name: &str) -> Grid {
        self.sheets.borrow().get(name).cloned().unwrap_or_default()
    }
}

impl SheetGateway for MemorySheet {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_range(&self, range: &A1Range) -> Result<Vec<Row>> {
        Ok(self
            .sheets
            .borrow()
            .get(range.sheet_name())
            .map(|grid| grid.read(range))
            .unwrap_or_default())
    }

    fn write_range(&self, range: &A1Range, rows: &[Row]) -> Result<WriteSummary> {
        let payload = prepare_write(range, rows)?;
        let mut sheets = self.sheets.borrow_mut();
        let grid = sheets.entry(range.sheet_name().to_string()).or_default();
        let mut summary = grid.write(range, &payload);
        summary.updated_rows = rows.len();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn range(text: &str) -> A1Range {
        text.parse().unwrap()
    }

    #[test]
    fn reads_column_slice_and_trims() {
        let grid = Grid::from_rows(vec![
            row(&["name", "x"]),
            row(&["A", "1", ""]),
            row(&[]),
            row(&["C"]),
            row(&["", ""]),
        ]);
        assert_eq!(
            grid.read(&range("A2:A")),
            vec![row(&["A"]), row(&[]), row(&["C"])]
        );
        assert_eq!(grid.read(&range("B1:B2")), vec![row(&["x"]), row(&["1"])]);
        assert!(grid.read(&range("Z1:Z")).is_empty());
    }

    #[test]
    fn writes_at_offset_and_grows() {
        let mut grid = Grid::default();
        grid.write(&range("B2"), &[row(&["a", "b"]), row(&["c"])]);
        assert_eq!(grid.rows()[1], row(&["", "a", "b"]));
        assert_eq!(grid.read(&range("B2:C")), vec![row(&["a", "b"]), row(&["c"])]);
    }

    #[test]
    fn unbounded_write_leaves_old_trailing_rows() {
        let sheet = MemorySheet::new().with_sheet("S", vec![row(&["1"]), row(&["2"]), row(&["3"])]);
        sheet.write_range(&range("S!A1"), &[row(&["x"])]).unwrap();
        assert_eq!(
            sheet.read_range(&range("S!A1:A")).unwrap(),
            vec![row(&["x"]), row(&["2"]), row(&["3"])]
        );
    }

    #[test]
    fn bounded_write_clears_the_rest_of_the_range() {
        let sheet = MemorySheet::new().with_sheet(
            "S",
            vec![row(&["1", "a"]), row(&["2", "b"]), row(&["3", "c"])],
        );
        let summary = sheet.write_range(&range("S!A1:A3"), &[row(&["x"])]).unwrap();
        assert_eq!(summary.updated_rows, 1);
        assert_eq!(
            sheet.read_range(&range("S!A1:B")).unwrap(),
            vec![row(&["x", "a"]), row(&["", "b"]), row(&["", "c"])]
        );
    }

    #[test]
    fn missing_sheet_reads_empty() {
        let sheet = MemorySheet::new();
        assert!(sheet.read_range(&range("Nope!A1:C")).unwrap().is_empty());
    }
}
