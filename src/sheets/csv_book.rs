use super::grid::Grid;
use super::{prepare_write, A1Range, Row, SheetGateway, WriteSummary};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory of CSV files standing in for a spreadsheet, one `<sheet>.csv`
/// per sheet. Used for offline runs.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
    label: String,
}

impl CsvWorkbook {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create workbook directory: {}", dir.display()))?;
        let label = format!("csv:{}", dir.display());
        Ok(Self { dir, label })
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        let file_name: String = sheet
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.csv", file_name))
    }

    fn load(&self, sheet: &str) -> Result<Grid> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            debug!("Sheet file does not exist yet: {}", path.display());
            return Ok(Grid::default());
        }

        let file = File::open(&path)
            .with_context(|| format!("Failed to open sheet file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Grid::from_rows(rows))
    }

    fn save(&self, sheet: &str, grid: &Grid) -> Result<()> {
        let path = self.sheet_path(sheet);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create sheet file: {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in grid.rows() {
            // csv cannot represent a zero-field record, a single empty field reads back the same.
            if row.is_empty() {
                writer.write_record([""])?;
            } else {
                writer.write_record(row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl SheetGateway for CsvWorkbook {
    fn name(&self) -> &str {
        &self.label
    }

    fn read_range(&self, range: &A1Range) -> Result<Vec<Row>> {
        Ok(self.load(range.sheet_name())?.read(range))
    }

    fn write_range(&self, range: &A1Range, rows: &[Row]) -> Result<WriteSummary> {
        let payload = prepare_write(range, rows)?;
        let mut grid = self.load(range.sheet_name())?;
        let mut summary = grid.write(range, &payload);
        summary.updated_rows = rows.len();
        self.save(range.sheet_name(), &grid)?;
        debug!("Wrote {} rows to {}", rows.len(), self.sheet_path(range.sheet_name()).display());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn write_then_read_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        let anchor: A1Range = "新着物件!L1".parse().unwrap();
        book.write_range(&anchor, &[row(&["Building ID", "p_url"]), row(&["1", "http://a,b"])])
            .unwrap();

        assert!(book.sheet_path("新着物件").exists());
        let read = book.read_range(&"新着物件!L2:M".parse().unwrap()).unwrap();
        assert_eq!(read, vec![row(&["1", "http://a,b"])]);
    }

    #[test]
    fn keeps_cells_outside_the_written_range() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        book.write_range(&"S!A1".parse().unwrap(), &[row(&["name"]), row(&[]), row(&["Tower"])])
            .unwrap();
        book.write_range(&"S!B1".parse().unwrap(), &[row(&["id"]), row(&["7"])])
            .unwrap();

        let read = book.read_range(&"S!A1:B".parse().unwrap()).unwrap();
        assert_eq!(read, vec![row(&["name", "id"]), row(&["", "7"]), row(&["Tower"])]);
    }

    #[test]
    fn missing_sheet_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::open(dir.path()).unwrap();
        assert!(book.read_range(&"Other!A1:A".parse().unwrap()).unwrap().is_empty());
    }
}
