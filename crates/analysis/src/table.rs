//! In-memory tables and the formats they are loaded from and saved to.
//!
//! A [`Table`] is a header plus rectangular rows of [`Cell`]s. Reading and
//! writing go through the [`TableSource`] and [`TableSink`] traits; the
//! configured format name picks the implementation via [`select_format`].

use std::fmt;
use std::fs::File;
use std::path::Path;

use pipeline_common::{PipelineError, PipelineResult};
use tracing::debug;

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Interpret a raw field. Empty fields and `NA`/`NaN` markers are
    /// missing; a field is a number only if it parses exactly, so values
    /// with stray whitespace stay text until cleaned.
    pub fn parse(raw: &str) -> Cell {
        match raw {
            "" | "NA" | "NaN" | "nan" | "null" => Cell::Missing,
            _ => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Cell::Number(v),
                Ok(_) => Cell::Missing,
                Err(_) => Cell::Text(raw.to_string()),
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric reading of a text cell, ignoring surrounding whitespace.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Missing => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Named columns over rows of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its length must match the header.
    pub fn push_row(&mut self, row: Vec<Cell>) -> PipelineResult<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::DataRead(format!(
                "row {} has {} fields, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// A column is numeric when it has at least one number and no text.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut any_number = false;
        for cell in self.column(index) {
            match cell {
                Cell::Number(_) => any_number = true,
                Cell::Text(_) => return false,
                Cell::Missing => {}
            }
        }
        any_number
    }

    /// Names of all numeric columns, in header order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        (0..self.columns.len())
            .filter(|&i| self.is_numeric_column(i))
            .map(|i| self.columns[i].as_str())
            .collect()
    }

    /// Non-missing values of a numeric column.
    ///
    /// Unknown and non-numeric columns are configuration mistakes and come
    /// back as `InvalidValue` naming `key`.
    pub fn numeric_values(&self, name: &str, key: &str) -> PipelineResult<Vec<f64>> {
        let index = self.column_index(name).ok_or_else(|| {
            PipelineError::invalid_value(key, format!("no column named '{}'", name))
        })?;
        if !self.is_numeric_column(index) {
            return Err(PipelineError::invalid_value(
                key,
                format!("column '{}' is not numeric", name),
            ));
        }
        Ok(self.column(index).filter_map(Cell::as_number).collect())
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<Cell>) -> bool,
    {
        self.rows.retain(keep);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }
}

/// Reads a table from a file.
pub trait TableSource {
    fn load(&self, path: &Path) -> PipelineResult<Table>;
}

/// Writes a table to a file.
pub trait TableSink {
    fn save(&self, table: &Table, path: &Path) -> PipelineResult<()>;
}

/// A format that can both load and save.
pub trait TableFormat: TableSource + TableSink {
    fn name(&self) -> &'static str;
}

/// Comma-separated values with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    PipelineError::DataRead(format!("{}: {}", path.display(), err))
}

impl TableSource for CsvFormat {
    fn load(&self, path: &Path) -> PipelineResult<Table> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
        let mut table = Table::new(headers.iter());

        for record in reader.records() {
            let record = record.map_err(|e| csv_error(path, e))?;
            table.push_row(record.iter().map(Cell::parse).collect())?;
        }

        debug!(
            path = %path.display(),
            rows = table.n_rows(),
            columns = table.n_columns(),
            "Loaded CSV table"
        );
        Ok(table)
    }
}

impl TableSink for CsvFormat {
    fn save(&self, table: &Table, path: &Path) -> PipelineResult<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

        writer
            .write_record(table.columns())
            .map_err(|e| csv_error(path, e))?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(|c| c.to_string()))
                .map_err(|e| csv_error(path, e))?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = table.n_rows(), "Saved CSV table");
        Ok(())
    }
}

impl TableFormat for CsvFormat {
    fn name(&self) -> &'static str {
        "csv"
    }
}

/// Stand-in for a format nobody has chosen yet. Every operation fails with
/// `NotImplemented` naming the operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unimplemented;

impl TableSource for Unimplemented {
    fn load(&self, _path: &Path) -> PipelineResult<Table> {
        Err(PipelineError::NotImplemented("load".to_string()))
    }
}

impl TableSink for Unimplemented {
    fn save(&self, _table: &Table, _path: &Path) -> PipelineResult<()> {
        Err(PipelineError::NotImplemented("save".to_string()))
    }
}

impl TableFormat for Unimplemented {
    fn name(&self) -> &'static str {
        "unimplemented"
    }
}

/// Pick the table format for a configured name.
///
/// No name selects [`Unimplemented`]; an unknown name is rejected.
pub fn select_format(name: Option<&str>) -> PipelineResult<Box<dyn TableFormat>> {
    match name.map(|n| n.trim().to_ascii_lowercase()) {
        None => Ok(Box::new(Unimplemented)),
        Some(n) if n == "csv" => Ok(Box::new(CsvFormat)),
        Some(n) => Err(PipelineError::unsupported("preprocess.format", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("1.5"), Cell::Number(1.5));
        assert_eq!(Cell::parse("-3"), Cell::Number(-3.0));
        assert_eq!(Cell::parse(" 12.1"), Cell::Text(" 12.1".to_string()));
        assert_eq!(Cell::parse("upwelling"), Cell::Text("upwelling".to_string()));
    }

    #[test]
    fn test_coerce_number_trims() {
        assert_eq!(Cell::parse(" 12.1").coerce_number(), Some(12.1));
        assert_eq!(Cell::parse("abc").coerce_number(), None);
        assert_eq!(Cell::Missing.coerce_number(), None);
    }

    #[test]
    fn test_display_round_trips_numbers() {
        assert_eq!(Cell::Number(1.25).to_string(), "1.25");
        assert_eq!(Cell::Number(12.0).to_string(), "12");
        assert_eq!(Cell::Missing.to_string(), "");
    }

    #[test]
    fn test_push_row_length_checked() {
        let mut table = Table::new(["a", "b"]);
        assert!(table.push_row(vec![Cell::Number(1.0)]).is_err());
        assert!(table.push_row(vec![Cell::Number(1.0), Cell::Missing]).is_ok());
        assert_eq!(table.n_rows(), 1);
    }

    #[test]
    fn test_numeric_columns() {
        let mut table = Table::new(["name", "x", "empty"]);
        table
            .push_row(vec!["a".into(), 1.0.into(), Cell::Missing])
            .unwrap();
        table
            .push_row(vec!["b".into(), Cell::Missing, Cell::Missing])
            .unwrap();

        assert_eq!(table.numeric_columns(), vec!["x"]);
        assert_eq!(table.numeric_values("x", "k").unwrap(), vec![1.0]);
        assert!(matches!(
            table.numeric_values("name", "k"),
            Err(PipelineError::InvalidValue { .. })
        ));
        assert!(matches!(
            table.numeric_values("nope", "k"),
            Err(PipelineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_select_format() {
        assert_eq!(select_format(Some("csv")).unwrap().name(), "csv");
        assert_eq!(select_format(Some(" CSV ")).unwrap().name(), "csv");
        assert_eq!(select_format(None).unwrap().name(), "unimplemented");
        assert!(matches!(
            select_format(Some("parquet")),
            Err(PipelineError::UnsupportedOption { .. })
        ));
    }

    #[test]
    fn test_unimplemented_names_operation() {
        let path = Path::new("x.csv");
        match Unimplemented.load(path) {
            Err(PipelineError::NotImplemented(op)) => assert_eq!(op, "load"),
            other => panic!("expected NotImplemented, got {:?}", other),
        }
        match Unimplemented.save(&Table::default(), path) {
            Err(PipelineError::NotImplemented(op)) => assert_eq!(op, "save"),
            other => panic!("expected NotImplemented, got {:?}", other),
        }
    }
}
