//! # Run Table
//!
//! The in-memory form of a simulation-run dataset: named columns in their
//! declared order, every cell held as the string the source file contained.
//! Keeping cells as strings makes the equality filters exact and leaves numeric
//! interpretation to the single place that needs it (the outcome column).
//!
//! Files are read with the `polars` CSV reader with schema inference switched
//! off, so every column arrives as a polars `String` column and cells such as
//! `007` or `0.50` keep their exact text.

use polars::prelude::{CsvParseOptions, CsvReadOptions, CsvReader, PolarsError, SerReader};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("The column '{0}' appears more than once in the table header.")]
    DuplicateColumn(String),
    #[error("Row {row} has {found} cells, but the table declares {expected} columns.")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' has {found} cells, but the table has {expected} rows.")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Rows of named string cells with a consistent schema.
///
/// Storage is column-major: `cells[c][r]` is the cell of column `c` in row `r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTable {
    columns: Vec<String>,
    cells: Vec<Vec<String>>,
    height: usize,
}

impl RunTable {
    /// Creates an empty table with the given declared column order.
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        check_unique(&columns)?;
        let cells = vec![Vec::new(); columns.len()];
        Ok(Self {
            columns,
            cells,
            height: 0,
        })
    }

    /// Builds a table from whole columns. All columns must have the same length.
    pub fn from_columns(columns: Vec<(String, Vec<String>)>) -> Result<Self, TableError> {
        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        check_unique(&names)?;

        let height = columns.first().map_or(0, |(_, cells)| cells.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, cells) in columns {
            if cells.len() != height {
                return Err(TableError::ColumnLengthMismatch {
                    column: name,
                    expected: height,
                    found: cells.len(),
                });
            }
            data.push(cells);
        }

        Ok(Self {
            columns: names,
            cells: data,
            height,
        })
    }

    /// Appends one row, given in declared column order.
    pub fn push_row<I, S>(&mut self, row: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidthMismatch {
                row: self.height,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        for (column, cell) in self.cells.iter_mut().zip(row) {
            column.push(cell);
        }
        self.height += 1;
        Ok(())
    }

    /// Column names in declared order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// All cells of the column at `index`, one per row.
    pub fn column(&self, index: usize) -> &[String] {
        &self.cells[index]
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        &self.cells[column][row]
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    /// A new table holding the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|column| rows.iter().map(|&row| column[row].clone()).collect())
            .collect();
        Self {
            columns: self.columns.clone(),
            cells,
            height: rows.len(),
        }
    }

    /// Writes the table as a comma-separated file with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in 0..self.height {
            writer.write_record(self.cells.iter().map(|column| column[row].as_str()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn check_unique(columns: &[String]) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(TableError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

/// The field separator implied by a file name: tab for `.tsv`/`.tab`, comma otherwise.
pub fn separator_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

/// Reads a delimited file with a header row into a [`RunTable`].
///
/// Null cells become empty strings.
pub fn load_run_table(path: &Path) -> Result<RunTable, TableError> {
    log::info!("Loading run table from '{}'", path.display());

    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_parse_options(
                    CsvParseOptions::default().with_separator(separator_for(path)),
                ),
        )
        .finish()?;

    let height = df.height();
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().to_string();
        let cells: Vec<String> = column
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|cell| cell.unwrap_or_default().to_string())
            .collect();
        columns.push((name, cells));
    }

    let table = RunTable::from_columns(columns)?;
    log::info!(
        "Loaded {} runs with {} columns from '{}'",
        height,
        table.width(),
        path.display()
    );
    Ok(table)
}
