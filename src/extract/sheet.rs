//! Spreadsheet loading into an in-memory table.
//!
//! The workbook bytes are opened with calamine and the requested sheet is copied into a
//! [`SheetTable`] of [`Cell`]s, so that the transform works on plain data and can
//! be tested without workbook files.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use std::io::Cursor;
use std::path::Path;

use crate::core::GadashError;

/// One cell value, independent of the workbook format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank cell
    Empty,
    /// Text value
    Text(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Value the workbook marks as a date or date-time
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Text form used for classification lookups, `None` for blanks.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            other => Some(other.render()),
        }
    }

    /// Canonical textual rendering of the value.
    ///
    /// Whole-number floats drop the fractional part (`1234711.0` → `1234711`);
    /// dates render as `YYYY-MM-DD`.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d").to_string(),
        }
    }

    /// Whether the cell carries no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(parsed) => Cell::DateTime(parsed),
                None => Cell::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

/// Raw rows of one sheet. The header row has not been located yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    /// Rows in sheet order
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Build a table from rows of cells.
    #[must_use]
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
        }
    }
}

/// Load a named sheet from workbook bytes.
///
/// The caller reads the file once and hashes the same bytes, so the cache key and
/// the extracted rows always describe one version of the workbook. `origin` is
/// only used in error messages.
///
/// # Errors
///
/// Returns [`GadashError::SourceRead`] if the bytes are not a workbook, the sheet
/// does not exist, or the sheet cannot be decoded.
pub fn read_sheet(bytes: Vec<u8>, origin: &Path, sheet_name: &str) -> Result<SheetTable, GadashError> {
    let source_error = |reason: String| GadashError::SourceRead {
        path: origin.display().to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| source_error(format!("cannot open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names();
    if !sheet_names.iter().any(|name| name == sheet_name) {
        return Err(source_error(format!(
            "sheet '{sheet_name}' not found (available: {})",
            sheet_names.join(", ")
        )));
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| source_error(format!("cannot read sheet '{sheet_name}': {e}")))?;

    let rows = range.rows().map(|row| row.iter().map(Cell::from).collect()).collect();
    tracing::debug!("Loaded {} raw rows from sheet '{}'", range.height(), sheet_name);

    Ok(SheetTable::new(rows))
}
