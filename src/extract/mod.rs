//! Source extraction: spreadsheet rows to canonical delimited text.
//!
//! The extractor turns the cost detail sheet into the record set the dashboard
//! consumes. The transform is pure over an in-memory [`SheetTable`];
//! [`extract_workbook`] decodes workbook bytes the caller has already read.
//!
//! # Transform
//!
//! 1. Locate the header row and collapse runs of whitespace in every header name
//! 2. Drop rows whose document type is exactly `"Grand Total"` and rows with no values
//! 3. Append `Category`, `Is_Allocation`, `Department` and `Dept_Category`
//! 4. Render the posting-date column as `YYYY-MM-DD`
//! 5. Emit comma-delimited text with a header line, quoting only where required
//!
//! The output is a deterministic function of the sheet contents and the
//! [`DerivationRules`], which is what makes the build cache sound.

pub mod dates;
pub mod sheet;

pub use sheet::{Cell, SheetTable, read_sheet};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::core::GadashError;
use crate::rules::{DerivationRules, DerivedFields};

/// Header of the document type column.
pub const DOCUMENT_TYPE_COLUMN: &str = "Document Type";
/// Header of the cost type column.
pub const COST_TYPE_COLUMN: &str = "Cost Type";
/// Header of the job number column.
pub const JOB_COLUMN: &str = "Job";
/// Header of the posting-date column.
pub const GL_DATE_COLUMN: &str = "G/L Date";

/// Document type of the trailing summary row.
pub const GRAND_TOTAL: &str = "Grand Total";

/// Names of the appended columns, in output order.
pub const DERIVED_COLUMNS: [&str; 4] = ["Category", "Is_Allocation", "Department", "Dept_Category"];

/// How many leading rows are searched for the header row.
const HEADER_SEARCH_DEPTH: usize = 25;

/// Canonical delimited text plus the number of data records in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTable {
    /// Comma-delimited text, header line first, `\n` line endings
    pub text: String,
    /// Number of data records (header excluded)
    pub record_count: usize,
}

/// Column positions of the fields the transform reads.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    document_type: usize,
    cost_type: usize,
    job: usize,
    gl_date: usize,
}

impl ColumnLayout {
    fn locate(headers: &[String]) -> Option<Self> {
        let position = |name: &str| headers.iter().position(|header| header == name);
        Some(Self {
            document_type: position(DOCUMENT_TYPE_COLUMN)?,
            cost_type: position(COST_TYPE_COLUMN)?,
            job: position(JOB_COLUMN)?,
            gl_date: position(GL_DATE_COLUMN)?,
        })
    }
}

/// One data row with its classification inputs pulled out.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// All cells of the row, padded to the header width
    pub cells: Vec<Cell>,
    /// Document type, `None` when blank
    pub document_type: Option<String>,
    /// Raw cost type, `None` when blank
    pub cost_type: Option<String>,
    /// Job number rendered as text, `None` when blank
    pub job: Option<String>,
}

/// Collapse every run of whitespace to a single space and trim the ends.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the source workbook bytes and transform them.
///
/// `origin` names the file the bytes came from, for messages only.
///
/// # Errors
///
/// Returns [`GadashError::SourceRead`] when the bytes are not a readable workbook
/// or have no recognizable header row.
pub fn extract_workbook(
    bytes: Vec<u8>,
    origin: &Path,
    sheet_name: &str,
    rules: &DerivationRules,
) -> Result<CanonicalTable, GadashError> {
    tracing::info!("Reading source workbook {}", origin.display());
    let table = read_sheet(bytes, origin, sheet_name)?;
    transform(&table, rules).map_err(|reason| GadashError::SourceRead {
        path: origin.display().to_string(),
        reason,
    })
}

/// Transform an in-memory sheet into canonical text.
///
/// # Errors
///
/// Returns a description of the problem when no row carries all required headers
/// or when the output cannot be serialized.
pub fn transform(table: &SheetTable, rules: &DerivationRules) -> Result<CanonicalTable, String> {
    let (header_index, headers, layout) = find_header_row(table)?;
    tracing::debug!("Columns: {}", headers.join(", "));

    let width = headers.len();
    let mut records = Vec::new();
    let mut dropped_totals = 0usize;

    for row in table.rows.iter().skip(header_index + 1) {
        if row.iter().all(Cell::is_empty) {
            continue;
        }

        let mut cells = row.clone();
        cells.resize(width, Cell::Empty);

        let record = SourceRecord {
            document_type: cells[layout.document_type].as_text(),
            cost_type: cells[layout.cost_type].as_text(),
            job: cells[layout.job].as_text(),
            cells,
        };

        if record.document_type.as_deref().map(str::trim) == Some(GRAND_TOTAL) {
            dropped_totals += 1;
            continue;
        }
        records.push(record);
    }

    if dropped_totals > 0 {
        tracing::debug!("Dropped {} summary row(s)", dropped_totals);
    }

    let derived: Vec<DerivedFields> = records
        .iter()
        .map(|record| rules.derive(record.cost_type.as_deref(), record.job.as_deref()))
        .collect();

    log_diagnostics(&derived);

    let text = write_canonical(&headers, &records, &derived, layout.gl_date)
        .map_err(|e| format!("failed to serialize records: {e}"))?;

    tracing::info!("Extracted {} records", records.len());
    Ok(CanonicalTable {
        text,
        record_count: records.len(),
    })
}

fn find_header_row(table: &SheetTable) -> Result<(usize, Vec<String>, ColumnLayout), String> {
    for (index, row) in table.rows.iter().take(HEADER_SEARCH_DEPTH).enumerate() {
        let headers: Vec<String> = row.iter().map(|cell| normalize_header(&cell.render())).collect();
        if let Some(layout) = ColumnLayout::locate(&headers) {
            return Ok((index, headers, layout));
        }
    }

    Err(format!(
        "no header row with columns '{DOCUMENT_TYPE_COLUMN}', '{COST_TYPE_COLUMN}', \
         '{JOB_COLUMN}' and '{GL_DATE_COLUMN}' in the first {HEADER_SEARCH_DEPTH} rows"
    ))
}

fn write_canonical(
    headers: &[String],
    records: &[SourceRecord],
    derived: &[DerivedFields],
    gl_date: usize,
) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header_line: Vec<&str> = headers.iter().map(String::as_str).collect();
    header_line.extend(DERIVED_COLUMNS);
    writer.write_record(&header_line)?;

    for (record, fields) in records.iter().zip(derived) {
        let mut line: Vec<String> = record
            .cells
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                if column == gl_date {
                    dates::normalize_date(cell)
                } else {
                    cell.render()
                }
            })
            .collect();
        line.push(fields.category.clone());
        line.push(fields.is_allocation.to_string());
        line.push(fields.department.clone());
        line.push(fields.department_category.clone());
        writer.write_record(&line)?;
    }

    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Count the data records in canonical text (the header line excluded).
///
/// Quoted fields may span lines, so this parses rather than counting newlines.
///
/// # Errors
///
/// Returns an error if the text is not well-formed delimited data.
pub fn count_records(text: &str) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

fn log_diagnostics(derived: &[DerivedFields]) {
    let departments: BTreeSet<&str> = derived.iter().map(|d| d.department.as_str()).collect();
    tracing::debug!("Distinct departments: {}", departments.len());

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for fields in derived {
        *by_category.entry(fields.department_category.as_str()).or_default() += 1;
    }
    for (category, count) in &by_category {
        tracing::debug!("  {}: {} records", category, count);
    }

    let allocations = derived.iter().filter(|d| d.is_allocation).count();
    if allocations > 0 {
        tracing::debug!("Allocation credit records: {}", allocations);
    }
}
