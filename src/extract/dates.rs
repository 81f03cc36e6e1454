//! Date normalization for the posting-date column.
//!
//! Values arrive as workbook dates, Excel serial numbers, or text in a handful of
//! layouts. All of them are rendered as `YYYY-MM-DD`. A value that cannot be read
//! as a date is passed through unchanged.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::sheet::Cell;

/// Text layouts accepted for dates, tried in order.
///
/// `%Y` also accepts a two-digit year, so the `%y` layout has to come first.
/// `%y` consumes exactly two digits and rejects four-digit years.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d-%b-%Y"];

/// Text layouts accepted for date-times, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Render a posting-date cell as `YYYY-MM-DD`.
#[must_use]
pub fn normalize_date(cell: &Cell) -> String {
    match cell {
        Cell::DateTime(dt) => format_date(dt.date()),
        Cell::Float(serial) => from_excel_serial(*serial).map_or_else(|| cell.render(), format_date),
        #[allow(clippy::cast_precision_loss)]
        Cell::Int(serial) => {
            from_excel_serial(*serial as f64).map_or_else(|| cell.render(), format_date)
        }
        Cell::Text(text) => parse_text_date(text).map_or_else(|| text.clone(), format_date),
        Cell::Empty | Cell::Bool(_) => cell.render(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a textual date in one of the accepted layouts.
#[must_use]
pub fn parse_text_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
}

/// Convert an Excel 1900-system serial number to a calendar date.
///
/// The epoch is 1899-12-30, which absorbs Excel's phantom 1900-02-29 for all
/// serials after February 1900.
#[must_use]
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    #[allow(clippy::cast_possible_truncation)]
    let days = serial.floor() as i64;
    epoch.checked_add_signed(Duration::days(days))
}
