//! Project fixtures: a small template tree, library stubs and sample workbook rows.

use std::path::Path;

use super::write_fragment;
use crate::assemble::inline::KNOWN_LIBRARIES;
use crate::constants::TIMESTAMP_MARKER;

/// Sheet header of the sample workbook.
pub const SAMPLE_HEADERS: [&str; 5] = ["Document Type", "Cost Type", "Job", "G/L Date", "Amount"];

/// Sample data rows: document type, cost type, job, G/L date, amount.
///
/// The last row is the report's grand total and never reaches the output.
pub const SAMPLE_ROWS: &[(&str, &str, &str, &str, f64)] = &[
    ("JE", "611000 - Regular Time", "4021110", "01/15/2025", 1250.5),
    ("AP", "641000 - Fuel", "4021711", "2025-01-16", 310.25),
    ("JE", "693000 - Equipment Allocation", "4021720", "01/31/2025", -500.0),
    ("AP", "750000 - Office Supplies", "4021999", "02/03/2025", 42.0),
    ("Grand Total", "", "", "", 1102.75),
];

/// Index into [`SAMPLE_ROWS`] of the row written with native cell types: the job
/// as a number and the G/L date as a date-formatted cell. The other rows hold text.
pub const TYPED_SAMPLE_ROW: usize = 1;

/// Title printed above the header row of the sample sheet.
pub const SAMPLE_TITLE: &str = "Cost Code Detail Report";

/// A set of files relative to a project root.
#[derive(Debug, Clone, Default)]
pub struct TemplateFixture {
    /// `(relative path, content)` pairs
    pub files: Vec<(String, String)>,
}

impl TemplateFixture {
    /// A minimal but complete project tree for the default manifest.
    ///
    /// Only a subset of the default fragments exists, so builds report some
    /// fragments as missing. `template/js/init.js` carries the timestamp marker and
    /// the head fragment references every known library; `lib/` holds a stub for
    /// each of them.
    #[must_use]
    pub fn standard() -> Self {
        let library_tags: Vec<&str> = KNOWN_LIBRARIES.iter().map(|l| l.tag).collect();
        let head = format!(
            "<head>\n    <meta charset=\"UTF-8\">\n    <title>Indirect G&A Dashboard</title>\n    {}",
            library_tags.join("\n    ")
        );

        let mut fixture = Self::default()
            .with_file("template/html/head.html", &head)
            .with_file("template/css/variables.css", ":root { --accent: #1f6feb; }")
            .with_file("template/css/base.css", "body { margin: 0; }")
            .with_file("template/html/password.html", "<div id=\"password-gate\"></div>")
            .with_file("template/html/header.html", "<header class=\"header\"></header>")
            .with_file("template/html/kpi.html", "<section id=\"kpi\"></section>")
            .with_file("template/html/modal-chart.html", "<div class=\"modal\" id=\"modal-chart\"></div>")
            .with_file("template/js/config.js", "const CONFIG = { currency: 'USD' };")
            .with_file(
                "template/js/charts/monthly-trend.js",
                "function renderMonthlyTrend(rows) { return rows.length; }",
            )
            .with_file(
                "template/js/init.js",
                &format!("document.getElementById('ts').textContent = '{TIMESTAMP_MARKER}';"),
            );

        for library in KNOWN_LIBRARIES {
            fixture = fixture.with_file(
                &format!("lib/{}", library.file_name),
                &format!("/* {} stub */", library.name),
            );
        }
        fixture
    }

    /// Add or replace a file.
    #[must_use]
    pub fn with_file(mut self, relative: &str, content: &str) -> Self {
        self.files.retain(|(path, _)| path != relative);
        self.files.push((relative.to_string(), content.to_string()));
        self
    }

    /// Drop a file from the set.
    #[must_use]
    pub fn without_file(mut self, relative: &str) -> Self {
        self.files.retain(|(path, _)| path != relative);
        self
    }

    /// Write every file under `root`.
    pub fn write_to(&self, root: &Path) {
        for (relative, content) in &self.files {
            write_fragment(root, relative, content);
        }
    }
}

/// Write the sample workbook to `path`, creating parent directories.
///
/// The sheet has a title row, a blank row, the header row and then
/// [`SAMPLE_ROWS`]. Amounts are numbers; row [`TYPED_SAMPLE_ROW`] also stores
/// its job and date as native cells.
///
/// # Panics
///
/// Panics if the workbook cannot be written.
pub fn write_sample_workbook(path: &Path) {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }

    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(crate::constants::DEFAULT_SHEET_NAME).unwrap();
    sheet.write_string(0, 0, SAMPLE_TITLE).unwrap();

    for (col, header) in SAMPLE_HEADERS.iter().enumerate() {
        sheet.write_string(2, col as u16, *header).unwrap();
    }
    for (i, (doc_type, cost_type, job, date, amount)) in SAMPLE_ROWS.iter().enumerate() {
        let row = 3 + i as u32;
        sheet.write_string(row, 0, *doc_type).unwrap();
        if !cost_type.is_empty() {
            sheet.write_string(row, 1, *cost_type).unwrap();
        }

        if i == TYPED_SAMPLE_ROW {
            sheet.write_number(row, 2, job.parse::<f64>().unwrap()).unwrap();
            let posted = ExcelDateTime::parse_from_str(date).unwrap();
            sheet.write_datetime_with_format(row, 3, &posted, &date_format).unwrap();
        } else {
            for (col, value) in [(2u16, job), (3, date)] {
                if !value.is_empty() {
                    sheet.write_string(row, col, *value).unwrap();
                }
            }
        }
        sheet.write_number(row, 4, *amount).unwrap();
    }

    workbook.save(path).unwrap();
}
