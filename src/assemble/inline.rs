//! Inlining of third-party script libraries.
//!
//! The markup references a small, fixed set of libraries by network URL. Each
//! reference is replaced with the content of a pre-fetched copy from the library
//! directory, so the artifact works without network access. A missing local copy
//! leaves the reference in place with a warning; the artifact then needs network
//! access for that library only.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

/// A library the inliner knows how to substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryReference {
    /// Display name
    pub name: &'static str,
    /// File name inside the library directory
    pub file_name: &'static str,
    /// Exact reference text in the document
    pub tag: &'static str,
}

/// The libraries the dashboard loads.
pub const KNOWN_LIBRARIES: &[LibraryReference] = &[
    LibraryReference {
        name: "Chart.js",
        file_name: "chart.min.js",
        tag: r#"<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>"#,
    },
    LibraryReference {
        name: "PapaParse",
        file_name: "papaparse.min.js",
        tag: r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/PapaParse/5.4.1/papaparse.min.js"></script>"#,
    },
    LibraryReference {
        name: "SheetJS XLSX",
        file_name: "xlsx.full.min.js",
        tag: r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/xlsx/0.18.5/xlsx.full.min.js"></script>"#,
    },
];

/// What happened to one library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineOutcome {
    /// Reference replaced with this many bytes of script
    Inlined(usize),
    /// No local copy; reference left in place
    MissingFile,
    /// Local copy exists but the document does not reference the library
    NotReferenced,
}

/// Per-library outcome, in [`KNOWN_LIBRARIES`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineReport {
    /// One entry per known library
    pub outcomes: Vec<(&'static str, InlineOutcome)>,
}

impl InlineReport {
    /// Number of libraries that were inlined.
    #[must_use]
    pub fn inlined_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| matches!(o, InlineOutcome::Inlined(_))).count()
    }
}

/// Replace the first occurrence of each known library reference.
///
/// # Errors
///
/// Returns an error if a library file exists but cannot be read.
pub fn inline_libraries(mut document: String, lib_dir: &Path) -> Result<(String, InlineReport)> {
    let mut report = InlineReport::default();

    for library in KNOWN_LIBRARIES {
        let path = lib_dir.join(library.file_name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    "{} not found at {}; the artifact will load it from the network",
                    library.file_name,
                    path.display()
                );
                report.outcomes.push((library.name, InlineOutcome::MissingFile));
                continue;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read library {}", path.display()));
            }
        };

        let Some(at) = document.find(library.tag) else {
            tracing::debug!("{} is not referenced by the document", library.name);
            report.outcomes.push((library.name, InlineOutcome::NotReferenced));
            continue;
        };

        let inline_block = format!("<script>{content}</script>");
        document.replace_range(at..at + library.tag.len(), &inline_block);
        tracing::info!("{}: {} bytes inlined", library.name, content.len());
        report.outcomes.push((library.name, InlineOutcome::Inlined(content.len())));
    }

    Ok((document, report))
}
