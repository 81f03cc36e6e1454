//! Fragment assembly into a single document.
//!
//! The template root holds three fragment directories:
//!
//! ```text
//! template/
//! ├── css/    # style fragments, <name>.css
//! ├── html/   # markup fragments, <name>.html, plus head.html
//! └── js/     # script fragments, <name>.js (names may contain '/')
//! ```
//!
//! A [`FragmentManifest`] lists which fragments to load per section and in what
//! order. All files are read concurrently (bounded by `max_parallel`) and then
//! placed strictly by manifest position, so read completion order never affects
//! the output.
//!
//! # Markup slots
//!
//! Markup fragments are assigned by position: the first is the password gate,
//! the next five fill the header, filters, primary metrics, charts and
//! drill-through slots, and every further fragment is a modal, kept in manifest
//! order. A missing fragment leaves its own slot empty and does not shift later
//! fragments.
//!
//! # Missing fragments
//!
//! An absent file contributes empty content and is reported with a warning.
//! Other read failures (permissions, invalid UTF-8) abort assembly.

pub mod inline;
pub mod layout;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::GadashError;
use crate::utils::fs::read_files_parallel;
use layout::{LayoutRenderer, LayoutSlots};

/// Separator between style fragments.
const STYLE_SEPARATOR: &str = "\n";
/// Separator between script fragments.
const SCRIPT_SEPARATOR: &str = "\n\n";
/// Separator between modal fragments.
const MODAL_SEPARATOR: &str = "\n\n    ";

/// Name of the markup fragment that opens the document head.
pub const HEAD_FRAGMENT: &str = "head";

/// Default style load order.
pub const DEFAULT_STYLES: &[&str] = &[
    "variables",
    "base",
    "password",
    "layout",
    "multiselect",
    "kpi",
    "charts",
    "explorer",
    "modal",
    "modal-chart",
    "modal-kpi",
    "modal-import",
    "drillthrough",
    "comparison",
    "responsive",
];

/// Default markup load order (positional slots, see module docs).
pub const DEFAULT_MARKUP: &[&str] = &[
    "password",
    "header",
    "filters",
    "kpi",
    "charts",
    "drillthrough",
    "modal-chart",
    "modal-kpi",
    "modal-import",
];

/// Default script load order.
pub const DEFAULT_SCRIPTS: &[&str] = &[
    "config",
    "state",
    "utils",
    "crypto",
    "filters",
    "kpi",
    "charts/monthly-trend",
    "charts/explorer",
    "drillthrough",
    "multiselect",
    "comparison",
    "modal-base",
    "modal-chart",
    "modal-kpi",
    "modal-import",
    "init",
];

/// Number of fixed markup slots before the modal collection.
const FIXED_MARKUP_SLOTS: usize = 6;

/// Fragment section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// `css/*.css`
    Style,
    /// `html/*.html`
    Markup,
    /// `js/*.js`
    Script,
}

impl Section {
    /// Subdirectory of the template root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Section::Style => "css",
            Section::Markup => "html",
            Section::Script => "js",
        }
    }

    /// File extension of fragments in this section.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Section::Style => "css",
            Section::Markup => "html",
            Section::Script => "js",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Style => write!(f, "style"),
            Section::Markup => write!(f, "markup"),
            Section::Script => write!(f, "script"),
        }
    }
}

/// Ordered fragment names per section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentManifest {
    /// Style fragments, in load order
    pub styles: Vec<String>,
    /// Markup fragments, in slot order
    pub markup: Vec<String>,
    /// Script fragments, in load order
    pub scripts: Vec<String>,
}

impl Default for FragmentManifest {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> {
            names.iter().map(|n| (*n).to_string()).collect()
        };
        Self {
            styles: owned(DEFAULT_STYLES),
            markup: owned(DEFAULT_MARKUP),
            scripts: owned(DEFAULT_SCRIPTS),
        }
    }
}

impl FragmentManifest {
    /// Total number of files the manifest reads, including the head fragment.
    #[must_use]
    pub fn file_count(&self) -> usize {
        1 + self.styles.len() + self.markup.len() + self.scripts.len()
    }

    /// Reject names that would escape the template root.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::ConfigError`] for empty, absolute, or `..` names.
    pub fn validate(&self) -> Result<(), GadashError> {
        let sections = [
            (Section::Style, &self.styles),
            (Section::Markup, &self.markup),
            (Section::Script, &self.scripts),
        ];
        for (section, names) in sections {
            for name in names {
                let path = Path::new(name);
                let escapes = name.trim().is_empty()
                    || path.is_absolute()
                    || name.starts_with('/')
                    || path.components().any(|c| matches!(c, std::path::Component::ParentDir));
                if escapes {
                    return Err(GadashError::ConfigError {
                        message: format!("invalid {section} fragment name '{name}'"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One fragment after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFragment {
    /// Name as listed in the manifest
    pub name: String,
    /// Section the fragment belongs to
    pub section: Section,
    /// Position within its section's list
    pub position: usize,
    /// Resolved file path
    pub path: PathBuf,
    /// File content, `None` when the file is absent
    pub content: Option<String>,
}

impl TemplateFragment {
    /// Content, or the empty string for an absent fragment.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Result of assembling a template tree.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    /// Rendered document text, with the payload marker in place
    pub html: String,
    /// Every fragment that was requested, in load order
    pub fragments: Vec<TemplateFragment>,
}

impl AssembledDocument {
    /// Fragments that were absent on disk.
    pub fn missing(&self) -> impl Iterator<Item = &TemplateFragment> {
        self.fragments.iter().filter(|f| f.content.is_none())
    }
}

/// Reads fragments from a template root and assembles them.
#[derive(Debug, Clone)]
pub struct Assembler {
    root: PathBuf,
    manifest: FragmentManifest,
    max_parallel: usize,
}

impl Assembler {
    /// Create an assembler for `root`.
    #[must_use]
    pub fn new(root: PathBuf, manifest: FragmentManifest, max_parallel: usize) -> Self {
        Self {
            root,
            manifest,
            max_parallel,
        }
    }

    fn fragment_path(&self, section: Section, name: &str) -> PathBuf {
        self.root.join(section.dir_name()).join(format!("{name}.{}", section.extension()))
    }

    /// Every fragment request in load order: head, styles, markup, scripts.
    fn requests(&self) -> Vec<(Section, usize, String)> {
        let mut requests = vec![(Section::Markup, 0, HEAD_FRAGMENT.to_string())];
        let sections = [
            (Section::Style, &self.manifest.styles),
            (Section::Markup, &self.manifest.markup),
            (Section::Script, &self.manifest.scripts),
        ];
        for (section, names) in sections {
            requests.extend(names.iter().enumerate().map(|(i, n)| (section, i, n.clone())));
        }
        requests
    }

    /// Load every fragment concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error for any read failure other than a missing file.
    pub async fn load(&self) -> Result<Vec<TemplateFragment>> {
        let requests = self.requests();
        let paths: Vec<PathBuf> = requests
            .iter()
            .map(|(section, _, name)| self.fragment_path(*section, name))
            .collect();

        tracing::debug!(
            "Reading {} fragments from {} ({} at a time)",
            paths.len(),
            self.root.display(),
            self.max_parallel
        );
        let results = read_files_parallel(&paths, self.max_parallel).await?;

        let mut fragments = Vec::with_capacity(results.len());
        for ((section, position, name), (path, content)) in requests.into_iter().zip(results) {
            let content = match content {
                Ok(text) => Some(text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let missing = GadashError::FragmentMissing {
                        section: section.to_string(),
                        name: name.clone(),
                        path: path.display().to_string(),
                    };
                    tracing::warn!("{missing}");
                    None
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to read {section} fragment: {}", path.display())
                    });
                }
            };
            fragments.push(TemplateFragment {
                name,
                section,
                position,
                path,
                content,
            });
        }

        Ok(fragments)
    }

    /// Load all fragments and render the document.
    ///
    /// # Errors
    ///
    /// Returns an error if a fragment cannot be read (other than being absent) or
    /// the layout fails to render.
    pub async fn assemble(&self) -> Result<AssembledDocument> {
        let fragments = self.load().await?;
        let slots = compose_slots(&fragments);
        let html = LayoutRenderer::new()?.render(&slots)?;

        tracing::info!(
            "Assembled {} style, {} markup and {} script fragments ({} bytes)",
            self.manifest.styles.len(),
            self.manifest.markup.len() + 1,
            self.manifest.scripts.len(),
            html.len()
        );

        Ok(AssembledDocument {
            html,
            fragments,
        })
    }
}

/// Distribute loaded fragments into layout slots.
///
/// `fragments` must be in [`Assembler::load`] order: the head fragment first,
/// then styles, markup and scripts.
#[must_use]
pub fn compose_slots(fragments: &[TemplateFragment]) -> LayoutSlots {
    let mut iter = fragments.iter();
    let head = iter.next().map(|f| f.text().to_string()).unwrap_or_default();

    let mut styles = Vec::new();
    let mut markup = Vec::new();
    let mut scripts = Vec::new();
    for fragment in iter {
        match fragment.section {
            Section::Style => styles.push(fragment.text()),
            Section::Markup => markup.push(fragment.text()),
            Section::Script => scripts.push(fragment.text()),
        }
    }

    let slot = |index: usize| markup.get(index).map(|s| (*s).to_string()).unwrap_or_default();
    let modals = markup.get(FIXED_MARKUP_SLOTS..).unwrap_or_default();

    LayoutSlots {
        head,
        styles: join_present(&styles, STYLE_SEPARATOR),
        password: slot(0),
        header: slot(1),
        filters: slot(2),
        kpi: slot(3),
        charts: slot(4),
        drillthrough: slot(5),
        modals: join_present(modals, MODAL_SEPARATOR),
        scripts: join_present(&scripts, SCRIPT_SEPARATOR),
    }
}

/// Join non-empty parts so an absent fragment adds no stray separator.
fn join_present(parts: &[&str], separator: &str) -> String {
    parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join(separator)
}
