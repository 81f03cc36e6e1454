//! Document layout rendering with Tera.
//!
//! The layout is a fixed template with one variable per structural slot. Fragment
//! text is passed in as data, never parsed as template source, so fragments may
//! freely contain `{{`, `{%` or `{#`. Autoescaping is disabled because every slot
//! already holds markup, style or script text.

use anyhow::Result;
use tera::{Context as TeraContext, Tera};

use crate::constants::PAYLOAD_MARKER;

const LAYOUT_NAME: &str = "layout";

/// The document skeleton. The payload marker is part of the layout itself and
/// precedes all script fragments.
const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
{{ head }}
    <style>
{{ styles }}
    </style>
</head>
<body>
    {{ password }}

    <!-- Main Dashboard -->
    <div class="dashboard" id="dashboard">
        <!-- Sticky Header + Filters -->
        <div class="sticky-header">
            {{ header }}

            {{ filters }}
        </div>

        <main class="main">
            {{ kpi }}

            {{ charts }}
        </main>
    </div>

    {{ drillthrough }}

    {{ modals }}

    <script>
        // === ENCRYPTED PAYLOAD ===
        {{ payload_marker }}

{{ scripts }}
    </script>
</body>
</html>"#;

/// Text for every slot of the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutSlots {
    /// Document head opening (`<head>` and its children, without `</head>`)
    pub head: String,
    /// Concatenated style fragments
    pub styles: String,
    /// Password gate section
    pub password: String,
    /// Page header
    pub header: String,
    /// Filter bar
    pub filters: String,
    /// Primary metrics cards
    pub kpi: String,
    /// Chart grid
    pub charts: String,
    /// Drill-through panel
    pub drillthrough: String,
    /// All modal fragments, joined
    pub modals: String,
    /// Concatenated script fragments
    pub scripts: String,
}

/// Renders [`LayoutSlots`] into a complete document.
pub struct LayoutRenderer {
    tera: Tera,
}

impl LayoutRenderer {
    /// Compile the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout fails to parse.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(LAYOUT_NAME, LAYOUT)
            .map_err(|e| anyhow::anyhow!("Document layout is invalid: {}", format_tera_error(&e)))?;
        Ok(Self {
            tera,
        })
    }

    /// Render the document.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, slots: &LayoutSlots) -> Result<String> {
        let mut context = TeraContext::new();
        context.insert("head", &slots.head);
        context.insert("styles", &slots.styles);
        context.insert("password", &slots.password);
        context.insert("header", &slots.header);
        context.insert("filters", &slots.filters);
        context.insert("kpi", &slots.kpi);
        context.insert("charts", &slots.charts);
        context.insert("drillthrough", &slots.drillthrough);
        context.insert("modals", &slots.modals);
        context.insert("scripts", &slots.scripts);
        context.insert("payload_marker", PAYLOAD_MARKER);

        self.tera
            .render(LAYOUT_NAME, &context)
            .map_err(|e| anyhow::anyhow!("Document layout rendering failed: {}", format_tera_error(&e)))
    }
}

/// Flatten a Tera error and its sources into one line.
fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages.retain(|m| !m.trim().is_empty());
    messages.join(": ")
}
