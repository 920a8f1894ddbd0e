//! Self-contained HTML comparison report.
//!
//! The report has four parts: a header naming both documents, an
//! overview list (overall similarity, low-similarity page count, total
//! box count), a per-page summary table, and one section per page with
//! the overlay embedded as a PNG data URI and the unified text diff in a
//! collapsible `<details>` block.
//!
//! Overlays are encoded as pages arrive through
//! [`HtmlReport::add_page`], so the caller can drop each page's raster
//! right after. The document-level figures come from a
//! [`DocumentSummary`] at [`render`](HtmlReport::render) time.
//!
//! This is a pure function of its inputs: the generation timestamp is
//! passed in through [`ReportMetadata`].

use std::fmt::Write;

use pdfdiff_core::{DocumentSummary, PageDiffResult};

use crate::png::{ExportError, png_data_uri};

/// Marker appended to figures below the warning level.
const WARNING_MARK: &str = " &#9888;";

const STYLE: &str = "\
body { font-family: -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, Arial, sans-serif; line-height: 1.6; color: #111; margin: 0; }
.container { max-width: 1080px; margin: 0 auto; padding: 24px; }
h1, h2, h3 { margin: 8px 0; }
.small { color: #666; font-size: 0.95rem; }
kbd { background: #eee; border-radius: 4px; padding: 1px 6px; }
table { border-collapse: collapse; width: 100%; }
th { border-bottom: 1px solid #ddd; text-align: right; }
td { text-align: right; }
section { margin: 24px 0; }
.meta { color: #555; margin: 4px 0; }
.issues { color: #a40; margin: 4px 0; }
img { max-width: 100%; border: 1px solid #eee; border-radius: 6px; }
details { background: #fcfcfc; border: 1px solid #eee; border-radius: 6px; padding: 8px; }
summary { cursor: pointer; font-weight: 600; }
pre { background: #fafafa; border: 1px solid #eee; padding: 12px; white-space: pre-wrap; overflow: auto; }";

/// Names and timestamp shown in the report header.
#[derive(Debug, Clone, Default)]
pub struct ReportMetadata {
    /// Display name of the first document.
    pub name_a: String,
    /// Display name of the second document.
    pub name_b: String,
    /// Preformatted generation time, omitted when `None`.
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone)]
struct PageSection {
    page: usize,
    similarity: f64,
    box_count: usize,
    overlay_uri: String,
    text_diff: String,
    issues: Vec<String>,
}

/// Accumulates page sections and renders the final HTML document.
#[derive(Debug, Clone)]
pub struct HtmlReport {
    metadata: ReportMetadata,
    warn_threshold: f64,
    sections: Vec<PageSection>,
}

impl HtmlReport {
    /// Start a report flagging figures below `warn_threshold`.
    #[must_use]
    pub const fn new(metadata: ReportMetadata, warn_threshold: f64) -> Self {
        Self {
            metadata,
            warn_threshold,
            sections: Vec::new(),
        }
    }

    /// Encode one page's overlay and keep its section.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::PngEncode`] if the overlay cannot be encoded.
    pub fn add_page(&mut self, result: &PageDiffResult) -> Result<(), ExportError> {
        let overlay_uri = png_data_uri(&result.overlay)?;
        self.sections.push(PageSection {
            page: result.page_number(),
            similarity: result.similarity,
            box_count: result.boxes.len(),
            overlay_uri,
            text_diff: result.text_diff.clone(),
            issues: result.issues.iter().map(ToString::to_string).collect(),
        });
        Ok(())
    }

    /// Number of page sections added.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.sections.len()
    }

    /// Render the complete document.
    #[must_use]
    pub fn render(&self, summary: &DocumentSummary) -> String {
        let mut out = String::new();
        self.write_head(&mut out);
        self.write_overview(&mut out, summary);
        self.write_table(&mut out);
        let _ = writeln!(out, "  <h2>Page details</h2>");
        for section in &self.sections {
            self.write_section(&mut out, section);
        }
        let _ = writeln!(out, "</div>");
        let _ = writeln!(out, "</body>");
        let _ = writeln!(out, "</html>");
        out
    }

    fn warn(&self, similarity: f64) -> &'static str {
        if similarity < self.warn_threshold {
            WARNING_MARK
        } else {
            ""
        }
    }

    fn write_head(&self, out: &mut String) {
        let name_a = html_escape(&self.metadata.name_a);
        let name_b = html_escape(&self.metadata.name_b);
        let _ = writeln!(out, "<!doctype html>");
        let _ = writeln!(out, r#"<html lang="en">"#);
        let _ = writeln!(out, "<head>");
        let _ = writeln!(out, r#"<meta charset="utf-8"/>"#);
        let _ = writeln!(out, "<title>PDF comparison report - {name_a} vs {name_b}</title>");
        let _ = writeln!(
            out,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1"/>"#
        );
        let _ = writeln!(out, "<style>\n{STYLE}\n</style>");
        let _ = writeln!(out, "</head>");
        let _ = writeln!(out, "<body>");
        let _ = writeln!(out, r#"<div class="container">"#);
        let _ = writeln!(out, "  <h1>PDF comparison report</h1>");
        let _ = writeln!(
            out,
            r#"  <p class="small">Document A: <kbd>{name_a}</kbd>; document B: <kbd>{name_b}</kbd></p>"#
        );
        if let Some(generated_at) = &self.metadata.generated_at {
            let _ = writeln!(
                out,
                r#"  <p class="small">Generated: {}</p>"#,
                html_escape(generated_at)
            );
        }
    }

    fn write_overview(&self, out: &mut String, summary: &DocumentSummary) {
        let verdict = if summary.overall_similarity < self.warn_threshold {
            "&#9888; possible major changes"
        } else {
            "&#10003; highly similar"
        };
        let _ = writeln!(out, "  <h2>Overview</h2>");
        let _ = writeln!(out, "  <ul>");
        let _ = writeln!(
            out,
            "    <li>Overall text similarity: <strong>{:.4}</strong> {verdict}</li>",
            summary.overall_similarity
        );
        let _ = writeln!(
            out,
            "    <li>Low-similarity pages: <strong>{}/{}</strong></li>",
            summary.low_pages.len(),
            summary.pages.len()
        );
        let _ = writeln!(
            out,
            "    <li>Total difference boxes: <strong>{}</strong></li>",
            summary.total_boxes
        );
        if !summary.degraded_pages.is_empty() {
            let pages: Vec<String> = summary.degraded_pages.iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "    <li>Pages compared with substitutes: <strong>{}</strong></li>",
                pages.join(", ")
            );
        }
        let _ = writeln!(out, "  </ul>");
    }

    fn write_table(&self, out: &mut String) {
        let _ = writeln!(out, "  <h2>Page summary</h2>");
        let _ = writeln!(out, "  <table>");
        let _ = writeln!(
            out,
            r#"    <thead><tr><th style="width:80px">Page</th><th style="width:160px">Text similarity</th><th style="width:160px">Difference boxes</th></tr></thead>"#
        );
        let _ = writeln!(out, "    <tbody>");
        for section in &self.sections {
            let _ = writeln!(
                out,
                "      <tr><td>{}</td><td>{:.4}{}</td><td>{}</td></tr>",
                section.page,
                section.similarity,
                self.warn(section.similarity),
                section.box_count
            );
        }
        let _ = writeln!(out, "    </tbody>");
        let _ = writeln!(out, "  </table>");
    }

    fn write_section(&self, out: &mut String, section: &PageSection) {
        let page = section.page;
        let _ = writeln!(out, r#"  <section id="page-{page}">"#);
        let _ = writeln!(out, "    <h3>Page {page}</h3>");
        let _ = writeln!(
            out,
            r#"    <div class="meta">Text similarity: {:.4}{}, difference boxes: {}</div>"#,
            section.similarity,
            self.warn(section.similarity),
            section.box_count
        );
        for issue in &section.issues {
            let _ = writeln!(out, r#"    <div class="issues">{}</div>"#, html_escape(issue));
        }
        let _ = writeln!(
            out,
            r#"    <div><img src="{}" alt="Difference overlay, page {page}"/></div>"#,
            section.overlay_uri
        );
        let _ = writeln!(out, "    <details>");
        let _ = writeln!(out, "      <summary>Unified text diff (A vs B)</summary>");
        let _ = writeln!(out, "      <pre>{}</pre>", html_escape(&section.text_diff));
        let _ = writeln!(out, "    </details>");
        let _ = writeln!(out, "  </section>");
    }
}

/// Escape the five HTML special characters for safe embedding in element
/// text and attribute values.
#[must_use]
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
