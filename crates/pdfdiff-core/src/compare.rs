//! Document comparison: walk two page sources side by side and produce a
//! [`PageDiffResult`] per page.
//!
//! Page failures never abort the run. A page that cannot be rendered is
//! compared as a blank placeholder, text that cannot be extracted
//! compares as empty, and a page present on only one side is compared
//! against a placeholder with empty text. Each substitution is recorded
//! as a [`PageIssue`] on that page's result and logged as a warning.
//!
//! Results are handed to a caller-supplied sink one page at a time, so
//! only one page's rasters are alive at once (a batch of pages with the
//! `parallel` feature). The sink returns [`ControlFlow`] and may stop the
//! run between pages.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::settings::DiffSettings;
use crate::source::{PageSource, placeholder_page};
use crate::text::{DIFF_CONTEXT_LINES, normalize_text, select_band_text, similarity, unified_diff};
use crate::types::{BoundingBox, RgbImage, RgbaImage};

/// Pages per progress log line, and per batch in parallel runs.
pub const PAGE_BATCH: usize = 10;

/// Which of the two documents a page issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The first (reference) document.
    A,
    /// The second (revised) document.
    B,
}

impl Side {
    /// Label used in diff headers and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

/// A substitution made while comparing one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageIssue {
    /// The page could not be rendered; a blank placeholder was used.
    Render {
        /// Affected document.
        side: Side,
        /// Source error message.
        message: String,
    },
    /// The page text could not be extracted; empty text was used.
    Text {
        /// Affected document.
        side: Side,
        /// Source error message.
        message: String,
    },
    /// The document has fewer pages; a blank page with no text was used.
    MissingPage {
        /// The shorter document.
        side: Side,
    },
}

impl std::fmt::Display for PageIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render { side, message } => {
                write!(f, "{}: render failed, placeholder used ({message})", side.label())
            }
            Self::Text { side, message } => {
                write!(f, "{}: text extraction failed, empty text used ({message})", side.label())
            }
            Self::MissingPage { side } => write!(f, "{}: page missing", side.label()),
        }
    }
}

/// Everything computed for one page pair.
#[derive(Debug, Clone)]
pub struct PageDiffResult {
    /// Zero-based page index.
    pub index: usize,
    /// Text similarity ratio in `[0, 1]`.
    pub similarity: f64,
    /// Final difference boxes.
    pub boxes: Vec<BoundingBox>,
    /// Share of differing pixels in `[0, 1]`.
    pub difference_ratio: f64,
    /// Second page with the boxes drawn on it.
    pub overlay: RgbaImage,
    /// Normalized text of the first page.
    pub text_a: String,
    /// Normalized text of the second page.
    pub text_b: String,
    /// Unified diff of the two texts; empty when they are equal.
    pub text_diff: String,
    /// Substitutions made for this page.
    pub issues: Vec<PageIssue>,
}

impl PageDiffResult {
    /// One-based page number.
    #[must_use]
    pub const fn page_number(&self) -> usize {
        self.index + 1
    }

    /// Whether any input of this page was substituted.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Whether the document on `side` has no page at this index.
    #[must_use]
    pub fn is_missing(&self, side: Side) -> bool {
        self.issues
            .iter()
            .any(|issue| matches!(issue, PageIssue::MissingPage { side: s } if *s == side))
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pages the run would cover: the larger of the two page counts.
    pub pages_total: usize,
    /// Pages handed to the sink.
    pub pages_compared: usize,
    /// Whether the sink stopped the run early.
    pub stopped: bool,
}

/// Compares two documents page by page under fixed settings.
#[derive(Debug, Clone)]
pub struct Comparison<A, B> {
    settings: DiffSettings,
    a: A,
    b: B,
}

impl<A: PageSource, B: PageSource> Comparison<A, B> {
    /// Compare `a` (reference) against `b` (revision).
    pub const fn new(settings: DiffSettings, a: A, b: B) -> Self {
        Self { settings, a, b }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &DiffSettings {
        &self.settings
    }

    /// Number of page pairs: the larger of the two page counts.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.a.page_count().max(self.b.page_count())
    }

    /// Compare page `index` of both documents.
    #[must_use]
    pub fn compare_page(&self, index: usize) -> PageDiffResult {
        let mut issues = Vec::new();
        let (image_a, text_a) = self.load(&self.a, Side::A, index, &mut issues);
        let (image_b, text_b) = self.load(&self.b, Side::B, index, &mut issues);

        let page = index + 1;
        let text_diff = unified_diff(
            &text_a,
            &text_b,
            &format!("A:page{page}"),
            &format!("B:page{page}"),
            DIFF_CONTEXT_LINES,
        );
        let similarity = similarity(&text_a, &text_b);
        let overlay = crate::compute_overlay(image_a, image_b, &self.settings.overlay_params());

        tracing::debug!(
            page,
            similarity,
            boxes = overlay.boxes.len(),
            issues = issues.len(),
            "page compared"
        );

        PageDiffResult {
            index,
            similarity,
            boxes: overlay.boxes,
            difference_ratio: overlay.difference_ratio,
            overlay: overlay.overlay,
            text_a,
            text_b,
            text_diff,
            issues,
        }
    }

    /// Compare every page in order, handing each result to `sink`.
    ///
    /// The sink is consulted after every page; returning
    /// [`ControlFlow::Break`] stops the run before the next page starts.
    pub fn run<F>(&self, mut sink: F) -> RunSummary
    where
        F: FnMut(PageDiffResult) -> ControlFlow<()>,
    {
        let pages_total = self.page_count();
        tracing::info!(
            pages_a = self.a.page_count(),
            pages_b = self.b.page_count(),
            "comparison started"
        );

        let mut pages_compared = 0;
        let mut stopped = false;
        for index in 0..pages_total {
            let result = self.compare_page(index);
            pages_compared += 1;
            log_progress(pages_compared, pages_total);
            if sink(result).is_break() {
                stopped = true;
                break;
            }
        }

        finish(pages_total, pages_compared, stopped)
    }

    /// Render page `index` of `source` and extract its band text,
    /// substituting placeholders on failure.
    fn load<S: PageSource>(
        &self,
        source: &S,
        side: Side,
        index: usize,
        issues: &mut Vec<PageIssue>,
    ) -> (RgbImage, String) {
        let page = index + 1;
        if index >= source.page_count() {
            tracing::warn!(page, side = side.label(), "page missing, comparing against blank page");
            issues.push(PageIssue::MissingPage { side });
            return (placeholder_page(), String::new());
        }

        let text = match source.page_text(index) {
            Ok(page_text) => normalize_text(&select_band_text(
                &page_text,
                self.settings.header_ignore_ratio(),
                self.settings.footer_ignore_ratio(),
            )),
            Err(e) => {
                tracing::warn!(page, side = side.label(), error = %e, "text extraction failed");
                issues.push(PageIssue::Text {
                    side,
                    message: e.to_string(),
                });
                String::new()
            }
        };

        let image = match source.render_page(index, self.settings.render_options()) {
            Ok(image) => crate::blur::gaussian_blur_rgb(&image, self.settings.blur_radius()),
            Err(e) => {
                tracing::warn!(page, side = side.label(), error = %e, "render failed, using placeholder");
                issues.push(PageIssue::Render {
                    side,
                    message: e.to_string(),
                });
                placeholder_page()
            }
        };

        (image, text)
    }
}

#[cfg(feature = "parallel")]
impl<A, B> Comparison<A, B>
where
    A: PageSource + Sync,
    B: PageSource + Sync,
{
    /// Like [`run`](Self::run), comparing up to [`PAGE_BATCH`] pages
    /// concurrently.
    ///
    /// Pages within a batch are computed in parallel; results reach the
    /// sink in page order. A stop request takes effect at the next page
    /// handed to the sink; the rest of that batch is discarded.
    pub fn run_parallel<F>(&self, mut sink: F) -> RunSummary
    where
        F: FnMut(PageDiffResult) -> ControlFlow<()>,
    {
        use rayon::prelude::*;

        let pages_total = self.page_count();
        tracing::info!(
            pages_a = self.a.page_count(),
            pages_b = self.b.page_count(),
            batch = PAGE_BATCH,
            "parallel comparison started"
        );

        let mut pages_compared = 0;
        let mut start = 0;
        while start < pages_total {
            let end = (start + PAGE_BATCH).min(pages_total);
            // Indexed collect keeps page order.
            let batch: Vec<PageDiffResult> = (start..end)
                .into_par_iter()
                .map(|index| self.compare_page(index))
                .collect();

            for result in batch {
                pages_compared += 1;
                log_progress(pages_compared, pages_total);
                if sink(result).is_break() {
                    return finish(pages_total, pages_compared, true);
                }
            }
            start = end;
        }

        finish(pages_total, pages_compared, false)
    }
}

fn log_progress(done: usize, total: usize) {
    if done % PAGE_BATCH == 0 || done == total {
        tracing::info!(done, total, "pages compared");
    }
}

fn finish(pages_total: usize, pages_compared: usize, stopped: bool) -> RunSummary {
    if stopped {
        tracing::info!(pages_compared, pages_total, "comparison stopped early");
    } else {
        tracing::info!(pages_compared, "comparison finished");
    }
    RunSummary {
        pages_total,
        pages_compared,
        stopped,
    }
}
