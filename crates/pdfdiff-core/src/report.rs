//! Document-level aggregation of page results.
//!
//! [`ReportAssembler`] folds [`PageDiffResult`]s into a
//! [`DocumentSummary`] as they stream out of a comparison run, keeping
//! only the text and per-page figures. Overlays are not retained; front
//! ends that render reports write them out as pages arrive.

use serde::{Deserialize, Serialize};

use crate::compare::{PageDiffResult, PageIssue, Side};
use crate::text::similarity;
use crate::types::BoundingBox;

/// Per-page figures kept in a [`DocumentSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// One-based page number.
    pub page: usize,
    /// Text similarity ratio.
    pub similarity: f64,
    /// Whether the similarity fell below the warning level.
    pub low_similarity: bool,
    /// Final difference boxes.
    pub boxes: Vec<BoundingBox>,
    /// Share of differing pixels.
    pub difference_ratio: f64,
    /// Unified text diff; empty when the texts match.
    pub text_diff: String,
    /// Substitutions made for this page.
    pub issues: Vec<PageIssue>,
}

/// Whole-document comparison summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Similarity of the whole documents' texts, each side's page texts
    /// joined with newlines.
    pub overall_similarity: f64,
    /// Similarity below which a page was flagged.
    pub warn_threshold: f64,
    /// Pages whose similarity fell below `warn_threshold`, one-based.
    pub low_pages: Vec<usize>,
    /// Total number of boxes across all pages.
    pub total_boxes: usize,
    /// Pages with at least one substitution, one-based.
    pub degraded_pages: Vec<usize>,
    /// Per-page figures, in page order.
    pub pages: Vec<PageSummary>,
}

impl DocumentSummary {
    /// Whether nothing differs: every page has similarity `1.0`, no
    /// boxes, and no substitutions.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.total_boxes == 0
            && self.degraded_pages.is_empty()
            && self.pages.iter().all(|p| p.text_diff.is_empty())
    }
}

/// Streams page results into a [`DocumentSummary`].
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    warn_threshold: f64,
    texts_a: Vec<String>,
    texts_b: Vec<String>,
    pages: Vec<PageSummary>,
}

impl ReportAssembler {
    /// Start an empty report flagging pages below `warn_threshold`.
    #[must_use]
    pub const fn new(warn_threshold: f64) -> Self {
        Self {
            warn_threshold,
            texts_a: Vec::new(),
            texts_b: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// Record one page. Pages are expected in order.
    pub fn push(&mut self, result: &PageDiffResult) {
        let low_similarity = result.similarity < self.warn_threshold;
        if low_similarity {
            tracing::debug!(
                page = result.page_number(),
                similarity = result.similarity,
                "page below similarity warning level"
            );
        }
        // A side that ran out of pages contributes no text, not an empty page.
        if !result.is_missing(Side::A) {
            self.texts_a.push(result.text_a.clone());
        }
        if !result.is_missing(Side::B) {
            self.texts_b.push(result.text_b.clone());
        }
        self.pages.push(PageSummary {
            page: result.page_number(),
            similarity: result.similarity,
            low_similarity,
            boxes: result.boxes.clone(),
            difference_ratio: result.difference_ratio,
            text_diff: result.text_diff.clone(),
            issues: result.issues.clone(),
        });
    }

    /// Pages recorded so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Compute document-level figures.
    #[must_use]
    pub fn finish(self) -> DocumentSummary {
        let overall_similarity = similarity(&self.texts_a.join("\n"), &self.texts_b.join("\n"));
        let low_pages = self
            .pages
            .iter()
            .filter(|p| p.low_similarity)
            .map(|p| p.page)
            .collect();
        let degraded_pages = self
            .pages
            .iter()
            .filter(|p| !p.issues.is_empty())
            .map(|p| p.page)
            .collect();
        let total_boxes = self.pages.iter().map(|p| p.boxes.len()).sum();

        tracing::info!(
            pages = self.pages.len(),
            overall_similarity,
            total_boxes,
            "report assembled"
        );

        DocumentSummary {
            overall_similarity,
            warn_threshold: self.warn_threshold,
            low_pages,
            total_boxes,
            degraded_pages,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbaImage;

    fn result(index: usize, a: &str, b: &str, boxes: usize) -> PageDiffResult {
        PageDiffResult {
            index,
            similarity: similarity(a, b),
            boxes: (0..boxes)
                .map(|i| {
                    let i = u32::try_from(i).unwrap() * 100;
                    BoundingBox::new(i, 0, i + 50, 50)
                })
                .collect(),
            difference_ratio: 0.0,
            overlay: RgbaImage::new(1, 1),
            text_a: a.to_owned(),
            text_b: b.to_owned(),
            text_diff: if a == b { String::new() } else { "diff".to_owned() },
            issues: Vec::new(),
        }
    }

    #[test]
    fn empty_report() {
        let summary = ReportAssembler::new(0.985).finish();
        assert!((summary.overall_similarity - 1.0).abs() < f64::EPSILON);
        assert!(summary.pages.is_empty());
        assert!(summary.is_identical());
    }

    #[test]
    fn aggregates_pages() {
        let mut report = ReportAssembler::new(0.985);
        report.push(&result(0, "same", "same", 0));
        report.push(&result(1, "alpha beta", "alpha gamma", 2));
        report.push(&result(2, "x", "x", 1));
        assert_eq!(report.len(), 3);

        let summary = report.finish();
        assert_eq!(summary.low_pages, vec![2]);
        assert_eq!(summary.total_boxes, 3);
        assert!(summary.overall_similarity < 1.0);
        assert!(summary.overall_similarity > 0.5);
        assert!(!summary.is_identical());
        assert_eq!(summary.pages[1].page, 2);
        assert!(summary.pages[1].low_similarity);
    }

    #[test]
    fn overall_similarity_joins_pages_with_newlines() {
        let mut report = ReportAssembler::new(0.5);
        // Text moved across a page break still matches overall.
        report.push(&result(0, "one", "one\ntwo", 0));
        report.push(&result(1, "two\nthree", "three", 0));
        let summary = report.finish();
        assert!((summary.overall_similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degraded_pages_are_listed() {
        let mut report = ReportAssembler::new(0.985);
        let mut page = result(0, "", "", 0);
        page.issues.push(PageIssue::MissingPage { side: Side::A });
        report.push(&page);
        let summary = report.finish();
        assert_eq!(summary.degraded_pages, vec![1]);
        assert!(!summary.is_identical());
    }

    #[test]
    fn missing_pages_add_no_text_to_overall_similarity() {
        let mut report = ReportAssembler::new(0.985);
        report.push(&result(0, "x", "x", 0));
        report.push(&result(1, "y", "y", 0));
        let mut extra = result(2, "z", "", 0);
        extra.issues.push(PageIssue::MissingPage { side: Side::B });
        report.push(&extra);

        // "x\ny\nz" against "x\ny": 2 * 3 / 8.
        let summary = report.finish();
        assert!((summary.overall_similarity - 0.75).abs() < 1e-12);
    }

    #[test]
    fn summary_serializes() {
        let mut report = ReportAssembler::new(0.985);
        report.push(&result(0, "a", "b", 1));
        let json = serde_json::to_value(report.finish()).unwrap();
        assert_eq!(json["low_pages"][0], 1);
        assert_eq!(json["pages"][0]["boxes"][0]["x1"], 50);
    }
}
