//! pdfdiff-core: Pure page comparison core (sans-IO).
//!
//! Compares two rendered pages and their text through:
//! pad to common size -> per-pixel delta -> threshold mask ->
//! connected components -> box merging -> area filter -> overlay.
//!
//! This crate has **no I/O dependencies** -- pages arrive through the
//! [`PageSource`] trait and results leave as in-memory values. PDF
//! rendering, file handling, and report writing live in the front ends.

pub mod blur;
pub mod compare;
pub mod components;
pub mod diagnostics;
pub mod mask;
pub mod merge;
pub mod normalize;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod sequence;
pub mod settings;
pub mod source;
pub mod text;
pub mod types;

use serde::{Deserialize, Serialize};

pub use compare::{Comparison, PageDiffResult, PageIssue, RunSummary, Side};
pub use components::{ComponentExtractor, ComponentExtractorKind};
pub use diagnostics::{Clock, OverlayDiagnostics, compute_overlay_with_diagnostics};
pub use mask::{DifferenceKind, DifferenceMask};
pub use overlay::OverlayStyle;
pub use pipeline::{OverlayPipeline, PipelineStage, StagedOverlay};
pub use report::{DocumentSummary, PageSummary, ReportAssembler};
pub use settings::{ConfigError, DiffSettings, DiffSettingsParams, Preset};
pub use source::{
    InMemoryPage, InMemorySource, PageSource, RenderOptions, RenderPlan, SourceError,
};
pub use text::{PageText, TextBlock};
pub use types::{BoundingBox, Dimensions, GrayImage, RgbImage, RgbaImage};

/// The subset of [`DiffSettings`] that governs the image comparison of
/// one page pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayParams {
    /// Minimum grayscale delta counted as a difference.
    pub pixel_threshold: u8,
    /// Boxes with smaller corner-distance area are dropped.
    pub min_box_area: u32,
    /// Boxes within this many pixels of each other are merged.
    pub merge_padding: u32,
    /// How per-pixel deltas are reduced to one grayscale magnitude.
    pub difference: DifferenceKind,
    /// Seed scan stride of the component extractor.
    pub stride: u32,
}

impl Default for OverlayParams {
    fn default() -> Self {
        DiffSettings::STANDARD.overlay_params()
    }
}

// Per-stage steps shared by `compute_overlay` and `OverlayPipeline`.
impl OverlayParams {
    /// Heat map and mask of a padded pair.
    pub(crate) fn difference(&self, a: &RgbImage, b: &RgbImage) -> (GrayImage, DifferenceMask) {
        let delta = mask::delta_image(a, b, self.difference)
            // Callers pad both sides to the same size first.
            .unwrap_or_else(|| GrayImage::new(b.width(), b.height()));
        let mask = DifferenceMask::from_delta(&delta, self.pixel_threshold);
        (delta, mask)
    }

    /// Component boxes of `mask`.
    pub(crate) fn extract(&self, mask: &DifferenceMask) -> Vec<BoundingBox> {
        ComponentExtractorKind::StridedFloodFill {
            stride: self.stride,
        }
        .extract(mask, self.min_box_area)
    }

    /// Greedy merge of `components`.
    pub(crate) fn merge(&self, components: &[BoundingBox]) -> Vec<BoundingBox> {
        merge::merge_boxes(components, self.merge_padding)
    }

    /// Merged boxes that pass the area filter.
    pub(crate) fn keep(&self, merged: Vec<BoundingBox>) -> Vec<BoundingBox> {
        merge::filter_min_area(merged, self.min_box_area)
    }
}

/// Outcome of comparing one image pair.
#[derive(Debug, Clone)]
pub struct OverlayResult {
    /// Second image, padded, with the final boxes drawn on it.
    pub overlay: RgbaImage,
    /// Final difference boxes, in merge order.
    pub boxes: Vec<BoundingBox>,
    /// Common size both images were padded to.
    pub dimensions: Dimensions,
    /// Share of pixels whose delta reached the threshold.
    pub difference_ratio: f64,
}

impl From<StagedOverlay> for OverlayResult {
    fn from(staged: StagedOverlay) -> Self {
        Self {
            dimensions: Dimensions::of(&staged.overlay),
            difference_ratio: staged.mask.ratio(),
            overlay: staged.overlay,
            boxes: staged.boxes,
        }
    }
}

/// Compare two page images and draw the differences on the second.
///
/// # Steps
///
/// 1. Pad both images with white to their common size
/// 2. Per-pixel delta, thresholded into a binary mask
/// 3. Strided 8-connected flood fill into component boxes
/// 4. Greedy merge of boxes closer than `merge_padding`
/// 5. Drop boxes below `min_box_area`
/// 6. Draw the survivors on the padded second image
///
/// Intermediates are released as soon as the next step no longer needs
/// them. Use [`OverlayPipeline`] to inspect them instead.
#[must_use]
pub fn compute_overlay(a: RgbImage, b: RgbImage, params: &OverlayParams) -> OverlayResult {
    let (a, b) = normalize::pad_to_same(a, b);
    let dimensions = Dimensions::of(&b);

    let mask = params.difference(&a, &b).1;
    drop(a);
    let difference_ratio = mask.ratio();

    let components = params.extract(&mask);
    drop(mask);

    let boxes = params.keep(params.merge(&components));
    let overlay = overlay::render_overlay(&b, &boxes);

    tracing::trace!(
        width = dimensions.width,
        height = dimensions.height,
        components = components.len(),
        boxes = boxes.len(),
        "overlay computed"
    );

    OverlayResult {
        overlay,
        boxes,
        dimensions,
        difference_ratio,
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn fill(image: &mut RgbImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>) {
        for yy in y {
            for xx in x.clone() {
                image.put_pixel(xx, yy, Rgb([0, 0, 0]));
            }
        }
    }

    #[test]
    fn identical_pages_have_no_boxes() {
        let result = compute_overlay(white(120, 80), white(120, 80), &OverlayParams::default());
        assert!(result.boxes.is_empty());
        assert!(result.difference_ratio.abs() < f64::EPSILON);
        assert_eq!(result.dimensions, Dimensions::new(120, 80));
        assert!(result.overlay.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn single_block_yields_one_box() {
        let mut b = white(200, 200);
        fill(&mut b, 40..90, 40..90);
        let result = compute_overlay(white(200, 200), b, &OverlayParams::default());
        assert_eq!(result.boxes, vec![BoundingBox::new(40, 40, 89, 89)]);
    }

    #[test]
    fn nearby_blocks_merge() {
        let mut b = white(300, 200);
        fill(&mut b, 20..60, 20..60);
        fill(&mut b, 65..105, 20..60);
        let result = compute_overlay(white(300, 200), b, &OverlayParams::default());
        assert_eq!(result.boxes, vec![BoundingBox::new(20, 20, 104, 59)]);
    }

    #[test]
    fn specks_below_min_area_are_dropped() {
        let mut b = white(200, 200);
        fill(&mut b, 10..13, 10..13);
        let result = compute_overlay(white(200, 200), b, &OverlayParams::default());
        assert!(result.boxes.is_empty());
        assert!(result.difference_ratio > 0.0);
    }

    #[test]
    fn different_sizes_are_padded() {
        let result = compute_overlay(white(100, 300), white(250, 120), &OverlayParams::default());
        assert_eq!(result.dimensions, Dimensions::new(250, 300));
        assert!(result.boxes.is_empty());
    }

    #[test]
    fn matches_staged_pipeline() {
        let mut b = white(200, 200);
        fill(&mut b, 30..80, 100..150);
        let params = OverlayParams::default();
        let direct = compute_overlay(white(200, 200), b.clone(), &params);
        let staged: OverlayResult = OverlayPipeline::new(white(200, 200), b, params)
            .normalize()
            .difference()
            .extract()
            .merge()
            .render()
            .into_result()
            .into();
        assert_eq!(direct.boxes, staged.boxes);
        assert_eq!(direct.dimensions, staged.dimensions);
        assert_eq!(direct.overlay, staged.overlay);
    }

    #[test]
    fn shared_steps_reproduce_pipeline_intermediates() {
        let mut b = white(200, 200);
        fill(&mut b, 20..60, 20..60);
        fill(&mut b, 65..105, 20..60);
        fill(&mut b, 150..153, 150..153);
        let params = OverlayParams::default();

        let (delta, mask) = params.difference(&white(200, 200), &b);
        let components = params.extract(&mask);
        let merged = params.merge(&components);
        let boxes = params.keep(merged.clone());

        let staged = OverlayPipeline::new(white(200, 200), b, params)
            .normalize()
            .difference()
            .extract()
            .merge()
            .render()
            .into_result();
        assert_eq!(delta, staged.heat_map);
        assert_eq!(components, staged.components);
        assert_eq!(merged, staged.merged);
        assert_eq!(boxes, staged.boxes);
        assert_eq!(boxes, vec![BoundingBox::new(20, 20, 104, 59)]);
    }

    #[test]
    fn difference_of_unpadded_pair_is_blank() {
        let params = OverlayParams::default();
        let (delta, mask) = params.difference(&white(10, 10), &white(20, 5));
        assert_eq!(delta.dimensions(), (20, 5));
        assert!(mask.is_empty());
    }
}
