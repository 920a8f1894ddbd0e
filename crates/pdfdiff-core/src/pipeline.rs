//! Incremental overlay pipeline: advance stage by stage, inspecting each
//! intermediate before continuing.
//!
//! [`crate::compute_overlay`] runs every stage in one call and keeps only
//! the overlay and the final boxes. [`OverlayPipeline`] lets the caller
//! drive execution one step at a time:
//!
//! ```rust
//! # use pdfdiff_core::{OverlayParams, OverlayPipeline, RgbImage};
//! let a = RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]));
//! let b = a.clone();
//! let rendered = OverlayPipeline::new(a, b, OverlayParams::default())
//!     .normalize()
//!     .difference()
//!     .extract()
//!     .merge()
//!     .render();
//!
//! assert!(rendered.boxes().is_empty());
//! let staged = rendered.into_result();
//! assert!(staged.mask.is_empty());
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! the intermediates computed so far.
//!
//! # Memory
//!
//! From [`Differenced`] onward every stage holds both padded page images,
//! the delta heat map, and the mask. For a 3000 x 3000 page that is
//! roughly 72 MB until the pipeline is dropped. Callers comparing many
//! pages should use [`crate::compute_overlay`], which drops the
//! intermediates as soon as the overlay is drawn.

use crate::diagnostics::StageMetrics;
use crate::mask::DifferenceMask;
use crate::types::{BoundingBox, Dimensions, GrayImage, RgbImage, RgbaImage};
use crate::OverlayParams;

/// Entry point of the staged overlay computation.
pub struct OverlayPipeline;

impl OverlayPipeline {
    /// Start a pipeline comparing `a` against `b`; the overlay is drawn on
    /// `b`.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(a: RgbImage, b: RgbImage, params: OverlayParams) -> Pending {
        Pending { params, a, b }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing.
///
/// Call [`normalize`](Self::normalize) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .normalize() to continue"]
pub struct Pending {
    params: OverlayParams,
    a: RgbImage,
    b: RgbImage,
}

impl Pending {
    /// The two input images as given.
    #[must_use]
    pub const fn inputs(&self) -> (&RgbImage, &RgbImage) {
        (&self.a, &self.b)
    }

    /// Pad both images to their common size.
    pub fn normalize(self) -> Normalized {
        let original = (Dimensions::of(&self.a), Dimensions::of(&self.b));
        let (a, b) = crate::normalize::pad_to_same(self.a, self.b);
        Normalized {
            params: self.params,
            a,
            b,
            original,
        }
    }
}

// ───────────────────────── Stage 1: Normalized ───────────────────────

/// Pipeline state after padding both images to the same size.
///
/// Call [`difference`](Self::difference) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .difference() to continue"]
pub struct Normalized {
    params: OverlayParams,
    a: RgbImage,
    b: RgbImage,
    original: (Dimensions, Dimensions),
}

impl Normalized {
    /// The padded image pair.
    #[must_use]
    pub const fn images(&self) -> (&RgbImage, &RgbImage) {
        (&self.a, &self.b)
    }

    /// Common size of the padded images.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.b)
    }

    /// Build the delta heat map and the binary mask.
    pub fn difference(self) -> Differenced {
        let (delta, mask) = self.params.difference(&self.a, &self.b);
        Differenced {
            params: self.params,
            a: self.a,
            b: self.b,
            delta,
            mask,
        }
    }
}

// ───────────────────────── Stage 2: Differenced ──────────────────────

/// Pipeline state after differencing.
///
/// Call [`extract`](Self::extract) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .extract() to continue"]
pub struct Differenced {
    params: OverlayParams,
    a: RgbImage,
    b: RgbImage,
    delta: GrayImage,
    mask: DifferenceMask,
}

impl Differenced {
    /// Grayscale delta: brighter is more different.
    #[must_use]
    pub const fn heat_map(&self) -> &GrayImage {
        &self.delta
    }

    /// The thresholded mask.
    #[must_use]
    pub const fn mask(&self) -> &DifferenceMask {
        &self.mask
    }

    /// Group mask pixels into component boxes.
    pub fn extract(self) -> Extracted {
        let components = self.params.extract(&self.mask);
        Extracted {
            params: self.params,
            a: self.a,
            b: self.b,
            delta: self.delta,
            mask: self.mask,
            components,
        }
    }
}

// ───────────────────────── Stage 3: Extracted ────────────────────────

/// Pipeline state after connected-component extraction.
///
/// Call [`merge`](Self::merge) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .merge() to continue"]
pub struct Extracted {
    params: OverlayParams,
    a: RgbImage,
    b: RgbImage,
    delta: GrayImage,
    mask: DifferenceMask,
    components: Vec<BoundingBox>,
}

impl Extracted {
    /// One box per cluster that passed the noise filter.
    #[must_use]
    pub fn components(&self) -> &[BoundingBox] {
        &self.components
    }

    /// Merge nearby components and apply the minimum-area filter.
    pub fn merge(self) -> Merged {
        let merged = self.params.merge(&self.components);
        let boxes = self.params.keep(merged.clone());
        Merged {
            params: self.params,
            a: self.a,
            b: self.b,
            delta: self.delta,
            mask: self.mask,
            components: self.components,
            merged,
            boxes,
        }
    }
}

// ───────────────────────── Stage 4: Merged ───────────────────────────

/// Pipeline state after merging and area filtering.
///
/// Call [`render`](Self::render) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .render() to continue"]
pub struct Merged {
    params: OverlayParams,
    a: RgbImage,
    b: RgbImage,
    delta: GrayImage,
    mask: DifferenceMask,
    components: Vec<BoundingBox>,
    merged: Vec<BoundingBox>,
    boxes: Vec<BoundingBox>,
}

impl Merged {
    /// Boxes after merging, before the area filter.
    #[must_use]
    pub fn merged(&self) -> &[BoundingBox] {
        &self.merged
    }

    /// Final boxes.
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Draw the final boxes on a copy of the padded second image.
    pub fn render(self) -> Rendered {
        let overlay = crate::overlay::render_overlay(&self.b, &self.boxes);
        Rendered {
            staged: StagedOverlay {
                params: self.params,
                a: self.a,
                b: self.b,
                heat_map: self.delta,
                mask: self.mask,
                components: self.components,
                merged: self.merged,
                boxes: self.boxes,
                overlay,
            },
        }
    }
}

// ───────────────────────── Stage 5: Rendered ─────────────────────────

/// Final pipeline state.
///
/// Call [`into_result`](Self::into_result) to take every intermediate.
pub struct Rendered {
    staged: StagedOverlay,
}

impl Rendered {
    /// The overlay image.
    #[must_use]
    pub const fn overlay(&self) -> &RgbaImage {
        &self.staged.overlay
    }

    /// Final boxes.
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.staged.boxes
    }

    /// Consume the pipeline, returning all intermediates.
    #[must_use]
    pub fn into_result(self) -> StagedOverlay {
        self.staged
    }
}

/// Every intermediate of one overlay computation.
#[derive(Debug, Clone)]
pub struct StagedOverlay {
    /// Parameters the pipeline ran with.
    pub params: OverlayParams,
    /// First image, padded.
    pub a: RgbImage,
    /// Second image, padded.
    pub b: RgbImage,
    /// Grayscale delta of the padded pair.
    pub heat_map: GrayImage,
    /// Thresholded delta.
    pub mask: DifferenceMask,
    /// Component boxes before merging.
    pub components: Vec<BoundingBox>,
    /// Boxes after merging, before the area filter.
    pub merged: Vec<BoundingBox>,
    /// Final boxes.
    pub boxes: Vec<BoundingBox>,
    /// Second image with the final boxes drawn on it.
    pub overlay: RgbaImage,
}

// ──────────────────────── PipelineStage trait ─────────────────────────

/// Total number of stages, `Pending` included.
pub const STAGE_COUNT: usize = 6;

/// Implemented by every pipeline stage so diagnostics can label and
/// measure them uniformly.
pub trait PipelineStage {
    /// Short stage name (e.g. `"mask"`).
    const NAME: &str;

    /// Zero-based position in the pipeline.
    const INDEX: usize;

    /// Metrics describing this stage's output.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for Pending {
    const NAME: &str = "input";
    const INDEX: usize = 0;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Input {
            a_width: self.a.width(),
            a_height: self.a.height(),
            b_width: self.b.width(),
            b_height: self.b.height(),
        }
    }
}

impl PipelineStage for Normalized {
    const NAME: &str = "normalize";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        let (a, b) = self.original;
        let padded = self.dimensions();
        StageMetrics::Normalize {
            width: padded.width,
            height: padded.height,
            padded: a != padded || b != padded,
        }
    }
}

impl PipelineStage for Differenced {
    const NAME: &str = "mask";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Mask {
            threshold: self.params.pixel_threshold,
            difference: self.params.difference,
            foreground_pixels: self.mask.foreground_count(),
            total_pixels: self.mask.dimensions().pixel_count(),
        }
    }
}

impl PipelineStage for Extracted {
    const NAME: &str = "components";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Components {
            stride: self.params.stride,
            min_cluster_pixels: crate::components::min_cluster_pixels(self.params.min_box_area),
            component_count: self.components.len(),
        }
    }
}

impl PipelineStage for Merged {
    const NAME: &str = "merge";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Merge {
            padding: self.params.merge_padding,
            min_box_area: self.params.min_box_area,
            input_count: self.components.len(),
            merged_count: self.merged.len(),
            final_count: self.boxes.len(),
        }
    }
}

impl PipelineStage for Rendered {
    const NAME: &str = "overlay";
    const INDEX: usize = 5;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Overlay {
            box_count: self.staged.boxes.len(),
            width: self.staged.overlay.width(),
            height: self.staged.overlay.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
    }

    fn with_square(mut image: RgbImage, x0: u32, y0: u32, size: u32) -> RgbImage {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        image
    }

    #[test]
    fn stages_expose_intermediates() {
        let a = white(120, 100);
        let b = with_square(white(100, 120), 10, 10, 50);
        let params = OverlayParams::default();

        let pending = OverlayPipeline::new(a, b, params);
        assert_eq!(pending.inputs().0.dimensions(), (120, 100));
        assert!(matches!(
            pending.metrics(),
            StageMetrics::Input { a_width: 120, b_height: 120, .. }
        ));

        let normalized = pending.normalize();
        assert_eq!(normalized.dimensions(), Dimensions::new(120, 120));
        assert!(matches!(
            normalized.metrics(),
            StageMetrics::Normalize { padded: true, .. }
        ));

        let differenced = normalized.difference();
        assert_eq!(differenced.mask().foreground_count(), 2500);
        assert_eq!(differenced.heat_map().get_pixel(20, 20).0[0], 255);

        let extracted = differenced.extract();
        assert_eq!(extracted.components(), &[BoundingBox::new(10, 10, 59, 59)]);

        let merged = extracted.merge();
        assert_eq!(merged.merged().len(), 1);
        assert_eq!(merged.boxes().len(), 1);

        let rendered = merged.render();
        assert_eq!(rendered.overlay().dimensions(), (120, 120));

        let staged = rendered.into_result();
        assert_eq!(staged.boxes, vec![BoundingBox::new(10, 10, 59, 59)]);
        assert_eq!(staged.a.dimensions(), staged.b.dimensions());
    }

    #[test]
    fn stage_indices_are_sequential() {
        let indices = [
            Pending::INDEX,
            Normalized::INDEX,
            Differenced::INDEX,
            Extracted::INDEX,
            Merged::INDEX,
            Rendered::INDEX,
        ];
        assert_eq!(indices, [0, 1, 2, 3, 4, 5]);
        assert_eq!(indices.len(), STAGE_COUNT);
    }

    #[test]
    fn area_filter_runs_after_merge() {
        // Two 3x3 specks 3 px apart: each is below the area filter alone,
        // but merge padding joins them into a box large enough to keep.
        let b = with_square(with_square(white(40, 40), 10, 10, 3), 16, 10, 3);
        let params = OverlayParams {
            min_box_area: 16,
            merge_padding: 5,
            ..OverlayParams::default()
        };
        let merged = OverlayPipeline::new(white(40, 40), b, params)
            .normalize()
            .difference()
            .extract()
            .merge();
        assert_eq!(merged.boxes(), &[BoundingBox::new(10, 10, 18, 12)]);
    }
}
