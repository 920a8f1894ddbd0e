//! Overlay diagnostics: timing and counts for each pipeline stage.
//!
//! These diagnostics are permanent instrumentation for threshold tuning.
//! [`compute_overlay_with_diagnostics`] runs the staged pipeline and
//! records one [`StageDiagnostics`] per stage.
//!
//! The core does not read clocks itself: timing goes through the
//! [`Clock`] trait, so front ends supply `std::time::Instant` and tests
//! supply a deterministic fake.
//!
//! Durations go over the wire as `f64` seconds.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::OverlayParams;
use crate::mask::DifferenceKind;
use crate::pipeline::{OverlayPipeline, PipelineStage, StagedOverlay};
use crate::types::RgbImage;

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// A point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// `#[serde(with)]` adapter for `Duration`.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Write `duration` as `f64` seconds.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Read `f64` seconds back into a `Duration`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from one overlay computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayDiagnostics {
    /// Stage 1: padding to a common size.
    pub normalize: StageDiagnostics,
    /// Stage 2: delta and threshold.
    pub mask: StageDiagnostics,
    /// Stage 3: connected-component extraction.
    pub components: StageDiagnostics,
    /// Stage 4: box merging and area filter.
    pub merge: StageDiagnostics,
    /// Stage 5: overlay drawing.
    pub overlay: StageDiagnostics,
    /// Total wall-clock duration of the pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Page-level counts.
    pub summary: OverlaySummary,
}

/// Timing and counts for one overlay stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Time spent in the stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// The inputs before any processing.
    Input {
        /// First image width.
        a_width: u32,
        /// First image height.
        a_height: u32,
        /// Second image width.
        b_width: u32,
        /// Second image height.
        b_height: u32,
    },
    /// Padding metrics.
    Normalize {
        /// Common width after padding.
        width: u32,
        /// Common height after padding.
        height: u32,
        /// Whether either image needed padding.
        padded: bool,
    },
    /// Delta and threshold metrics.
    Mask {
        /// Pixel threshold applied to the delta.
        threshold: u8,
        /// Delta reduction used.
        difference: DifferenceKind,
        /// Pixels at or above the threshold.
        foreground_pixels: u64,
        /// Total pixel count.
        total_pixels: u64,
    },
    /// Component extraction metrics.
    Components {
        /// Seed scan stride.
        stride: u32,
        /// Noise floor in member pixels.
        min_cluster_pixels: u64,
        /// Clusters kept.
        component_count: usize,
    },
    /// Merge metrics.
    Merge {
        /// Merge padding in pixels.
        padding: u32,
        /// Minimum box area.
        min_box_area: u32,
        /// Boxes entering the merge.
        input_count: usize,
        /// Boxes after merging.
        merged_count: usize,
        /// Boxes after the area filter.
        final_count: usize,
    },
    /// Overlay metrics.
    Overlay {
        /// Boxes drawn.
        box_count: usize,
        /// Overlay width.
        width: u32,
        /// Overlay height.
        height: u32,
    },
}

/// High-level summary of one overlay computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySummary {
    /// Padded image width.
    pub width: u32,
    /// Padded image height.
    pub height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Share of pixels at or above the threshold.
    pub difference_ratio: f64,
    /// Clusters kept by the extractor.
    pub component_count: usize,
    /// Final boxes.
    pub box_count: usize,
}

/// Run the staged overlay pipeline, timing each stage with `clock`.
#[must_use]
pub fn compute_overlay_with_diagnostics<C: Clock>(
    a: RgbImage,
    b: RgbImage,
    params: OverlayParams,
    clock: &C,
) -> (StagedOverlay, OverlayDiagnostics) {
    let start = clock.now();
    let pending = OverlayPipeline::new(a, b, params);

    let (normalized, normalize) = timed(clock, || pending.normalize());
    let (differenced, mask) = timed(clock, || normalized.difference());
    let (extracted, components) = timed(clock, || differenced.extract());
    let (merged, merge) = timed(clock, || extracted.merge());
    let (rendered, overlay) = timed(clock, || merged.render());
    let total_duration = clock.elapsed(&start);

    let staged = rendered.into_result();
    let summary = OverlaySummary {
        width: staged.overlay.width(),
        height: staged.overlay.height(),
        pixel_count: staged.mask.dimensions().pixel_count(),
        difference_ratio: staged.mask.ratio(),
        component_count: staged.components.len(),
        box_count: staged.boxes.len(),
    };

    let diagnostics = OverlayDiagnostics {
        normalize,
        mask,
        components,
        merge,
        overlay,
        total_duration,
        summary,
    };
    tracing::debug!(
        boxes = diagnostics.summary.box_count,
        total_ms = duration_ms(total_duration),
        "overlay diagnostics collected"
    );
    (staged, diagnostics)
}

/// Advance one stage under the clock.
fn timed<C: Clock, S: PipelineStage>(
    clock: &C,
    advance: impl FnOnce() -> S,
) -> (S, StageDiagnostics) {
    let start = clock.now();
    let stage = advance();
    let duration = clock.elapsed(&start);
    let diagnostics = StageDiagnostics {
        duration,
        metrics: stage.metrics(),
    };
    tracing::trace!(stage = S::NAME, index = S::INDEX, ?duration, "stage complete");
    (stage, diagnostics)
}

impl OverlayDiagnostics {
    /// Stages in execution order, with their display names.
    #[must_use]
    pub const fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("normalize", &self.normalize),
            ("mask", &self.mask),
            ("components", &self.components),
            ("merge", &self.merge),
            ("overlay", &self.overlay),
        ]
    }

    /// Fixed-width text table of the stages, for terminals.
    #[must_use]
    pub fn report(&self) -> String {
        let summary = &self.summary;
        let total_ms = duration_ms(self.total_duration);
        let mut out = String::new();

        let _ = writeln!(
            out,
            "overlay {}x{}: {total_ms:.3}ms, {:.3}% differing, {} components -> {} boxes",
            summary.width,
            summary.height,
            summary.difference_ratio * 100.0,
            summary.component_count,
            summary.box_count,
        );
        for (name, stage) in self.stages() {
            let ms = duration_ms(stage.duration);
            let share = if total_ms > 0.0 { ms / total_ms * 100.0 } else { 0.0 };
            let _ = writeln!(
                out,
                "  {name:<12} {ms:>9.3}ms {share:>5.1}%  {}",
                format_metrics(&stage.metrics),
            );
        }
        out
    }
}

/// Milliseconds in `d`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// One-line summary of a stage's counts.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Input {
            a_width,
            a_height,
            b_width,
            b_height,
        } => format!("a={a_width}x{a_height} b={b_width}x{b_height}"),
        StageMetrics::Normalize {
            width,
            height,
            padded,
        } => {
            let note = if *padded { " (padded)" } else { "" };
            format!("{width}x{height}{note}")
        }
        StageMetrics::Mask {
            threshold,
            difference,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("thr={threshold} {difference:?} on={foreground_pixels} ({density:.2}%)")
        }
        StageMetrics::Components {
            stride,
            min_cluster_pixels,
            component_count,
        } => format!("stride={stride} floor={min_cluster_pixels}px {component_count} clusters"),
        StageMetrics::Merge {
            padding,
            min_box_area,
            input_count,
            merged_count,
            final_count,
        } => format!(
            "pad={padding} area>={min_box_area} {input_count}->{merged_count}->{final_count} boxes",
        ),
        StageMetrics::Overlay {
            box_count,
            width,
            height,
        } => format!("{box_count} boxes on {width}x{height}"),
    }
}
