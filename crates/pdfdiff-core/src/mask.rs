//! Difference mask: per-pixel deltas binarized against a threshold.
//!
//! Two equal-size RGB images are reduced to a single grayscale *delta*
//! image (the heat map: brighter means more different), then every delta
//! at or above the pixel threshold becomes a foreground pixel of the
//! [`DifferenceMask`].
//!
//! Subtraction is done on widened signed values, so `10 - 200` yields a
//! magnitude of 190 rather than wrapping around.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, GrayImage, RgbImage};

/// How the three per-channel deltas of a pixel are reduced to one
/// grayscale magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifferenceKind {
    /// Absolute per-channel difference, then the luminance of that
    /// difference color. A pure-red change registers even when the two
    /// colors happen to share a luminance.
    #[default]
    ChannelLuma,
    /// Luminance of each image, then the absolute difference of the two
    /// luminance values. Insensitive to hue-only changes.
    LumaDelta,
}

/// ITU-R 601-2 luma with 16-bit fixed-point weights and rounding.
///
/// The weights sum to `65536`, so white maps to 255 exactly.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;
    // Max value is 255 * 65536 + 0x8000, which shifts back into u8 range.
    #[allow(clippy::cast_possible_truncation)]
    let value = ((weighted + 0x8000) >> 16) as u8;
    value
}

/// Absolute difference of two bytes through signed arithmetic.
#[must_use]
pub fn abs_delta(a: u8, b: u8) -> u8 {
    let delta = (i16::from(a) - i16::from(b)).unsigned_abs();
    // |a - b| of two bytes always fits in a byte.
    u8::try_from(delta).unwrap_or(u8::MAX)
}

/// Compute the grayscale delta (heat map) of two equal-size images.
///
/// Returns `None` when the dimensions differ; pad with
/// [`pad_to_same`](crate::normalize::pad_to_same) first.
#[must_use]
pub fn delta_image(a: &RgbImage, b: &RgbImage, kind: DifferenceKind) -> Option<GrayImage> {
    if a.dimensions() != b.dimensions() {
        return None;
    }

    let (w, h) = a.dimensions();
    let mut delta = GrayImage::new(w, h);
    for ((out, pa), pb) in delta.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        let [ra, ga, ba] = pa.0;
        let [rb, gb, bb] = pb.0;
        out.0[0] = match kind {
            DifferenceKind::ChannelLuma => {
                luma(abs_delta(ra, rb), abs_delta(ga, gb), abs_delta(ba, bb))
            }
            DifferenceKind::LumaDelta => abs_delta(luma(ra, ga, ba), luma(rb, gb, bb)),
        };
    }
    Some(delta)
}

/// A binary per-pixel mask: set where the two images differ by at least
/// the pixel threshold.
///
/// Stored as a grayscale image with foreground `255` and background `0`
/// so it can be previewed or written out like any other raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferenceMask {
    image: GrayImage,
    foreground: u64,
}

impl DifferenceMask {
    /// Foreground value in the underlying image.
    pub const ON: u8 = 255;

    /// Binarize a delta image: pixels with `delta >= threshold` are set.
    #[must_use]
    pub fn from_delta(delta: &GrayImage, threshold: u8) -> Self {
        let mut foreground = 0;
        let image = GrayImage::from_fn(delta.width(), delta.height(), |x, y| {
            if delta.get_pixel(x, y).0[0] >= threshold {
                foreground += 1;
                image::Luma([Self::ON])
            } else {
                image::Luma([0])
            }
        });
        Self { image, foreground }
    }

    /// Build the mask of two equal-size images.
    ///
    /// Returns `None` when the dimensions differ.
    #[must_use]
    pub fn build(a: &RgbImage, b: &RgbImage, threshold: u8, kind: DifferenceKind) -> Option<Self> {
        delta_image(a, b, kind).map(|delta| Self::from_delta(&delta, threshold))
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the pixel at `(x, y)` is foreground. Out-of-range
    /// coordinates are background.
    #[must_use]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        x < self.image.width() && y < self.image.height() && self.image.get_pixel(x, y).0[0] != 0
    }

    /// Number of foreground pixels.
    #[must_use]
    pub const fn foreground_count(&self) -> u64 {
        self.foreground
    }

    /// Whether no pixel differs.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.foreground == 0
    }

    /// Share of foreground pixels in `[0, 1]`; zero for an empty image.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        let total = self.dimensions().pixel_count();
        if total == 0 {
            0.0
        } else {
            self.foreground as f64 / total as f64
        }
    }

    /// Raw foreground bytes in row-major order (nonzero = foreground).
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// The mask as a `0`/`255` grayscale image.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Consume the mask, returning the underlying grayscale image.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.image
    }
}
