//! Comparison settings, validation, and named presets.
//!
//! [`DiffSettings`] is immutable once built. Every field is private and
//! only reachable through getters, so the only way to obtain one is
//! through validation ([`DiffSettings::new`], `TryFrom<DiffSettingsParams>`,
//! or serde deserialization, which routes through the same check) or
//! from a [`Preset`].
//!
//! [`DiffSettingsParams`] is the unvalidated, all-public counterpart used
//! by front ends to collect user overrides before validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mask::DifferenceKind;

/// Allowed render resolution range.
pub const DPI_RANGE: std::ops::RangeInclusive<u32> = 72..=600;

/// Largest accepted merge padding in pixels.
pub const MAX_MERGE_PADDING: u32 = 1000;

/// Largest accepted Gaussian blur radius.
pub const MAX_BLUR_RADIUS: f32 = 10.0;

/// Header/footer ignore ratios must be strictly below this value.
pub const MAX_IGNORE_RATIO: f64 = 0.5;

/// Smallest accepted `max_image_side`.
pub const MIN_IMAGE_SIDE: u32 = 16;

/// Errors raised when settings fail validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `dpi` outside [`DPI_RANGE`].
    #[error("dpi must be between 72 and 600, got {0}")]
    Dpi(u32),

    /// `pixel_threshold` above 255.
    #[error("pixel threshold must be between 0 and 255, got {0}")]
    PixelThreshold(u32),

    /// `min_box_area` of zero.
    #[error("minimum box area must be at least 1")]
    MinBoxArea,

    /// `merge_padding` above [`MAX_MERGE_PADDING`].
    #[error("merge padding must be at most 1000, got {0}")]
    MergePadding(u32),

    /// `blur_radius` negative, non-finite, or above [`MAX_BLUR_RADIUS`].
    #[error("blur radius must be between 0 and 10, got {0}")]
    BlurRadius(f32),

    /// A header or footer ratio outside `0.0..0.5`.
    #[error("{band} ignore ratio must be in [0, 0.5), got {value}")]
    IgnoreRatio {
        /// Which band (`"header"` or `"footer"`).
        band: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// `max_image_side` below [`MIN_IMAGE_SIDE`].
    #[error("max image side must be at least 16, got {0}")]
    MaxImageSide(u32),

    /// `text_similarity_warn` outside `0.0..=1.0`.
    #[error("text similarity warning level must be in [0, 1], got {0}")]
    SimilarityWarn(f64),

    /// Extractor stride of zero.
    #[error("scan stride must be at least 1")]
    Stride,
}

/// Unvalidated comparison parameters.
///
/// All fields are public so that CLI flags, JSON, or UI controls can
/// fill them in. Convert to [`DiffSettings`] with `try_into()` before
/// processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSettingsParams {
    /// Render resolution in dots per inch.
    pub dpi: u32,
    /// Minimum grayscale delta counted as a difference.
    pub pixel_threshold: u32,
    /// Boxes with smaller corner-distance area are dropped.
    pub min_box_area: u32,
    /// Boxes within this many pixels of each other are merged.
    pub merge_padding: u32,
    /// Gaussian blur radius applied to rendered pages (0 disables).
    pub blur_radius: f32,
    /// Fraction of page height at the top ignored by text comparison.
    pub header_ignore_ratio: f64,
    /// Fraction of page height at the bottom ignored by text comparison.
    pub footer_ignore_ratio: f64,
    /// Longest rendered side in pixels; larger renders are scaled down.
    pub max_image_side: u32,
    /// Pages with text similarity below this are flagged in reports.
    pub text_similarity_warn: f64,
    /// How per-pixel deltas are reduced to one grayscale magnitude.
    pub difference: DifferenceKind,
    /// Seed scan stride of the connected-component extractor.
    pub stride: u32,
}

impl Default for DiffSettingsParams {
    fn default() -> Self {
        DiffSettings::STANDARD.to_params()
    }
}

/// Validated, immutable comparison settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiffSettingsParams", into = "DiffSettingsParams")]
pub struct DiffSettings {
    dpi: u32,
    pixel_threshold: u8,
    min_box_area: u32,
    merge_padding: u32,
    blur_radius: f32,
    header_ignore_ratio: f64,
    footer_ignore_ratio: f64,
    max_image_side: u32,
    text_similarity_warn: f64,
    difference: DifferenceKind,
    stride: u32,
}

impl DiffSettings {
    /// Default render ceiling for the longest page side.
    pub const DEFAULT_MAX_IMAGE_SIDE: u32 = 3000;

    /// Default similarity below which a page is flagged.
    pub const DEFAULT_TEXT_SIMILARITY_WARN: f64 = 0.985;

    /// Default seed scan stride.
    pub const DEFAULT_STRIDE: u32 = 2;

    /// Balanced detection, suitable for most documents.
    pub const STANDARD: Self = Self {
        dpi: 220,
        pixel_threshold: 18,
        min_box_area: 250,
        merge_padding: 10,
        blur_radius: 1.0,
        header_ignore_ratio: 0.05,
        footer_ignore_ratio: 0.05,
        max_image_side: Self::DEFAULT_MAX_IMAGE_SIDE,
        text_similarity_warn: Self::DEFAULT_TEXT_SIMILARITY_WARN,
        difference: DifferenceKind::ChannelLuma,
        stride: Self::DEFAULT_STRIDE,
    };

    /// Picks up subtle layout and spacing changes, at the cost of more
    /// false positives.
    pub const HIGH_SENSITIVITY: Self = Self {
        dpi: 240,
        pixel_threshold: 12,
        min_box_area: 150,
        merge_padding: 8,
        blur_radius: 1.0,
        header_ignore_ratio: 0.04,
        footer_ignore_ratio: 0.04,
        ..Self::STANDARD
    };

    /// Marks only obvious changes; tolerant of scan noise.
    pub const LOW_SENSITIVITY: Self = Self {
        dpi: 180,
        pixel_threshold: 28,
        min_box_area: 400,
        merge_padding: 12,
        blur_radius: 0.0,
        header_ignore_ratio: 0.06,
        footer_ignore_ratio: 0.06,
        ..Self::STANDARD
    };

    /// Validate parameters and build settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn new(params: &DiffSettingsParams) -> Result<Self, ConfigError> {
        if !DPI_RANGE.contains(&params.dpi) {
            return Err(ConfigError::Dpi(params.dpi));
        }
        let pixel_threshold = u8::try_from(params.pixel_threshold)
            .map_err(|_| ConfigError::PixelThreshold(params.pixel_threshold))?;
        if params.min_box_area == 0 {
            return Err(ConfigError::MinBoxArea);
        }
        if params.merge_padding > MAX_MERGE_PADDING {
            return Err(ConfigError::MergePadding(params.merge_padding));
        }
        if !params.blur_radius.is_finite() || !(0.0..=MAX_BLUR_RADIUS).contains(&params.blur_radius)
        {
            return Err(ConfigError::BlurRadius(params.blur_radius));
        }
        check_ratio("header", params.header_ignore_ratio)?;
        check_ratio("footer", params.footer_ignore_ratio)?;
        if params.max_image_side < MIN_IMAGE_SIDE {
            return Err(ConfigError::MaxImageSide(params.max_image_side));
        }
        if !(0.0..=1.0).contains(&params.text_similarity_warn) {
            return Err(ConfigError::SimilarityWarn(params.text_similarity_warn));
        }
        if params.stride == 0 {
            return Err(ConfigError::Stride);
        }

        Ok(Self {
            dpi: params.dpi,
            pixel_threshold,
            min_box_area: params.min_box_area,
            merge_padding: params.merge_padding,
            blur_radius: params.blur_radius,
            header_ignore_ratio: params.header_ignore_ratio,
            footer_ignore_ratio: params.footer_ignore_ratio,
            max_image_side: params.max_image_side,
            text_similarity_warn: params.text_similarity_warn,
            difference: params.difference,
            stride: params.stride,
        })
    }

    /// Unvalidated copy of these settings, for editing and re-validating.
    #[must_use]
    pub const fn to_params(&self) -> DiffSettingsParams {
        DiffSettingsParams {
            dpi: self.dpi,
            pixel_threshold: self.pixel_threshold as u32,
            min_box_area: self.min_box_area,
            merge_padding: self.merge_padding,
            blur_radius: self.blur_radius,
            header_ignore_ratio: self.header_ignore_ratio,
            footer_ignore_ratio: self.footer_ignore_ratio,
            max_image_side: self.max_image_side,
            text_similarity_warn: self.text_similarity_warn,
            difference: self.difference,
            stride: self.stride,
        }
    }

    /// Render resolution in dots per inch.
    #[must_use]
    pub const fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Minimum grayscale delta counted as a difference.
    #[must_use]
    pub const fn pixel_threshold(&self) -> u8 {
        self.pixel_threshold
    }

    /// Minimum corner-distance area of a reported box.
    #[must_use]
    pub const fn min_box_area(&self) -> u32 {
        self.min_box_area
    }

    /// Merge distance between boxes in pixels.
    #[must_use]
    pub const fn merge_padding(&self) -> u32 {
        self.merge_padding
    }

    /// Gaussian blur radius applied after rendering.
    #[must_use]
    pub const fn blur_radius(&self) -> f32 {
        self.blur_radius
    }

    /// Fraction of page height ignored at the top for text.
    #[must_use]
    pub const fn header_ignore_ratio(&self) -> f64 {
        self.header_ignore_ratio
    }

    /// Fraction of page height ignored at the bottom for text.
    #[must_use]
    pub const fn footer_ignore_ratio(&self) -> f64 {
        self.footer_ignore_ratio
    }

    /// Ceiling for the longest rendered side.
    #[must_use]
    pub const fn max_image_side(&self) -> u32 {
        self.max_image_side
    }

    /// Similarity below which a page is flagged.
    #[must_use]
    pub const fn text_similarity_warn(&self) -> f64 {
        self.text_similarity_warn
    }

    /// Delta reduction used by the mask builder.
    #[must_use]
    pub const fn difference(&self) -> DifferenceKind {
        self.difference
    }

    /// Seed scan stride of the component extractor.
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// Parameters for [`compute_overlay`](crate::compute_overlay) derived
    /// from these settings.
    #[must_use]
    pub const fn overlay_params(&self) -> crate::OverlayParams {
        crate::OverlayParams {
            pixel_threshold: self.pixel_threshold,
            min_box_area: self.min_box_area,
            merge_padding: self.merge_padding,
            difference: self.difference,
            stride: self.stride,
        }
    }

    /// Rasterization request handed to page sources.
    #[must_use]
    pub const fn render_options(&self) -> crate::source::RenderOptions {
        crate::source::RenderOptions {
            dpi: self.dpi,
            max_side: self.max_image_side,
        }
    }
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TryFrom<DiffSettingsParams> for DiffSettings {
    type Error = ConfigError;

    fn try_from(params: DiffSettingsParams) -> Result<Self, Self::Error> {
        Self::new(&params)
    }
}

impl From<DiffSettings> for DiffSettingsParams {
    fn from(settings: DiffSettings) -> Self {
        settings.to_params()
    }
}

fn check_ratio(band: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..MAX_IGNORE_RATIO).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::IgnoreRatio { band, value })
    }
}

/// Named settings presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    /// [`DiffSettings::STANDARD`].
    #[default]
    Standard,
    /// [`DiffSettings::HIGH_SENSITIVITY`].
    HighSensitivity,
    /// [`DiffSettings::LOW_SENSITIVITY`].
    LowSensitivity,
}

impl Preset {
    /// All presets, in display order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::HighSensitivity, Self::LowSensitivity];

    /// The settings this preset stands for.
    #[must_use]
    pub const fn settings(self) -> DiffSettings {
        match self {
            Self::Standard => DiffSettings::STANDARD,
            Self::HighSensitivity => DiffSettings::HIGH_SENSITIVITY,
            Self::LowSensitivity => DiffSettings::LOW_SENSITIVITY,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("Standard"),
            Self::HighSensitivity => f.write_str("HighSensitivity"),
            Self::LowSensitivity => f.write_str("LowSensitivity"),
        }
    }
}
