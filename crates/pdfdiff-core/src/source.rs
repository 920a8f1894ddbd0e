//! Page sources: where page rasters and page text come from.
//!
//! The core never parses documents itself. A [`PageSource`] hands it one
//! page at a time, rasterized at the requested resolution, plus that
//! page's positioned text. Front ends implement the trait over whatever
//! renderer they have; [`InMemorySource`] serves pre-built pages for
//! tests and for callers that already hold rasters.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::text::PageText;
use crate::types::{Dimensions, RgbImage};

/// Points per inch of PDF user space.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Size of the blank page substituted for a page that cannot be
/// rendered or does not exist.
pub const PLACEHOLDER_DIMENSIONS: Dimensions = Dimensions::new(800, 1000);

/// Errors raised by a page source for a single request.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading page data failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page raster data could not be decoded.
    #[error("failed to decode page image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The requested page does not exist in this source.
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Zero-based page index requested.
        index: usize,
        /// Number of pages in the source.
        count: usize,
    },

    /// The rendering or extraction backend reported a failure.
    #[error("page backend error: {0}")]
    Backend(String),
}

/// Resolution request for rasterizing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Target resolution in dots per inch.
    pub dpi: u32,
    /// Ceiling for the longest side of the raster in pixels.
    pub max_side: u32,
}

/// Zoom factor and pixel size for rendering one page.
///
/// Pages are rendered at `dpi / 72` pixels per point. When that would
/// make the longest side exceed `max_side`, the zoom is scaled down
/// uniformly so the longest side lands on `max_side`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderPlan {
    /// Pixels per PDF point.
    pub zoom: f64,
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Whether the `max_side` ceiling reduced the zoom.
    pub clamped: bool,
}

impl RenderPlan {
    /// Plan a render of a `width_pt` x `height_pt` page.
    ///
    /// Non-finite or non-positive page sizes yield a 1x1 raster.
    #[must_use]
    pub fn for_page(width_pt: f64, height_pt: f64, options: RenderOptions) -> Self {
        let width_pt = sanitize_extent(width_pt);
        let height_pt = sanitize_extent(height_pt);

        let mut zoom = f64::from(options.dpi) / POINTS_PER_INCH;
        let estimated = (width_pt * zoom).floor().max((height_pt * zoom).floor());
        let max_side = f64::from(options.max_side.max(1));
        let clamped = estimated > max_side;
        if clamped {
            zoom *= max_side / estimated;
        }

        Self {
            zoom,
            width: to_pixels(width_pt * zoom),
            height: to_pixels(height_pt * zoom),
            clamped,
        }
    }

    /// Planned raster size.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

fn sanitize_extent(extent: f64) -> f64 {
    if extent.is_finite() && extent > 0.0 {
        extent
    } else {
        0.0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(extent: f64) -> u32 {
    // Clamped into [1, u32::MAX] before the cast.
    extent.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// A blank white page of [`PLACEHOLDER_DIMENSIONS`].
#[must_use]
pub fn placeholder_page() -> RgbImage {
    RgbImage::from_pixel(
        PLACEHOLDER_DIMENSIONS.width,
        PLACEHOLDER_DIMENSIONS.height,
        image::Rgb([255, 255, 255]),
    )
}

/// Downscale `image` so its longest side is at most `max_side`.
///
/// Images already within the limit are returned unchanged. Used by
/// sources whose pages arrive pre-rasterized.
#[must_use = "returns the fitted image"]
pub fn fit_to_max_side(image: RgbImage, max_side: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_side || max_side == 0 {
        return image;
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let width = to_pixels(f64::from(w) * scale);
    let height = to_pixels(f64::from(h) * scale);
    image::imageops::resize(&image, width, height, FilterType::Triangle)
}

/// A document the comparison can pull pages from.
///
/// Page indices are zero-based. Each request is independent, so a
/// failing page does not poison the source for the next one.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterize page `index` to RGB under `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the page cannot be rasterized.
    fn render_page(&self, index: usize, options: RenderOptions) -> Result<RgbImage, SourceError>;

    /// Extract the positioned text of page `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the page text cannot be extracted.
    fn page_text(&self, index: usize) -> Result<PageText, SourceError>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn render_page(&self, index: usize, options: RenderOptions) -> Result<RgbImage, SourceError> {
        (**self).render_page(index, options)
    }

    fn page_text(&self, index: usize) -> Result<PageText, SourceError> {
        (**self).page_text(index)
    }
}

/// One pre-built page. `None` for either part makes that request fail,
/// which is how tests exercise the degradation paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPage {
    /// The page raster.
    pub image: Option<RgbImage>,
    /// The page text.
    pub text: Option<PageText>,
}

impl InMemoryPage {
    /// A page with both a raster and plain text.
    #[must_use]
    pub fn new(image: RgbImage, text: impl Into<String>) -> Self {
        Self {
            image: Some(image),
            text: Some(PageText::plain(text)),
        }
    }
}

/// A [`PageSource`] over pages already held in memory.
///
/// Rasters are served as-is apart from the `max_side` ceiling; the
/// requested DPI is ignored.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pages: Vec<InMemoryPage>,
}

impl InMemorySource {
    /// Wrap `pages`.
    #[must_use]
    pub const fn new(pages: Vec<InMemoryPage>) -> Self {
        Self { pages }
    }

    /// Append a page.
    pub fn push(&mut self, page: InMemoryPage) {
        self.pages.push(page);
    }

    fn page(&self, index: usize) -> Result<&InMemoryPage, SourceError> {
        self.pages.get(index).ok_or(SourceError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }
}

impl FromIterator<InMemoryPage> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = InMemoryPage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl PageSource for InMemorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, options: RenderOptions) -> Result<RgbImage, SourceError> {
        let image = self.page(index)?.image.clone().ok_or_else(|| {
            SourceError::Backend(format!("page {index} has no raster"))
        })?;
        Ok(fit_to_max_side(image, options.max_side))
    }

    fn page_text(&self, index: usize) -> Result<PageText, SourceError> {
        self.page(index)?
            .text
            .clone()
            .ok_or_else(|| SourceError::Backend(format!("page {index} has no text")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const OPTIONS: RenderOptions = RenderOptions {
        dpi: 220,
        max_side: 3000,
    };

    #[test]
    fn letter_page_at_220_dpi() {
        // 612 x 792 pt -> 8.5 x 11 in -> 1870 x 2420 px.
        let plan = RenderPlan::for_page(612.0, 792.0, OPTIONS);
        assert!(!plan.clamped);
        assert!((plan.zoom - 220.0 / 72.0).abs() < 1e-12);
        assert_eq!(plan.dimensions(), Dimensions::new(1870, 2420));
    }

    #[test]
    fn oversized_page_is_clamped_to_max_side() {
        // A3 portrait at 300 dpi would be 3508 x 4961 px.
        let options = RenderOptions {
            dpi: 300,
            max_side: 3000,
        };
        let plan = RenderPlan::for_page(841.89, 1190.55, options);
        assert!(plan.clamped);
        assert_eq!(plan.height, 3000);
        assert!(plan.width < 3000);
        assert!(plan.zoom < 300.0 / 72.0);
    }

    #[test]
    fn degenerate_page_is_one_pixel() {
        let plan = RenderPlan::for_page(f64::NAN, -5.0, OPTIONS);
        assert_eq!(plan.dimensions(), Dimensions::new(1, 1));
    }

    #[test]
    fn placeholder_is_white_800_by_1000() {
        let page = placeholder_page();
        assert_eq!(page.dimensions(), (800, 1000));
        assert!(page.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn fit_to_max_side_shrinks_longest_side() {
        let image = RgbImage::new(400, 100);
        assert_eq!(fit_to_max_side(image.clone(), 1000).dimensions(), (400, 100));
        assert_eq!(fit_to_max_side(image, 200).dimensions(), (200, 50));
    }

    #[test]
    fn in_memory_source_serves_pages() {
        let source: InMemorySource = [
            InMemoryPage::new(RgbImage::new(10, 10), "first"),
            InMemoryPage::default(),
        ]
        .into_iter()
        .collect();

        assert_eq!(source.page_count(), 2);
        assert_eq!(source.render_page(0, OPTIONS).unwrap().dimensions(), (10, 10));
        assert_eq!(source.page_text(0).unwrap().full, "first");
        assert!(matches!(source.render_page(1, OPTIONS), Err(SourceError::Backend(_))));
        assert!(matches!(source.page_text(1), Err(SourceError::Backend(_))));
        assert!(matches!(
            source.render_page(2, OPTIONS),
            Err(SourceError::PageOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn source_error_messages() {
        let err = SourceError::PageOutOfRange { index: 4, count: 3 };
        assert_eq!(err.to_string(), "page 4 out of range (document has 3 pages)");
    }
}
