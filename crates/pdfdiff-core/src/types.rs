//! Shared types for the pdfdiff comparison core.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`: rendered pages enter the core as opaque RGB.
pub use image::RgbImage;

/// Re-export `RgbaImage`: overlays leave the core as RGBA.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from a width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Component-wise maximum of two dimensions.
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        Self {
            width: if self.width > other.width {
                self.width
            } else {
                other.width
            },
            height: if self.height > other.height {
                self.height
            } else {
                other.height
            },
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An axis-aligned rectangle of detected difference.
///
/// Closed convention: both `(x0, y0)` and `(x1, y1)` are member pixels,
/// so a single pixel at `(5, 7)` is `BoundingBox { x0: 5, y0: 7, x1: 5, y1: 7 }`.
/// [`area`](Self::area) follows the corner-distance formula
/// `(x1 - x0) * (y1 - y0)`, which is what the minimum-area filter compares
/// against.
///
/// Invariant: `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (inclusive).
    pub x1: u32,
    /// Bottom edge (inclusive).
    pub y1: u32,
}

impl BoundingBox {
    /// Create a box from two corners, ordering them so the invariant holds.
    #[must_use]
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// A box covering exactly one pixel.
    #[must_use]
    pub const fn point(x: u32, y: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        }
    }

    /// Horizontal corner distance `x1 - x0`.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.x1 - self.x0
    }

    /// Vertical corner distance `y1 - y0`.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.y1 - self.y0
    }

    /// Corner-distance area `(x1 - x0) * (y1 - y0)`.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow the box to include the pixel `(x, y)`.
    #[must_use]
    pub fn including(self, x: u32, y: u32) -> Self {
        self.union(Self::point(x, y))
    }

    /// Whether `other` lies entirely inside `self`.
    #[must_use]
    pub const fn contains_box(self, other: Self) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// Whether the pixel `(x, y)` lies inside the box.
    #[must_use]
    pub const fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Whether the box lies inside an image of the given dimensions.
    #[must_use]
    pub const fn fits_within(self, dimensions: Dimensions) -> bool {
        self.x1 < dimensions.width && self.y1 < dimensions.height
    }

    /// Whether the two boxes overlap or touch once each is expanded by
    /// `padding` pixels on every side.
    ///
    /// Two boxes are close unless one of them lies entirely beyond the
    /// padded extent of the other along some axis.
    #[must_use]
    pub fn is_close(self, other: Self, padding: u32) -> bool {
        let pad = u64::from(padding);
        let separated = u64::from(self.x1) + pad < u64::from(other.x0)
            || u64::from(other.x1) + pad < u64::from(self.x0)
            || u64::from(self.y1) + pad < u64::from(other.y0)
            || u64::from(other.y1) + pad < u64::from(self.y0);
        !separated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_orders_corners() {
        let b = BoundingBox::new(10, 20, 5, 3);
        assert_eq!(b, BoundingBox::new(5, 3, 10, 20));
        assert!(b.x0 <= b.x1 && b.y0 <= b.y1);
    }

    #[test]
    fn single_pixel_has_zero_area() {
        let b = BoundingBox::point(4, 4);
        assert_eq!(b.area(), 0);
        assert!(b.contains(4, 4));
        assert!(!b.contains(5, 4));
    }

    #[test]
    fn area_uses_corner_distance() {
        // A 50x50 block of pixels from (10,10) to (59,59).
        let b = BoundingBox::new(10, 10, 59, 59);
        assert_eq!(b.width(), 49);
        assert_eq!(b.height(), 49);
        assert_eq!(b.area(), 49 * 49);
    }

    #[test]
    fn union_covers_both() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 5, 30, 40);
        let u = a.union(b);
        assert_eq!(u, BoundingBox::new(0, 0, 30, 40));
        assert!(u.contains_box(a));
        assert!(u.contains_box(b));
    }

    #[test]
    fn including_grows_box() {
        let b = BoundingBox::point(5, 5).including(2, 9).including(7, 1);
        assert_eq!(b, BoundingBox::new(2, 1, 7, 9));
    }

    #[test]
    fn close_when_gap_within_padding() {
        let a = BoundingBox::new(0, 0, 29, 29);
        let b = BoundingBox::new(35, 0, 64, 29);
        assert!(a.is_close(b, 10));
        assert!(b.is_close(a, 10));
        assert!(!a.is_close(b, 2));
        assert!(!b.is_close(a, 2));
    }

    #[test]
    fn close_boundary_is_inclusive() {
        // 29 + 6 == 35: not strictly less, so still close.
        let a = BoundingBox::new(0, 0, 29, 29);
        let b = BoundingBox::new(35, 0, 64, 29);
        assert!(a.is_close(b, 6));
        assert!(!a.is_close(b, 5));
    }

    #[test]
    fn vertical_separation_is_not_close() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(0, 40, 10, 50);
        assert!(!a.is_close(b, 10));
        assert!(a.is_close(b, 30));
    }

    #[test]
    fn padding_does_not_overflow() {
        let a = BoundingBox::new(u32::MAX - 1, 0, u32::MAX, 1);
        let b = BoundingBox::new(0, 0, 1, 1);
        assert!(a.is_close(b, u32::MAX));
    }

    #[test]
    fn fits_within_dimensions() {
        let dims = Dimensions::new(80, 80);
        assert!(BoundingBox::new(0, 0, 79, 79).fits_within(dims));
        assert!(!BoundingBox::new(0, 0, 80, 79).fits_within(dims));
    }

    #[test]
    fn dimensions_max_is_componentwise() {
        let a = Dimensions::new(100, 50);
        let b = Dimensions::new(60, 120);
        assert_eq!(a.max(b), Dimensions::new(100, 120));
        assert_eq!(a.max(b).pixel_count(), 12_000);
    }

    #[test]
    fn bounding_box_serde_round_trip() {
        let b = BoundingBox::new(1, 2, 3, 4);
        let json = serde_json::to_string(&b).unwrap_or_default();
        assert_eq!(json, r#"{"x0":1,"y0":2,"x1":3,"y1":4}"#);
    }
}
