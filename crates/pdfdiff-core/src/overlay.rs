//! Overlay rendering: highlight difference boxes on a copy of the target
//! page.
//!
//! Each box gets an opaque outline and a translucent fill blended over
//! the page (and over the outline), so the changed content stays legible
//! beneath the highlight.

use image::{Rgba, buffer::ConvertBuffer};
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, RgbImage, RgbaImage};

/// Colors and stroke used to draw difference boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Outline color, drawn without blending.
    pub outline: [u8; 4],
    /// Fill color, alpha-blended over the page.
    pub fill: [u8; 4],
    /// Outline thickness in pixels, drawn inward from the box edge.
    pub outline_width: u32,
}

impl OverlayStyle {
    /// Solid red outline, two pixels wide, with a faint red wash.
    pub const DEFAULT: Self = Self {
        outline: [255, 0, 0, 255],
        fill: [255, 0, 0, 40],
        outline_width: 2,
    };
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Render `boxes` onto an RGBA copy of `target` with the default style.
///
/// The input image is not modified. With no boxes the result is `target`
/// converted to RGBA with every pixel opaque.
#[must_use = "returns the overlay image"]
pub fn render_overlay(target: &RgbImage, boxes: &[BoundingBox]) -> RgbaImage {
    render_overlay_styled(target, boxes, OverlayStyle::DEFAULT)
}

/// Render `boxes` onto an RGBA copy of `target` with `style`.
///
/// Boxes that extend past the image are clipped by the drawing routines.
#[must_use = "returns the overlay image"]
pub fn render_overlay_styled(
    target: &RgbImage,
    boxes: &[BoundingBox],
    style: OverlayStyle,
) -> RgbaImage {
    let base: RgbaImage = target.convert();
    let mut canvas = Blend(base);
    for bb in boxes {
        for inset in 0..style.outline_width {
            if let Some(rect) = inset_rect(*bb, inset) {
                draw_hollow_rect_mut(&mut canvas.0, rect, Rgba(style.outline));
            }
        }
        if let Some(rect) = inset_rect(*bb, 0) {
            draw_filled_rect_mut(&mut canvas, rect, Rgba(style.fill));
        }
    }
    canvas.0
}

/// The closed box shrunk by `inset` pixels on every side, as a drawing
/// rectangle. `None` once the inset consumes the box.
fn inset_rect(bb: BoundingBox, inset: u32) -> Option<Rect> {
    let width = (bb.width() + 1).checked_sub(inset * 2).filter(|&w| w > 0)?;
    let height = (bb.height() + 1).checked_sub(inset * 2).filter(|&h| h > 0)?;
    let x = i32::try_from(bb.x0 + inset).ok()?;
    let y = i32::try_from(bb.y0 + inset).ok()?;
    Some(Rect::at(x, y).of_size(width, height))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;

    fn white(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
    }

    /// Red up to the float rounding of alpha blending.
    fn is_red(px: [u8; 4]) -> bool {
        px[0] >= 254 && px[1] <= 1 && px[2] <= 1 && px[3] >= 254
    }

    #[test]
    fn no_boxes_is_opaque_copy() {
        #[allow(clippy::cast_possible_truncation)]
        let page = RgbImage::from_fn(9, 7, |x, y| Rgb([x as u8 * 20, y as u8 * 30, 99]));
        let overlay = render_overlay(&page, &[]);
        assert_eq!(overlay.dimensions(), page.dimensions());
        for (o, p) in overlay.pixels().zip(page.pixels()) {
            assert_eq!(o.0, [p.0[0], p.0[1], p.0[2], 255]);
        }
    }

    #[test]
    fn input_is_untouched() {
        let page = white(30, 30);
        let before = page.clone();
        let _ = render_overlay(&page, &[BoundingBox::new(5, 5, 20, 20)]);
        assert_eq!(page, before);
    }

    #[test]
    fn outline_is_two_pixels_and_interior_is_tinted() {
        let page = white(40, 40);
        let overlay = render_overlay(&page, &[BoundingBox::new(10, 10, 30, 30)]);

        // Outline pixels are red (the translucent fill keeps them red).
        for p in [(10, 10), (11, 11), (30, 20), (29, 20), (20, 30)] {
            let px = overlay.get_pixel(p.0, p.1).0;
            assert!(is_red(px), "outline at {p:?}: {px:?}");
        }

        // Interior: white blended with 40/255 red keeps red saturated and
        // darkens green and blue.
        let inner = overlay.get_pixel(20, 20).0;
        assert!(inner[0] >= 254);
        assert!(inner[1] < 250 && inner[1] > 200, "green {}", inner[1]);
        assert_eq!(inner[1], inner[2]);
        assert!(inner[3] >= 254);

        // Outside the box the page is unchanged.
        assert_eq!(overlay.get_pixel(9, 9).0, [255, 255, 255, 255]);
        assert_eq!(overlay.get_pixel(31, 31).0, [255, 255, 255, 255]);
    }

    #[test]
    fn degenerate_boxes_draw() {
        let page = white(10, 10);
        let boxes = [BoundingBox::point(4, 4), BoundingBox::new(0, 8, 9, 8)];
        let overlay = render_overlay(&page, &boxes);
        assert!(is_red(overlay.get_pixel(4, 4).0));
        assert!(is_red(overlay.get_pixel(9, 8).0));
        assert_eq!(overlay.get_pixel(5, 5).0, [255, 255, 255, 255]);
    }

    #[test]
    fn inset_rect_shrinks_and_vanishes() {
        let bb = BoundingBox::new(2, 2, 5, 5);
        let r0 = inset_rect(bb, 0).unwrap();
        assert_eq!((r0.left(), r0.top(), r0.width(), r0.height()), (2, 2, 4, 4));
        let r1 = inset_rect(bb, 1).unwrap();
        assert_eq!((r1.left(), r1.top(), r1.width(), r1.height()), (3, 3, 2, 2));
        assert!(inset_rect(bb, 2).is_none());
    }

    #[test]
    fn custom_style_is_used() {
        let style = OverlayStyle {
            outline: [0, 0, 255, 255],
            fill: [0, 0, 0, 0],
            outline_width: 1,
        };
        let boxes = [BoundingBox::new(1, 1, 8, 8)];
        let overlay = render_overlay_styled(&white(10, 10), &boxes, style);
        assert_eq!(overlay.get_pixel(1, 1).0, [0, 0, 255, 255]);
        assert_eq!(overlay.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }
}
