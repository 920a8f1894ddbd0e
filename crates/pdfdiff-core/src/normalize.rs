//! Same-size padding for a pair of page images.
//!
//! Two renders of "the same" page may differ in size (a different page
//! box, a rescaled render). Before a per-pixel comparison both images are
//! brought to the component-wise maximum of their dimensions by placing
//! each at the top-left origin of a white canvas. Nothing is scaled or
//! resampled: this is padding, not resizing.

use image::{ImageBuffer, Pixel};

use crate::types::Dimensions;

/// Owned image buffer over 8-bit subpixels.
type Buffer<P> = ImageBuffer<P, Vec<u8>>;

/// Pad `a` and `b` onto white canvases of their common maximum size.
///
/// Images that already have the target size are moved through untouched,
/// so equal-size inputs come back exactly as they went in.
#[must_use = "returns the padded image pair"]
pub fn pad_to_same<P>(a: Buffer<P>, b: Buffer<P>) -> (Buffer<P>, Buffer<P>)
where
    P: Pixel<Subpixel = u8>,
{
    let target = Dimensions::of(&a).max(Dimensions::of(&b));
    (pad_to(a, target), pad_to(b, target))
}

/// Place `image` at the origin of a white canvas of `target` size.
///
/// Returns `image` unchanged when it already has the target dimensions.
/// A target smaller than the image along some axis keeps the image's
/// extent on that axis; content is never cropped.
#[must_use = "returns the padded image"]
pub fn pad_to<P>(image: Buffer<P>, target: Dimensions) -> Buffer<P>
where
    P: Pixel<Subpixel = u8>,
{
    let target = target.max(Dimensions::of(&image));
    if Dimensions::of(&image) == target {
        return image;
    }

    let mut canvas = Buffer::from_pixel(target.width, target.height, white());
    image::imageops::replace(&mut canvas, &image, 0, 0);
    canvas
}

/// A white pixel of any 8-bit pixel type (every channel saturated, which
/// also makes alpha opaque).
#[must_use]
pub fn white<P: Pixel<Subpixel = u8>>() -> P {
    let channels = [u8::MAX; 4];
    *P::from_slice(&channels[..usize::from(P::CHANNEL_COUNT)])
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn patterned(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 42]))
    }

    #[test]
    fn equal_sizes_are_a_no_op() {
        let a = patterned(30, 20);
        let b = RgbImage::from_pixel(30, 20, Rgb([1, 2, 3]));
        let (pa, pb) = pad_to_same(a.clone(), b.clone());
        assert_eq!(pa, a);
        assert_eq!(pb, b);
    }

    #[test]
    fn pads_to_component_wise_maximum() {
        let a = patterned(40, 10);
        let b = patterned(15, 25);
        let (pa, pb) = pad_to_same(a, b);
        assert_eq!(pa.dimensions(), (40, 25));
        assert_eq!(pb.dimensions(), (40, 25));
    }

    #[test]
    fn original_content_stays_at_origin() {
        let a = patterned(10, 10);
        let b = RgbImage::new(20, 5);
        let (pa, _) = pad_to_same(a.clone(), b);
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(pa.get_pixel(x, y), a.get_pixel(x, y), "at ({x},{y})");
            }
        }
    }

    #[test]
    fn padding_is_white() {
        let a = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let padded = pad_to(a, Dimensions::new(6, 5));
        assert_eq!(*padded.get_pixel(5, 0), Rgb([255, 255, 255]));
        assert_eq!(*padded.get_pixel(0, 4), Rgb([255, 255, 255]));
        assert_eq!(*padded.get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn grayscale_padding_is_white() {
        let a = GrayImage::from_pixel(2, 2, Luma([0]));
        let b = GrayImage::from_pixel(3, 1, Luma([0]));
        let (pa, pb) = pad_to_same(a, b);
        assert_eq!(pa.get_pixel(2, 0).0[0], 255);
        assert_eq!(pb.get_pixel(0, 1).0[0], 255);
    }

    #[test]
    fn smaller_target_never_crops() {
        let a = patterned(10, 10);
        let padded = pad_to(a.clone(), Dimensions::new(4, 4));
        assert_eq!(padded, a);
    }

    #[test]
    fn white_rgba_is_opaque() {
        let p: image::Rgba<u8> = white();
        assert_eq!(p, image::Rgba([255, 255, 255, 255]));
    }
}
