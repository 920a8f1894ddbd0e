//! Gaussian blur for scan-noise suppression before differencing.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Rendered pages carry
//! anti-aliasing and, for scanned documents, sensor noise; a light blur
//! keeps those from surfacing as one-pixel differences.
//!
//! Blurring is linear and separable per channel, so an RGB page is
//! blurred plane by plane.

use image::{GrayImage, RgbImage};

/// Blur one grayscale plane, using `radius` as the kernel sigma.
///
/// Returns a copy for `radius <= 0.0`; `imageproc` panics on a
/// non-positive sigma.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, radius: f32) -> GrayImage {
    if radius <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, radius)
}

/// Blur each R/G/B plane of a rendered page with [`gaussian_blur`].
///
/// Non-positive radius values return the image unchanged.
#[must_use = "returns the blurred RGB image"]
pub fn gaussian_blur_rgb(image: &RgbImage, radius: f32) -> RgbImage {
    if radius <= 0.0 {
        return image.clone();
    }
    let planes = split_planes(image).map(|plane| gaussian_blur(&plane, radius));
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        image::Rgb(std::array::from_fn(|c| planes[c].get_pixel(x, y).0[0]))
    })
}

fn split_planes(image: &RgbImage) -> [GrayImage; 3] {
    std::array::from_fn(|c| {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            image::Luma([image.get_pixel(x, y).0[c]])
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-pixel vertical rule at x = 6 on a white 12x12 page.
    fn rule() -> GrayImage {
        GrayImage::from_fn(12, 12, |x, _| image::Luma([if x == 6 { 0 } else { 255 }]))
    }

    #[test]
    fn non_positive_radius_copies() {
        assert_eq!(gaussian_blur(&rule(), 0.0), rule());
        assert_eq!(gaussian_blur(&rule(), -1.0), rule());
    }

    #[test]
    fn rule_spreads_to_neighbours() {
        let soft = gaussian_blur(&rule(), 1.0);
        assert!(soft.get_pixel(6, 6).0[0] > 0);
        assert!(soft.get_pixel(5, 6).0[0] < 255);
        assert!(soft.get_pixel(7, 6).0[0] < 255);
        assert!(soft.get_pixel(0, 6).0[0] >= 254);
    }

    #[test]
    fn rgb_radius_zero_copies() {
        let page = RgbImage::from_pixel(5, 3, image::Rgb([10, 120, 240]));
        assert_eq!(gaussian_blur_rgb(&page, 0.0), page);
    }

    #[test]
    fn rgb_keeps_size_and_blank_pages() {
        let page = RgbImage::from_pixel(17, 31, image::Rgb([255, 255, 255]));
        let soft = gaussian_blur_rgb(&page, 1.0);
        assert_eq!(soft.dimensions(), (17, 31));
        assert!(soft.pixels().all(|p| p.0.iter().all(|&c| c >= 254)));
    }

    #[test]
    fn rgb_planes_blur_independently() {
        // Red rule on white: only green and blue dip, red stays saturated.
        let page = RgbImage::from_fn(12, 12, |x, _| {
            image::Rgb(if x == 6 { [255, 0, 0] } else { [255, 255, 255] })
        });
        let soft = gaussian_blur_rgb(&page, 1.0);
        let [r, g, b] = soft.get_pixel(5, 6).0;
        assert!(r >= 254);
        assert!(g < 255);
        assert_eq!(g, b);
        assert!(g.abs_diff(soft.get_pixel(7, 6).0[1]) <= 1);
    }
}
