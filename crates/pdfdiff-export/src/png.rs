//! PNG encoding of result rasters.
//!
//! Overlays, heat maps, and masks are written as PNG bytes, or as
//! `data:` URIs for embedding in the HTML report.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{GrayImage, ImageBuffer, ImageEncoder, PixelWithColorType, RgbImage};

/// Errors from the serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The PNG encoder rejected the image.
    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),
}

/// Encode an 8-bit image buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if encoding fails.
pub fn encode_png<P>(image: &ImageBuffer<P, Vec<u8>>) -> Result<Vec<u8>, ExportError>
where
    P: PixelWithColorType<Subpixel = u8>,
{
    let mut png_bytes = Vec::new();
    let encoder = PngEncoder::new(&mut png_bytes);
    encoder.write_image(image.as_raw(), image.width(), image.height(), P::COLOR_TYPE)?;
    Ok(png_bytes)
}

/// Encode an image as a `data:image/png;base64,...` URI.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if encoding fails.
pub fn png_data_uri<P>(image: &ImageBuffer<P, Vec<u8>>) -> Result<String, ExportError>
where
    P: PixelWithColorType<Subpixel = u8>,
{
    let png_bytes = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png_bytes)))
}

/// Encode a grayscale mask or heat map as an RGB PNG in two colors.
///
/// Pixel value 0 maps to `bg` and 255 to `fg`; intermediate values are
/// interpolated linearly, so a heat map keeps its gradient.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if encoding fails.
pub fn themed_mask_png(mask: &GrayImage, bg: [u8; 3], fg: [u8; 3]) -> Result<Vec<u8>, ExportError> {
    let themed = RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        image::Rgb(std::array::from_fn(|c| {
            let color = u16::from(bg[c]) * u16::from(255 - v) + u16::from(fg[c]) * u16::from(v);
            u8::try_from(color / 255).unwrap_or(u8::MAX)
        }))
    });
    encode_png(&themed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Luma, Rgba, RgbaImage};

    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn encodes_rgba_overlay() {
        let overlay = RgbaImage::from_pixel(12, 7, Rgba([255, 0, 0, 255]));
        let bytes = encode_png(&overlay).unwrap();
        assert_eq!(bytes[..8], PNG_SIGNATURE);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, overlay);
    }

    #[test]
    fn data_uri_has_png_prefix() {
        let uri = png_data_uri(&GrayImage::new(2, 2)).unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn themed_mask_maps_extremes_and_midpoint() {
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(1, 0, Luma([255]));
        mask.put_pixel(2, 0, Luma([128]));
        let bytes = themed_mask_png(&mask, [255, 255, 255], [200, 0, 0]).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();

        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [200, 0, 0]);
        let mid = decoded.get_pixel(2, 0).0;
        assert!(mid[0] > 200 && mid[1] > 100 && mid[1] < 150, "{mid:?}");
    }
}
