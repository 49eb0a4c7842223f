//! Page raster handling
//!
//! Page images arrive either as encoded bytes or already decoded; the choice
//! is made once, at [`ImageSource::decode`], and everything downstream works on
//! an [`RgbImage`].

use crate::regions::Region;
use crate::PdfError;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// A page raster as handed to the pipeline
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded image file contents (PNG or JPEG)
    Bytes(Vec<u8>),
    /// Decoded pixels
    Decoded(RgbImage),
}

impl ImageSource {
    /// Decode into RGB pixels; undecodable bytes and empty rasters are
    /// [`PdfError::InvalidImageFormat`]
    pub fn decode(self) -> Result<RgbImage, PdfError> {
        let image = match self {
            ImageSource::Bytes(bytes) => image::load_from_memory(&bytes)?.to_rgb8(),
            ImageSource::Decoded(image) => image,
        };
        if image.width() == 0 || image.height() == 0 {
            return Err(PdfError::InvalidImageFormat(format!(
                "empty page image ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(image)
    }
}

impl From<RgbImage> for ImageSource {
    fn from(image: RgbImage) -> Self {
        ImageSource::Decoded(image)
    }
}

/// Convert a pixel to HSV on the 8-bit scale used by common vision tooling:
/// hue in `0..180` (degrees halved), saturation and value in `0..=255`
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        ((hue / 2.0).round() as u8).min(179),
        saturation.round() as u8,
        max as u8,
    ]
}

/// Grayscale copy of `image` that keeps only pixels for which `keep` is true;
/// every other pixel is black
pub fn masked_luma<F>(image: &RgbImage, keep: F) -> GrayImage
where
    F: Fn(&Rgb<u8>) -> bool,
{
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        if keep(pixel) {
            out.put_pixel(x, y, Luma([luma(pixel)]));
        }
    }
    out
}

/// ITU-R BT.601 luma
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(f32::from);
    (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8
}

/// Copy the pixels covered by `region` out of `image`
pub fn crop_region(image: &RgbImage, region: &Region) -> RgbImage {
    let x = region.x1.min(image.width());
    let y = region.y1.min(image.height());
    let width = region.x2.min(image.width()).saturating_sub(x);
    let height = region.y2.min(image.height()).saturating_sub(y);
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::DetectionMethod;

    #[test]
    fn test_hsv_primary_colors() {
        assert_eq!(rgb_to_hsv(&Rgb([255, 255, 0])), [30, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 0])), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 255])), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([255, 255, 255])), [0, 0, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 0])), [0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ImageSource::Bytes(b"definitely not an image".to_vec())
            .decode()
            .unwrap_err();
        assert!(matches!(err, PdfError::InvalidImageFormat(_)));
    }

    #[test]
    fn test_decode_rejects_empty_raster() {
        for (w, h) in [(0, 0), (0, 10), (10, 0)] {
            let err = ImageSource::Decoded(RgbImage::new(w, h)).decode().unwrap_err();
            assert!(matches!(err, PdfError::InvalidImageFormat(_)));
        }
    }

    #[test]
    fn test_decode_png_bytes() {
        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = ImageSource::Bytes(bytes).decode().unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_masked_luma_blacks_out_rejected_pixels() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([255, 255, 255]));
        image.put_pixel(1, 0, Rgb([255, 255, 0]));
        let masked = masked_luma(&image, |p| p.0[2] == 0);
        assert_eq!(masked.get_pixel(0, 0).0[0], 0);
        assert_eq!(masked.get_pixel(1, 0).0[0], 226);
    }

    #[test]
    fn test_crop_region_clamps_to_image() {
        let image = RgbImage::new(100, 50);
        let region = Region {
            x1: 90,
            y1: 40,
            x2: 120,
            y2: 60,
            method: DetectionMethod::Color,
        };
        assert_eq!(crop_region(&image, &region).dimensions(), (10, 10));
    }
}
