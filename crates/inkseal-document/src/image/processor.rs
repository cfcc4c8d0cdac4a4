// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — prepares watermark images: near-white background made
// transparent, optional light smoothing, PNG encoding. Operates on in-memory
// images using the `image` and `imageproc` crates.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use inkseal_core::error::InksealError;
use tracing::{debug, info, instrument};

/// The pixel written over removed background.
const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns the transformed processor, so
/// steps chain:
///
/// ```ignore
/// let (processor, removed) = ImageProcessor::open("logo.png")?.remove_background(240);
/// let png = processor.smooth(0.6).to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, InksealError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            InksealError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self::from_dynamic(img))
    }

    /// Create a processor from encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, InksealError> {
        let img = image::load_from_memory(data).map_err(|err| {
            InksealError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already-decoded image, converting it to RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Make every pixel whose R, G and B all exceed `threshold` transparent
    /// white. Returns whether any pixel was cleared.
    #[instrument(skip(self), fields(threshold))]
    pub fn remove_background(self, threshold: u8) -> (Self, bool) {
        let (image, cleared) = clear_where(self.image, |[r, g, b]| {
            r > threshold && g > threshold && b > threshold
        });
        info!(cleared, "Background removed");
        (Self { image }, cleared > 0)
    }

    /// Make every pixel whose R, G and B all lie in `min..max` transparent.
    /// Used as a second pass for translucent watermarks.
    #[instrument(skip(self), fields(min, max))]
    pub fn clear_range(self, min: u8, max: u8) -> Self {
        let inside = |c: u8| c >= min && c < max;
        let (image, cleared) = clear_where(self.image, |[r, g, b]| {
            inside(r) && inside(g) && inside(b)
        });
        debug!(cleared, "Light pixels cleared");
        Self { image }
    }

    /// Gaussian smoothing. A non-positive `sigma` leaves the image untouched.
    #[instrument(skip(self), fields(sigma))]
    pub fn smooth(self, sigma: f32) -> Self {
        if sigma <= 0.0 || self.image.width() == 0 || self.image.height() == 0 {
            return self;
        }
        Self {
            image: gaussian_blur_f32(&self.image, sigma),
        }
    }

    /// Shrink the image to fit within `max_side` on both axes, preserving
    /// aspect ratio. Smaller images are returned as they are.
    pub fn limit_size(self, max_side: u32) -> Self {
        if self.image.width() <= max_side && self.image.height() <= max_side {
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_side,
            "Downscaling watermark image"
        );
        let resized = DynamicImage::ImageRgba8(self.image).resize(
            max_side,
            max_side,
            image::imageops::FilterType::Lanczos3,
        );
        Self::from_dynamic(resized)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, InksealError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| InksealError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

fn clear_where(mut image: RgbaImage, matches: impl Fn([u8; 3]) -> bool) -> (RgbaImage, usize) {
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        if matches([r, g, b]) {
            *pixel = CLEAR;
            cleared += 1;
        }
    }
    (image, cleared)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> ImageProcessor {
        let [r, g, b] = rgb;
        ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([r, g, b, 255]),
        )))
    }

    #[test]
    fn all_white_image_becomes_transparent() {
        let (processor, removed) = solid(31, 17, [255, 255, 255]).remove_background(240);
        let processor = processor.smooth(0.6);

        assert!(removed);
        assert_eq!((processor.width(), processor.height()), (31, 17));
        assert!(processor.as_rgba().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn dark_pixels_survive_background_removal() {
        let (processor, removed) = solid(4, 4, [10, 20, 30]).remove_background(240);
        assert!(!removed);
        assert!(processor.as_rgba().pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn threshold_is_exclusive() {
        let (processor, removed) = solid(2, 2, [240, 240, 240]).remove_background(240);
        assert!(!removed);
        assert_eq!(processor.as_rgba().get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn clear_range_excludes_upper_bound() {
        let light = solid(1, 1, [220, 230, 210]).clear_range(200, 255);
        assert_eq!(light.as_rgba().get_pixel(0, 0).0[3], 0);

        let white = solid(1, 1, [255, 255, 255]).clear_range(200, 255);
        assert_eq!(white.as_rgba().get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn zero_sigma_is_a_no_op() {
        let processor = solid(3, 3, [1, 2, 3]).smooth(0.0);
        assert_eq!(*processor.as_rgba().get_pixel(1, 1), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn limit_size_keeps_aspect_ratio() {
        let processor = solid(400, 200, [0, 0, 0]).limit_size(100);
        assert_eq!((processor.width(), processor.height()), (100, 50));
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let png = solid(7, 5, [9, 9, 9]).to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
    }
}
