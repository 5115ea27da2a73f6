use crate::error::{ClassificationError, Result};
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// Read-only grayscale snapshot handed to the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingBitmap {
    image: GrayImage,
}

impl DrawingBitmap {
    #[must_use]
    pub const fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Convert any decoded image to luminance
    #[must_use]
    pub fn from_image(image: &DynamicImage) -> Self {
        Self::new(image.to_luma8())
    }

    /// Load an image file (PNG or JPEG)
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|e| {
            ClassificationError::InvalidInput(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(Self::from_image(&image))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub const fn pixels(&self) -> &GrayImage {
        &self.image
    }

    /// Count of pixels with any ink
    #[must_use]
    pub fn ink_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_from_rgb_image() {
        let rgb = RgbImage::from_pixel(4, 2, image::Rgb([255, 255, 255]));
        let bitmap = DrawingBitmap::from_image(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(bitmap.width(), 4);
        assert_eq!(bitmap.height(), 2);
        assert_eq!(bitmap.ink_pixels(), 8);
    }

    #[test]
    fn test_open_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("digit.png");
        let mut image = GrayImage::new(28, 28);
        image.put_pixel(14, 14, Luma([255]));
        image.save(&path).unwrap();

        let bitmap = DrawingBitmap::open(&path).unwrap();
        assert_eq!(bitmap.width(), 28);
        assert_eq!(bitmap.ink_pixels(), 1);
    }

    #[test]
    fn test_open_not_an_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("digit.png");
        std::fs::write(&path, b"plain text").unwrap();

        let err = DrawingBitmap::open(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
