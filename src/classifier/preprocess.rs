//! Bitmap to input tensor conversion.
//!
//! Matches the MNIST convention: a single luminance channel, digit centred in
//! a square frame, bright ink on a dark background.

use crate::canvas::DrawingBitmap;
use crate::config::schema::ClassifierConfig;
use crate::error::{ClassificationError, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// How pixel values are scaled before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelScale {
    /// [0, 1]
    Unit,
    /// [0, 255]
    Byte,
}

impl PixelScale {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == "byte" {
            Self::Byte
        } else {
            Self::Unit
        }
    }
}

/// Preprocessing parameters derived from the classifier config
#[derive(Debug, Clone, Copy)]
pub struct InputLayout {
    pub size: u32,
    pub invert: bool,
    pub scale: PixelScale,
}

impl InputLayout {
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            size: config.input_size,
            invert: config.invert,
            scale: PixelScale::from_name(&config.pixel_scale),
        }
    }
}

/// Convert a bitmap into a flat `size * size` tensor
pub fn to_input(bitmap: &DrawingBitmap, layout: &InputLayout) -> Result<Vec<f32>> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(ClassificationError::InvalidInput(format!(
            "bitmap has no pixels ({width}x{height})"
        ))
        .into());
    }

    // Paper colour when inverting, ink-free black otherwise
    let background = if layout.invert { 255 } else { 0 };

    let side = width.max(height);
    let mut square = GrayImage::from_pixel(side, side, Luma([background]));
    imageops::overlay(
        &mut square,
        bitmap.pixels(),
        i64::from((side - width) / 2),
        i64::from((side - height) / 2),
    );

    let resized = imageops::resize(&square, layout.size, layout.size, FilterType::Triangle);

    let input = resized
        .pixels()
        .map(|Luma([v])| {
            let v = if layout.invert { 255 - *v } else { *v };
            match layout.scale {
                PixelScale::Unit => f32::from(v) / 255.0,
                PixelScale::Byte => f32::from(v),
            }
        })
        .collect();

    Ok(input)
}
