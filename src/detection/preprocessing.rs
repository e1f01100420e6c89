use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::map::map_colors;

use crate::error::CropError;
use crate::models::BoundingBox;

/// Pixel post-process applied to a crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropFilter {
    /// Invert RGB, then stretch around mid-grey by `contrast`; alpha untouched
    InvertContrast { contrast: f32 },
}

impl CropFilter {
    fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match *self {
            CropFilter::InvertContrast { contrast } => map_colors(image, |pixel: Rgba<u8>| {
                let [r, g, b, a] = pixel.0;
                let adjust = |channel: u8| {
                    let inverted = 255.0 - channel as f32;
                    ((inverted - 127.5) * contrast + 127.5).round().clamp(0.0, 255.0) as u8
                };
                Rgba([adjust(r), adjust(g), adjust(b), a])
            }),
        }
    }
}

/// Copy `bounds` out of `image`, optionally filtering and uniformly rescaling the result.
/// The output measures `round(width * scale) x round(height * scale)`.
pub fn crop(
    image: &DynamicImage,
    bounds: BoundingBox,
    filter: Option<CropFilter>,
    scale: Option<f32>,
) -> Result<DynamicImage, CropError> {
    let (image_width, image_height) = image.dimensions();
    if !bounds.fits_within(image_width, image_height) {
        return Err(CropError::OutOfBounds {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            image_width,
            image_height,
        });
    }

    let mut region = image
        .crop_imm(bounds.x, bounds.y, bounds.width, bounds.height)
        .to_rgba8();

    if let Some(filter) = filter {
        region = filter.apply(&region);
    }

    if let Some(scale) = scale {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CropError::InvalidScale);
        }
        let width = ((bounds.width as f32 * scale).round() as u32).max(1);
        let height = ((bounds.height as f32 * scale).round() as u32).max(1);
        if (width, height) != region.dimensions() {
            region = imageops::resize(&region, width, height, FilterType::Triangle);
        }
    }

    Ok(DynamicImage::ImageRgba8(region))
}

/// Bilinear resize to a square classifier input
pub fn resize_square(image: &DynamicImage, size: u32) -> RgbaImage {
    imageops::resize(&image.to_rgba8(), size, size, FilterType::Triangle)
}
