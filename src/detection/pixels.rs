use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;

/// Lightness and saturation of an RGB triple, HSL style.
/// Lightness is `(max + min) / 2` in channel units, saturation `(max - min) / max`.
#[inline]
pub fn lightness_saturation(r: u8, g: u8, b: u8) -> (f32, f32) {
    let max = r.max(g).max(b) as f32;
    let min = r.min(g).min(b) as f32;
    let lightness = (max + min) / 2.0;
    let saturation = if max > 0.0 { (max - min) / max } else { 0.0 };
    (lightness, saturation)
}

#[inline]
pub fn check_pixel(
    pixel: &Rgba<u8>,
    max_saturation: f32,
    target_lightness: f32,
    max_lightness_deviation: f32,
) -> bool {
    let [r, g, b, _] = pixel.0;
    let (lightness, saturation) = lightness_saturation(r, g, b);
    saturation <= max_saturation && (lightness - target_lightness).abs() < max_lightness_deviation
}

#[inline]
pub fn is_dark(pixel: &Rgba<u8>, max_saturation: f32, max_lightness: f32) -> bool {
    check_pixel(pixel, max_saturation, 0.0, max_lightness)
}

#[inline]
pub fn is_grey(
    pixel: &Rgba<u8>,
    max_saturation: f32,
    target_grey: u8,
    max_lightness_deviation: f32,
) -> bool {
    check_pixel(pixel, max_saturation, target_grey as f32, max_lightness_deviation)
}

/// Rounded Rec. 601 luma
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

/// Exact-integer frequency table used wherever the scan needs a mode
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    counts: BTreeMap<u32, u32>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: u32) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    /// Most frequent value; ties go to the smallest value
    pub fn mode(&self) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for (&value, &count) in &self.counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((value, count)),
            }
        }
        best.map(|(value, _)| value)
    }
}

/// Most common neutral grey in the image, the background of quantity labels.
/// Only pixels whose green and blue channels equal their luma count.
pub fn reference_grey(image: &RgbaImage, min_grey: u8, max_grey: u8) -> Option<u8> {
    let mut greys = Histogram::new();
    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        let value = luma(r, g, b);
        if value >= min_grey && value <= max_grey && g == value && b == value {
            greys.add(value as u32);
        }
    }
    greys.mode().map(|value| value as u8)
}
