use serde::Deserialize;

/// Thresholds for locating the bordered inventory region
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionParams {
    /// Shortest dark run (in pixels) recorded as a stripe
    pub min_width: u32,
    /// Boxes with `bottom - top` below this are rejected
    pub min_height: u32,
    /// Saturation ratio in [0, 1]; 1.0 leaves the gate open
    pub max_dark_saturation: f32,
    pub max_dark_lightness: f32,
    /// Stripes whose right edge is within this distance of the bucket mode join the box
    pub merge_variance: u32,
    /// Fraction of rows along each vertical edge that must be dark
    pub min_dark_edge_ratio: f32,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 25,
            max_dark_saturation: 1.0,
            max_dark_lightness: 32.0,
            merge_variance: 3,
            min_dark_edge_ratio: 0.8,
        }
    }
}

/// Thresholds for finding quantity labels and icons inside the region
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContentParams {
    pub min_quantity_width: u32,
    pub max_quantity_width: u32,
    pub min_quantity_height: u32,
    pub max_quantity_height: u32,
    pub max_grey_saturation: f32,
    pub max_grey_lightness_deviation: f32,
    /// Luma range considered when picking the reference grey
    pub min_grey: u8,
    pub max_grey: u8,
    /// Upscale applied to quantity crops before recognition
    pub quantity_scale: f32,
    pub quantity_contrast: f32,
    pub crated_suffix: String,
    /// Side length icons are resized to before classification
    pub icon_input_size: u32,
}

impl Default for ContentParams {
    fn default() -> Self {
        Self {
            min_quantity_width: 40,
            max_quantity_width: 90,
            min_quantity_height: 30,
            max_quantity_height: 70,
            max_grey_saturation: 1.0,
            max_grey_lightness_deviation: 16.0,
            min_grey: 32,
            max_grey: 224,
            quantity_scale: 5.0,
            quantity_contrast: 4.0,
            crated_suffix: "-crated".to_string(),
            icon_input_size: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub region: RegionParams,
    pub content: ContentParams,
}

impl ScanConfig {
    /// Load overrides from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        Ok(config)
    }
}

/// Per-call options for [`crate::StockpileScanner::process`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Replaces the recognition concurrency cap before scanning
    pub ocr_concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{ "region": { "min_width": 80 } }"#).unwrap();
        assert_eq!(config.region.min_width, 80);
        assert_eq!(config.region.min_height, 25);
        assert_eq!(config.content, ContentParams::default());
    }
}
