use thiserror::Error;

// Errors surfaced by a stockpile scan

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to load classification model {model_id}: {message}")]
    ModelLoad { model_id: String, message: String },
    #[error("Text recognition failed: {0:#}")]
    Recognition(anyhow::Error),
    #[error("Icon classification failed: {0:#}")]
    Classification(anyhow::Error),
    #[error("Classifier returned class {index} but only {labels} labels are known")]
    UnknownClass { index: usize, labels: usize },
    #[error("Failed to crop {what}: {source}")]
    Crop {
        what: &'static str,
        source: CropError,
    },
    #[error("Recognition task did not complete: {0}")]
    TaskJoin(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error("box {x},{y} {width}x{height} is outside the {image_width}x{image_height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("scale factor must be positive")]
    InvalidScale,
}

/// Recognized text that is neither a plain integer nor `<N>k+`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to parse quantity: {0:?}")]
pub struct UnparseableQuantity(pub String);
