pub mod config;
pub mod detection;
pub mod error;
pub mod model_cache;
pub mod models;
pub mod pipeline;

pub use config::{ContentParams, RegionParams, ScanConfig, ScanOptions};
pub use error::{CropError, ScanError, UnparseableQuantity};
pub use model_cache::ModelCache;
pub use models::{
    BoundingBox, CandidateBox, IconBox, Item, QuantityBox, Stockpile, StockpileBox, Stripe,
};
pub use detection::ocr::RecognitionTasks;
pub use pipeline::{DebugConfig, StockpileScanner, include_icon_overhang};
