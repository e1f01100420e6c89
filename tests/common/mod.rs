mod fakes;
mod fixtures;
pub use fakes::*;
pub use fixtures::*;

// Re-export commonly used types from stockpile_scan for tests
pub use stockpile_scan::{
    BoundingBox, Item, ScanConfig, ScanError, ScanOptions, Stockpile, StockpileScanner,
};
