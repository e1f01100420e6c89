pub mod classify;
pub mod content;
pub mod ocr;
pub mod pixels;
pub mod preprocessing;
pub mod region;

pub use classify::{IconClassifier, ModelLoader, RtenIconClassifier, RtenModelLoader};
pub use content::ContentExtractor;
pub use ocr::{OcrsRecognizer, RecognitionTasks, TextRecognizer, parse_quantity};
pub use preprocessing::{CropFilter, crop};
pub use region::RegionDetector;
