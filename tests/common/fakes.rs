use image::{DynamicImage, GenericImageView};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stockpile_scan::detection::{IconClassifier, ModelLoader, TextRecognizer};

/// Answers by the width of the upscaled quantity crop
#[derive(Default)]
pub struct FakeRecognizer {
    texts: HashMap<u32, String>,
    failing_width: Option<u32>,
    panicking_width: Option<u32>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, crop_width: u32, text: &str) -> Self {
        self.texts.insert(crop_width, text.to_string());
        self
    }

    pub fn failing_on(mut self, crop_width: u32) -> Self {
        self.failing_width = Some(crop_width);
        self
    }

    pub fn panicking_on(mut self, crop_width: u32) -> Self {
        self.panicking_width = Some(crop_width);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let width = image.width();
        if self.failing_width == Some(width) {
            anyhow::bail!("engine crashed on {}px crop", width);
        }
        if self.panicking_width == Some(width) {
            panic!("recognizer panicked on {}px crop", width);
        }
        Ok(self.texts.get(&width).cloned().unwrap_or_default())
    }
}

/// Red-dominant icons are class 0, anything else is class 1
pub struct FakeClassifier {
    pub red_class: usize,
    pub other_class: usize,
    pub predictions: Arc<AtomicUsize>,
    failing_prediction: Option<usize>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
}

impl IconClassifier for FakeClassifier {
    async fn predict(&self, icon: &DynamicImage) -> anyhow::Result<usize> {
        let attempt = self.predictions.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_prediction == Some(attempt) {
            anyhow::bail!("classifier crashed on icon {}", attempt + 1);
        }
        let (width, height) = icon.dimensions();
        let center = icon.get_pixel(width / 2, height / 2);
        if center[0] > center[2] {
            Ok(self.red_class)
        } else {
            Ok(self.other_class)
        }
    }
}

#[derive(Default)]
pub struct FakeLoader {
    pub loads: Arc<AtomicUsize>,
    pub predictions: Arc<AtomicUsize>,
    pub fail_first: bool,
    /// Class reported for non-red icons; defaults to 1
    pub other_class: Option<usize>,
    /// Zero-based prediction that returns an error
    pub failing_prediction: Option<usize>,
    pub predict_delay: Option<Duration>,
    pub max_predictions_in_flight: Arc<AtomicUsize>,
}

impl ModelLoader for FakeLoader {
    type Model = FakeClassifier;

    async fn load(&self, model_id: &str) -> anyhow::Result<FakeClassifier> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && attempt == 0 {
            anyhow::bail!("no model at {}", model_id);
        }
        Ok(FakeClassifier {
            red_class: 0,
            other_class: self.other_class.unwrap_or(1),
            predictions: Arc::clone(&self.predictions),
            failing_prediction: self.failing_prediction,
            delay: self.predict_delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: Arc::clone(&self.max_predictions_in_flight),
        })
    }
}
