use anyhow::anyhow;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use regex::Regex;
use rten::Model;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::error::{ScanError, UnparseableQuantity};
use crate::models::BoundingBox;

/// Text recognition collaborator. Implementations must be shareable across tasks.
pub trait TextRecognizer: Send + Sync + 'static {
    fn recognize(&self, image: &DynamicImage) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Recognizer backed by an `ocrs` engine
pub struct OcrsRecognizer {
    engine: Arc<OcrEngine>,
}

impl OcrsRecognizer {
    /// Load models from `~/.cache/ocrs`
    pub fn from_default_cache() -> anyhow::Result<Self> {
        Self::from_cache_dir(&default_cache_dir()?)
    }

    pub fn from_cache_dir(cache_dir: &Path) -> anyhow::Result<Self> {
        let detection_model_path = cache_dir.join("text-detection.rten");
        let recognition_model_path = cache_dir.join("text-recognition.rten");

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            anyhow::bail!(
                "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
                 Expected locations:\n  - {}\n  - {}",
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        let detection_model = Model::load_file(&detection_model_path)?;
        let recognition_model = Model::load_file(&recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })?;

        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

fn default_cache_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

impl TextRecognizer for OcrsRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> anyhow::Result<String> {
        let engine = Arc::clone(&self.engine);
        let rgb = image.to_rgb8();

        tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
                .map_err(|e| anyhow!("Invalid OCR input: {}", e))?;
            let input = engine
                .prepare_input(source)
                .map_err(|e| anyhow!("Failed to prepare OCR input: {}", e))?;
            let text = engine
                .get_text(&input)
                .map_err(|e| anyhow!("OCR failed: {}", e))?;
            Ok(text.trim().to_string())
        })
        .await?
    }
}

/// Quantity recognitions in flight for one extraction.
///
/// Tasks start as soon as they are scheduled and are bounded by the shared
/// semaphore; [`RecognitionTasks::join_all`] waits for every one of them.
pub struct RecognitionTasks<R: TextRecognizer> {
    recognizer: Arc<R>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<(usize, BoundingBox, anyhow::Result<String>)>,
}

impl<R: TextRecognizer> RecognitionTasks<R> {
    pub fn new(recognizer: Arc<R>, permits: Arc<Semaphore>) -> Self {
        Self {
            recognizer,
            permits,
            tasks: JoinSet::new(),
        }
    }

    /// Start recognizing the quantity image of item `index`
    pub fn schedule(&mut self, index: usize, bounds: BoundingBox, image: DynamicImage) {
        let recognizer = Arc::clone(&self.recognizer);
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            let text = match permits.acquire_owned().await {
                Ok(_permit) => recognizer.recognize(&image).await,
                Err(e) => Err(anyhow::anyhow!("Recognition limiter closed: {}", e)),
            };
            (index, bounds, text)
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every task. Unparseable text yields `None` for that item;
    /// any other failure is returned once all tasks have finished.
    pub async fn join_all(mut self) -> Result<Vec<(usize, Option<u32>)>, ScanError> {
        let mut quantities = Vec::with_capacity(self.tasks.len());
        let mut failure = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, bounds, Ok(text))) => match parse_quantity(&text) {
                    Ok(quantity) => quantities.push((index, Some(quantity))),
                    Err(e) => {
                        warn!("{} at {},{} {}x{}", e, bounds.x, bounds.y, bounds.width, bounds.height);
                        quantities.push((index, None));
                    }
                },
                Ok((_, _, Err(e))) => {
                    failure.get_or_insert(ScanError::Recognition(e));
                }
                Err(e) => {
                    failure.get_or_insert(ScanError::TaskJoin(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(quantities),
        }
    }
}

static THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-9][0-9]*)k\+$").expect("valid thousands pattern"));
static PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-9][0-9]*|[0-9])$").expect("valid quantity pattern"));

/// Parse a quantity label: `"5"` is 5, `"12k+"` is 12000
pub fn parse_quantity(text: &str) -> Result<u32, UnparseableQuantity> {
    let value = text.trim();
    let unparseable = || UnparseableQuantity(value.to_string());

    if let Some(captures) = THOUSANDS.captures(value) {
        return captures[1]
            .parse::<u32>()
            .ok()
            .and_then(|thousands| thousands.checked_mul(1000))
            .ok_or_else(unparseable);
    }
    if PLAIN.is_match(value) {
        return value.parse::<u32>().map_err(|_| unparseable());
    }
    Err(unparseable())
}
