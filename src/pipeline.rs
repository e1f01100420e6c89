use image::{DynamicImage, RgbaImage};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::config::{ScanConfig, ScanOptions};
use crate::detection::classify::ModelLoader;
use crate::detection::content::ContentExtractor;
use crate::detection::ocr::{RecognitionTasks, TextRecognizer};
use crate::detection::preprocessing::crop;
use crate::detection::region::RegionDetector;
use crate::error::ScanError;
use crate::model_cache::ModelCache;
use crate::models::{BoundingBox, Item, Stockpile, StockpileBox};

/// Debug configuration for scans
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

struct OcrLimit {
    cap: usize,
    permits: Arc<Semaphore>,
}

impl OcrLimit {
    fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            permits: Arc::new(Semaphore::new(cap)),
        }
    }
}

/// Entry point: finds the stockpile in a screenshot and reads its contents
pub struct StockpileScanner<R: TextRecognizer, L: ModelLoader> {
    recognizer: Arc<R>,
    loader: L,
    models: ModelCache<L::Model>,
    ocr_limit: Mutex<OcrLimit>,
    config: ScanConfig,
    debug: Option<DebugConfig>,
}

impl<R: TextRecognizer, L: ModelLoader> StockpileScanner<R, L> {
    pub fn new(recognizer: R, loader: L) -> Self {
        let default_cap = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            recognizer: Arc::new(recognizer),
            loader,
            models: ModelCache::new(),
            ocr_limit: Mutex::new(OcrLimit::new(default_cap)),
            config: ScanConfig::default(),
            debug: None,
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ocr_concurrency(self, cap: usize) -> Self {
        Self {
            ocr_limit: Mutex::new(OcrLimit::new(cap)),
            ..self
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn models(&self) -> &ModelCache<L::Model> {
        &self.models
    }

    /// Replace the recognition cap. Scans already running keep their old limit.
    pub async fn set_ocr_concurrency(&self, cap: usize) {
        *self.ocr_limit.lock().await = OcrLimit::new(cap);
    }

    pub async fn ocr_concurrency(&self) -> usize {
        self.ocr_limit.lock().await.cap
    }

    /// Locate the stockpile in `screenshot` and read every item in it.
    /// `Ok(None)` means no region qualified.
    #[instrument(skip_all, fields(model_id = %model_id, width = screenshot.width(), height = screenshot.height()))]
    pub async fn process(
        &self,
        screenshot: &DynamicImage,
        model_id: &str,
        class_labels: &[String],
        options: ScanOptions,
    ) -> Result<Option<Stockpile>, ScanError> {
        if let Some(cap) = options.ocr_concurrency {
            self.set_ocr_concurrency(cap).await;
        }

        let model = self
            .models
            .get_or_load(model_id, || self.loader.load(model_id))
            .await
            .map_err(|e| ScanError::ModelLoad {
                model_id: model_id.to_string(),
                message: format!("{:#}", e),
            })?;

        let pixels: Cow<'_, RgbaImage> = match screenshot.as_rgba8() {
            Some(pixels) => Cow::Borrowed(pixels),
            None => Cow::Owned(screenshot.to_rgba8()),
        };
        let detector = RegionDetector::new(self.config.region.clone());
        let Some(mut bounds) = detector.detect(&pixels) else {
            info!("No stockpile region found");
            return Ok(None);
        };
        debug!(
            "Stockpile region at {},{} {}x{}",
            bounds.x, bounds.y, bounds.width, bounds.height
        );

        let stockpile_image = crop_stockpile(screenshot, bounds)?;
        let permits = Arc::clone(&self.ocr_limit.lock().await.permits);
        let tasks = RecognitionTasks::new(Arc::clone(&self.recognizer), permits);
        let mut contents = ContentExtractor::new(&self.config.content)
            .extract(&stockpile_image, tasks, &*model, class_labels)
            .await?;

        let overhang = include_icon_overhang(&mut bounds, &mut contents);
        let stockpile_image = if overhang > 0 {
            debug!("Grew stockpile top by {} rows", overhang);
            crop_stockpile(screenshot, bounds)?
        } else {
            stockpile_image
        };

        let stockpile = Stockpile {
            stockpile_box: StockpileBox {
                bounds,
                image: stockpile_image,
            },
            contents,
        };

        info!(
            "Stockpile at {},{} {}x{} with {} items",
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            stockpile.contents.len()
        );

        if let Some(debug_config) = &self.debug {
            if let Err(e) = save_debug_output(debug_config, &stockpile) {
                warn!("Failed to save debug output: {:#}", e);
            }
        }

        Ok(Some(stockpile))
    }
}

fn crop_stockpile(screenshot: &DynamicImage, bounds: BoundingBox) -> Result<DynamicImage, ScanError> {
    crop(screenshot, bounds, None, None).map_err(|source| ScanError::Crop {
        what: "stockpile",
        source,
    })
}

/// The first row of icons sits above the detected border by up to one icon side.
/// Grow `bounds` upwards by that much (stopping at the image top) and move the
/// items down so they stay relative to the new top. Returns the rows added.
pub fn include_icon_overhang(bounds: &mut BoundingBox, contents: &mut [Item]) -> u32 {
    let Some(first) = contents.first() else {
        return 0;
    };
    let overhang = first.icon_box.bounds.height.min(bounds.y);
    if overhang == 0 {
        return 0;
    }

    bounds.y -= overhang;
    bounds.height += overhang;
    for item in contents.iter_mut() {
        item.shift_down(overhang);
    }
    overhang
}

fn save_debug_output(debug_config: &DebugConfig, stockpile: &Stockpile) -> anyhow::Result<()> {
    let root = &debug_config.output_dir;
    let quantity_dir = root.join("quantities");
    let icon_dir = root.join("icons");
    std::fs::create_dir_all(&quantity_dir)?;
    std::fs::create_dir_all(&icon_dir)?;

    stockpile
        .stockpile_box
        .image
        .save(root.join("stockpile.png"))
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

    for (idx, item) in stockpile.contents.iter().enumerate() {
        let filename = format!("{:02}.png", idx + 1);
        item.quantity_box
            .image
            .save(quantity_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        item.icon_box
            .image
            .save(icon_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }

    debug!("Debug: saved {} items to {}", stockpile.contents.len(), root.display());
    Ok(())
}
