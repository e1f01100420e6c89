use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use super::classify::{IconClassifier, resolve_label};
use super::ocr::{RecognitionTasks, TextRecognizer};
use super::pixels::{is_grey, reference_grey};
use super::preprocessing::{CropFilter, crop};
use crate::config::ContentParams;
use crate::error::ScanError;
use crate::models::{BoundingBox, IconBox, Item, QuantityBox};

/// Finds quantity labels and their icons inside a cropped stockpile
pub struct ContentExtractor<'a> {
    params: &'a ContentParams,
}

/// Per-row state while scanning for labels
#[derive(Default)]
struct RowState {
    grey_count: u32,
    quantity_bottom: Option<u32>,
    bottom_verified: bool,
    /// Exclusive right edge of the last accepted label on this row
    previous_right: Option<u32>,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(params: &'a ContentParams) -> Self {
        Self { params }
    }

    /// Scan `image` for items, classifying icons one at a time while quantity
    /// recognition runs on `tasks`. Every scheduled recognition is joined
    /// before this returns, even when the scan fails.
    pub async fn extract<R, C>(
        &self,
        image: &DynamicImage,
        mut tasks: RecognitionTasks<R>,
        classifier: &C,
        labels: &[String],
    ) -> Result<Vec<Item>, ScanError>
    where
        R: TextRecognizer,
        C: IconClassifier,
    {
        let pixels = image.to_rgba8();
        let scanned = match reference_grey(&pixels, self.params.min_grey, self.params.max_grey) {
            Some(grey) => {
                debug!("Quantity background grey: {}", grey);
                self.scan_rows(image, &pixels, grey, &mut tasks, classifier, labels)
                    .await
            }
            None => {
                debug!("No neutral grey in stockpile crop");
                Ok(Vec::new())
            }
        };

        debug!("Waiting on {} quantity recognitions", tasks.len());
        let quantities = tasks.join_all().await;
        let mut items = scanned?;
        for (index, quantity) in quantities? {
            if let Some(item) = items.get_mut(index) {
                item.quantity = quantity;
            }
        }

        debug!("Extracted {} items", items.len());
        Ok(items)
    }

    async fn scan_rows<R, C>(
        &self,
        image: &DynamicImage,
        pixels: &RgbaImage,
        grey: u8,
        tasks: &mut RecognitionTasks<R>,
        classifier: &C,
        labels: &[String],
    ) -> Result<Vec<Item>, ScanError>
    where
        R: TextRecognizer,
        C: IconClassifier,
    {
        let (width, height) = pixels.dimensions();
        let mut items = Vec::new();
        let mut row = 0;

        while row < height {
            let mut state = RowState::default();

            for col in 0..width {
                if self.is_grey_at(pixels, grey, col, row) {
                    state.grey_count += 1;
                    continue;
                }

                let run = state.grey_count;
                state.grey_count = 0;
                if run < self.params.min_quantity_width || run > self.params.max_quantity_width {
                    continue;
                }

                // Grey run just ended; check its width
                let x = col - run;
                let (bottom, gap) = match (state.quantity_bottom, state.previous_right) {
                    (Some(bottom), Some(previous_right)) if state.bottom_verified => {
                        (bottom, x as i64 - previous_right as i64)
                    }
                    _ => {
                        // Find bottom of label
                        let bottom = self.find_quantity_bottom(pixels, grey, row, x);
                        state.quantity_bottom = Some(bottom);
                        (bottom, x as i64)
                    }
                };

                let quantity_height = bottom - row + 1;
                if quantity_height < self.params.min_quantity_height
                    || quantity_height > self.params.max_quantity_height
                {
                    continue;
                }

                state.bottom_verified = true;
                let quantity = BoundingBox::new(x, row, run, quantity_height);
                state.previous_right = Some(quantity.right());

                // Centre icon in gap
                let Some(icon) = icon_bounds(&quantity, gap) else {
                    warn!(
                        "Icon for quantity at {},{} falls outside the stockpile, skipping",
                        quantity.x, quantity.y
                    );
                    continue;
                };

                let item = self
                    .build_item(image, quantity, icon, items.len(), tasks, classifier, labels)
                    .await?;
                items.push(item);
            }

            // Rows down to the label bottom were consumed by this row's labels
            row = match state.quantity_bottom {
                Some(bottom) => bottom + 1,
                None => row + 1,
            };
        }

        Ok(items)
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_item<R, C>(
        &self,
        image: &DynamicImage,
        quantity: BoundingBox,
        icon: BoundingBox,
        index: usize,
        tasks: &mut RecognitionTasks<R>,
        classifier: &C,
        labels: &[String],
    ) -> Result<Item, ScanError>
    where
        R: TextRecognizer,
        C: IconClassifier,
    {
        let filter = CropFilter::InvertContrast {
            contrast: self.params.quantity_contrast,
        };
        let quantity_image = crop(image, quantity, Some(filter), Some(self.params.quantity_scale))
            .map_err(|source| ScanError::Crop {
                what: "quantity",
                source,
            })?;
        tasks.schedule(index, quantity, quantity_image.clone());

        // Classify inline; only OCR runs concurrently

        let icon_image = crop(image, icon, None, None).map_err(|source| ScanError::Crop {
            what: "icon",
            source,
        })?;
        let class_index = classifier
            .predict(&icon_image)
            .await
            .map_err(ScanError::Classification)?;
        let classification = resolve_label(labels, class_index, &self.params.crated_suffix)?;

        Ok(Item {
            quantity_box: QuantityBox {
                bounds: quantity,
                image: quantity_image,
            },
            icon_box: IconBox {
                bounds: icon,
                image: icon_image,
            },
            quantity: None,
            code_name: classification.code_name,
            is_crated: classification.is_crated,
        })
    }

    fn is_grey_at(&self, pixels: &RgbaImage, grey: u8, x: u32, y: u32) -> bool {
        is_grey(
            pixels.get_pixel(x, y),
            self.params.max_grey_saturation,
            grey,
            self.params.max_grey_lightness_deviation,
        )
    }

    /// Last grey row going down column `col` from `row`
    fn find_quantity_bottom(&self, pixels: &RgbaImage, grey: u8, row: u32, col: u32) -> u32 {
        let mut bottom = row;
        for check_row in row + 1..pixels.height() {
            if !self.is_grey_at(pixels, grey, col, check_row) {
                break;
            }
            bottom = check_row;
        }
        bottom
    }
}

/// Square icon left of `quantity`, centred in the `gap` before it.
/// `None` when the icon would start left of column zero.
pub fn icon_bounds(quantity: &BoundingBox, gap: i64) -> Option<BoundingBox> {
    let side = quantity.height as i64;
    let icon_gap = ((gap - side) as f64 / 2.0).ceil().max(0.0) as i64;
    let x = quantity.x as i64 - icon_gap - side;
    if x < 0 {
        return None;
    }
    Some(BoundingBox::new(
        x as u32,
        quantity.y,
        quantity.height,
        quantity.height,
    ))
}
