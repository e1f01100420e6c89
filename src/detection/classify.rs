use anyhow::anyhow;
use image::DynamicImage;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::preprocessing::resize_square;
use crate::error::ScanError;

/// A loaded icon classification model
pub trait IconClassifier: Send + Sync + 'static {
    /// Index into the caller's class-label table
    fn predict(&self, icon: &DynamicImage) -> impl Future<Output = anyhow::Result<usize>> + Send;
}

/// Loads classification models by identifier
pub trait ModelLoader: Send + Sync + 'static {
    type Model: IconClassifier;

    fn load(&self, model_id: &str) -> impl Future<Output = anyhow::Result<Self::Model>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code_name: String,
    pub is_crated: bool,
}

/// Look up a class index; a trailing `crated_suffix` marks the crated variant
pub fn resolve_label(
    labels: &[String],
    index: usize,
    crated_suffix: &str,
) -> Result<Classification, ScanError> {
    let label = labels.get(index).ok_or(ScanError::UnknownClass {
        index,
        labels: labels.len(),
    })?;

    let classification = match label.strip_suffix(crated_suffix) {
        Some(code_name) if !crated_suffix.is_empty() => Classification {
            code_name: code_name.to_string(),
            is_crated: true,
        },
        _ => Classification {
            code_name: label.clone(),
            is_crated: false,
        },
    };
    Ok(classification)
}

/// Loads `.rten` models; the model identifier is a file path
#[derive(Debug, Clone)]
pub struct RtenModelLoader {
    pub input_size: u32,
}

impl Default for RtenModelLoader {
    fn default() -> Self {
        Self { input_size: 32 }
    }
}

impl ModelLoader for RtenModelLoader {
    type Model = RtenIconClassifier;

    async fn load(&self, model_id: &str) -> anyhow::Result<RtenIconClassifier> {
        let path = PathBuf::from(model_id);
        let model = tokio::task::spawn_blocking(move || Model::load_file(&path)).await??;
        Ok(RtenIconClassifier {
            model: Arc::new(model),
            input_size: self.input_size,
        })
    }
}

/// Image classifier over an NHWC input of raw 0-255 RGB values
pub struct RtenIconClassifier {
    model: Arc<Model>,
    input_size: u32,
}

impl IconClassifier for RtenIconClassifier {
    async fn predict(&self, icon: &DynamicImage) -> anyhow::Result<usize> {
        let size = self.input_size as usize;
        let resized = resize_square(icon, self.input_size);
        let data: Vec<f32> = resized
            .pixels()
            .flat_map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();
        let model = Arc::clone(&self.model);

        tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let input = NdTensor::from_data([1, size, size, 3], data);
            let output = model
                .run_one(input.view().into(), None)
                .map_err(|e| anyhow!("Icon inference failed: {}", e))?;
            let logits: NdTensor<f32, 2> = output
                .try_into()
                .map_err(|e| anyhow!("Unexpected classifier output: {}", e))?;
            argmax(logits.iter().copied()).ok_or_else(|| anyhow!("Classifier produced no logits"))
        })
        .await?
    }
}

fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (index, value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}
