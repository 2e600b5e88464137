//! Tract backend for classifier models
//!
//! Pure Rust inference. The input fact is pinned to the configured NHWC shape
//! before optimization, so the optimized plan only accepts that shape.

use crate::error::{ClassifierError, Result};
use crate::inference::InferenceBackend;
use crate::types::RawOutputVector;
use instant::Instant;
use log;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend holding an optimized, runnable plan
#[derive(Debug)]
pub struct TractBackend {
    model: TractModel,
    model_path: PathBuf,
}

impl TractBackend {
    /// Load, pin and optimize an ONNX model
    ///
    /// # Errors
    /// - `ModelLoad` when the file cannot be parsed or optimized for `input_shape`
    pub fn load(model_path: &Path, input_shape: (usize, usize, usize, usize)) -> Result<Self> {
        let load_start = Instant::now();
        let (batch, height, width, channels) = input_shape;

        log::info!("🚀 Initializing Tract backend");
        log::info!("🧠 Model: {}", model_path.display());
        log::debug!("  - Input fact: [{batch}, {height}, {width}, {channels}]");

        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| load_error(model_path, "parse ONNX model", &e))?
            .with_input_fact(0, f32::fact([batch, height, width, channels]).into())
            .map_err(|e| load_error(model_path, "set input shape", &e))?
            .into_optimized()
            .map_err(|e| load_error(model_path, "optimize model", &e))?
            .into_runnable()
            .map_err(|e| load_error(model_path, "create runnable model", &e))?;

        log::info!(
            "✅ Tract backend initialized in {}ms",
            load_start.elapsed().as_millis()
        );

        Ok(Self {
            model,
            model_path: model_path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn load_error(path: &Path, operation: &str, error: &TractError) -> ClassifierError {
    ClassifierError::model_load(format!(
        "failed to {operation} '{}': {error}",
        path.display()
    ))
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&self, input: &Array4<f32>) -> Result<RawOutputVector> {
        log::debug!("🔮 Running Tract inference on {:?}", input.shape());
        let inference_start = Instant::now();

        let data: Vec<f32> = input.iter().copied().collect();
        let input_tensor = Tensor::from_shape(input.shape(), &data).map_err(|e| {
            ClassifierError::inference(format!("Failed to build input tensor: {e}"))
        })?;

        let outputs = self
            .model
            .run(tvec![input_tensor.into()])
            .map_err(|e| ClassifierError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            ClassifierError::inference(format!("Failed to read output tensor: {e}"))
        })?;
        let output = RawOutputVector::from_vec(output_data.iter().copied().collect());

        log::debug!(
            "✅ Tract inference completed in {}ms ({} outputs)",
            inference_start.elapsed().as_millis(),
            output.len()
        );
        Ok(output)
    }
}
