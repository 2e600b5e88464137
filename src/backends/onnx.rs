//! ONNX Runtime backend for classifier models
//!
//! Runs on the CPU execution provider. `Session::run` needs exclusive access,
//! so concurrent requests are serialized on a mutex around the session.

use crate::backends::resolve_threads;
use crate::error::{ClassifierError, Result};
use crate::inference::InferenceBackend;
use crate::types::RawOutputVector;
use instant::Instant;
use log;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// ONNX Runtime backend holding a committed session
#[derive(Debug)]
pub struct OnnxBackend {
    session: Mutex<Session>,
    model_path: PathBuf,
}

impl OnnxBackend {
    /// Build a session for the model at `model_path`
    ///
    /// # Errors
    /// - `ModelLoad` when the runtime rejects the session options or the model
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self> {
        let load_start = Instant::now();
        let threads = resolve_threads(intra_threads);

        log::info!("🚀 Initializing ONNX Runtime backend");
        log::info!("🧠 Model: {}", model_path.display());
        log::debug!("  - Intra-op threads: {threads}");

        let session = Session::builder()
            .map_err(|e| {
                ClassifierError::model_load(format!("Failed to create session builder: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                ClassifierError::model_load(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(threads)
            .map_err(|e| {
                ClassifierError::model_load(format!("Failed to set intra threads: {e}"))
            })?
            .commit_from_file(model_path)
            .map_err(|e| {
                ClassifierError::model_load(format!(
                    "Failed to load ONNX model '{}': {e}",
                    model_path.display()
                ))
            })?;

        log::info!(
            "✅ ONNX Runtime backend initialized in {}ms",
            load_start.elapsed().as_millis()
        );

        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl InferenceBackend for OnnxBackend {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn infer(&self, input: &Array4<f32>) -> Result<RawOutputVector> {
        log::debug!("🚀 Starting ONNX inference with input shape: {:?}", input.dim());
        let inference_start = Instant::now();

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            ClassifierError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::internal("ONNX session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifierError::inference(format!("ONNX inference failed: {e}")))?;

        // Positional access: classifiers expose a single output
        let values: Vec<f32> = {
            let keys: Vec<_> = outputs.keys().collect();
            let Some(first_key) = keys.first() else {
                return Err(ClassifierError::inference("No output tensors found"));
            };
            let output_tensor = outputs
                .get(first_key)
                .ok_or_else(|| ClassifierError::inference("First output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| {
                    ClassifierError::inference(format!("Failed to extract output tensor: {e}"))
                })?;
            output_tensor.iter().copied().collect()
        };

        log::debug!(
            "📊 ONNX inference complete: {}ms ({} outputs)",
            inference_start.elapsed().as_millis(),
            values.len()
        );
        Ok(RawOutputVector::from_vec(values))
    }
}
