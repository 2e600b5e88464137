//! Inference backend abstraction and the process-wide engine
//!
//! The engine is built once at startup. It either holds a loaded backend or
//! records why loading failed; both states are final, and a failed engine
//! answers every prediction with `ModelUnavailable` instead of retrying.

use crate::{
    config::{BackendType, ClassifierConfig},
    error::{ClassifierError, Result},
    types::{ImageTensor, RawOutputVector},
    utils::TensorValidator,
};
use instant::Instant;
use ndarray::Array4;
use serde::Serialize;
use tracing::{debug, error, info};

/// Trait for inference backends
///
/// Backends are shared across concurrent requests, so `infer` takes `&self`.
pub trait InferenceBackend: Send + Sync {
    /// Short backend name for logs and health reporting
    fn name(&self) -> &'static str;

    /// Run a single-image forward pass
    ///
    /// # Errors
    /// - Model inference failures
    /// - Output tensor extraction errors
    fn infer(&self, input: &Array4<f32>) -> Result<RawOutputVector>;
}

/// Factory trait for creating inference backends
pub trait BackendFactory: Send + Sync {
    /// Create a backend of the given type from the configured model file
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::ModelLoad` for:
    /// - Backend types not compiled into this build
    /// - Unreadable or incompatible model files
    fn create_backend(
        &self,
        backend_type: BackendType,
        config: &ClassifierConfig,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

enum EngineState {
    Unloaded,
    Loaded(Box<dyn InferenceBackend>),
    Failed(String),
}

/// Externally visible engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EngineStatus {
    Unloaded,
    Loaded { backend: String },
    Failed { reason: String },
}

/// Owns the model for the lifetime of the process
pub struct InferenceEngine {
    state: EngineState,
    input_shape: (usize, usize, usize, usize),
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("status", &self.status())
            .field("input_shape", &self.input_shape)
            .finish()
    }
}

impl InferenceEngine {
    /// An engine that never had a model
    #[must_use]
    pub fn unloaded(input_shape: (usize, usize, usize, usize)) -> Self {
        Self {
            state: EngineState::Unloaded,
            input_shape,
        }
    }

    /// Wrap an already-constructed backend
    #[must_use]
    pub fn from_backend(
        backend: Box<dyn InferenceBackend>,
        input_shape: (usize, usize, usize, usize),
    ) -> Self {
        Self {
            state: EngineState::Loaded(backend),
            input_shape,
        }
    }

    /// Load the configured model with the default backend factory
    ///
    /// # Errors
    /// - `ModelLoad` when the file is missing or the backend rejects it
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        Self::load_with_factory(config, &crate::backends::DefaultBackendFactory)
    }

    /// Load the configured model through `factory`
    ///
    /// # Errors
    /// - `ModelLoad` when the file is missing or the backend rejects it
    pub fn load_with_factory(
        config: &ClassifierConfig,
        factory: &dyn BackendFactory,
    ) -> Result<Self> {
        let model_path = &config.model_path;
        if !model_path.is_file() {
            return Err(ClassifierError::model_load_error_with_context(
                "load",
                model_path,
                "file not found",
                &["set MODEL_PATH to an existing model file"],
            ));
        }

        let load_start = Instant::now();
        info!(
            backend = %config.backend,
            path = %model_path.display(),
            "loading model"
        );

        let backend = factory.create_backend(config.backend, config)?;

        info!(
            backend = backend.name(),
            elapsed_ms = load_start.elapsed().as_millis(),
            "model loaded"
        );
        Ok(Self::from_backend(backend, config.input_shape()))
    }

    /// Load the model, degrading to a failed engine instead of returning an error
    #[must_use]
    pub fn load_or_degraded(config: &ClassifierConfig) -> Self {
        Self::load_or_degraded_with_factory(config, &crate::backends::DefaultBackendFactory)
    }

    /// [`InferenceEngine::load_or_degraded`] with an explicit factory
    #[must_use]
    pub fn load_or_degraded_with_factory(
        config: &ClassifierConfig,
        factory: &dyn BackendFactory,
    ) -> Self {
        match Self::load_with_factory(config, factory) {
            Ok(engine) => engine,
            Err(e) => {
                error!(error = %e, "model load failed; predictions will be unavailable");
                Self {
                    state: EngineState::Failed(e.to_string()),
                    input_shape: config.input_shape(),
                }
            },
        }
    }

    /// Run the model on one preprocessed image
    ///
    /// # Errors
    /// - `ModelUnavailable` when no model is loaded
    /// - `Inference` for shape mismatches and backend failures
    pub fn predict(&self, tensor: &ImageTensor) -> Result<RawOutputVector> {
        let backend = self.backend()?;

        TensorValidator::validate_tensor_shape(tensor.as_array(), self.input_shape)?;

        let start = Instant::now();
        let output = backend.infer(tensor.as_array()).map_err(|e| match e {
            ClassifierError::Inference(_) => e,
            other => ClassifierError::inference(other.to_string()),
        })?;
        debug!(
            backend = backend.name(),
            outputs = output.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "forward pass complete"
        );
        Ok(output)
    }

    /// Fail fast with `ModelUnavailable` unless a model is loaded
    ///
    /// # Errors
    /// - `ModelUnavailable` for unloaded and failed engines
    pub fn ensure_loaded(&self) -> Result<()> {
        self.backend().map(|_| ())
    }

    fn backend(&self) -> Result<&dyn InferenceBackend> {
        match &self.state {
            EngineState::Loaded(backend) => Ok(backend.as_ref()),
            EngineState::Unloaded => Err(ClassifierError::model_unavailable("model not loaded")),
            EngineState::Failed(reason) => Err(ClassifierError::model_unavailable(format!(
                "model failed to load: {reason}"
            ))),
        }
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Unloaded => EngineStatus::Unloaded,
            EngineState::Loaded(backend) => EngineStatus::Loaded {
                backend: backend.name().to_string(),
            },
            EngineState::Failed(reason) => EngineStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, EngineState::Loaded(_))
    }

    #[must_use]
    pub fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.input_shape
    }
}
