//! Inference backends for classifier models
//!
//! - Tract backend (pure Rust, default)
//! - ONNX Runtime backend (native runtime, optional)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

use crate::{
    config::{BackendType, ClassifierConfig},
    error::{ClassifierError, Result},
    inference::{BackendFactory, InferenceBackend},
};

/// Creates the backends compiled into this build
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        config: &ClassifierConfig,
    ) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(OnnxBackend::load(
                &config.model_path,
                config.intra_threads,
            )?)),
            #[cfg(feature = "tract")]
            BackendType::Tract => Ok(Box::new(TractBackend::load(
                &config.model_path,
                config.input_shape(),
            )?)),
            #[allow(unreachable_patterns)]
            other => {
                let _ = config;
                Err(ClassifierError::model_load(format!(
                    "{other} backend is not compiled into this build; available: {:?}",
                    self.available_backends()
                )))
            },
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        #[cfg(feature = "tract")]
        backends.push(BackendType::Tract);
        #[cfg(feature = "onnx")]
        backends.push(BackendType::Onnx);
        backends
    }
}

/// Resolve the thread count for backends that accept one; 0 means all cores
pub(crate) fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
}
