//! Stub backends and factories for testing without model files

use crate::{
    config::{BackendType, ClassifierConfig},
    error::{ClassifierError, Result},
    inference::{BackendFactory, InferenceBackend},
    types::RawOutputVector,
};
use ndarray::Array4;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Backend returning a fixed output vector
#[derive(Debug, Clone)]
pub struct StubBackend {
    output: Vec<f32>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl StubBackend {
    #[must_use]
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            output,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A backend whose every forward pass fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Shared counter of `infer` calls
    #[must_use]
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&self, _input: &Array4<f32>) -> Result<RawOutputVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ClassifierError::inference("stub backend configured to fail"));
        }
        Ok(RawOutputVector::from_vec(self.output.clone()))
    }
}

/// Factory that counts creation attempts
#[derive(Debug)]
pub struct CountingFactory {
    output: Vec<f32>,
    fail_creation: bool,
    calls: AtomicUsize,
}

impl CountingFactory {
    #[must_use]
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            output,
            fail_creation: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A factory that rejects every model
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_creation: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BackendFactory for CountingFactory {
    fn create_backend(
        &self,
        _backend_type: BackendType,
        _config: &ClassifierConfig,
    ) -> Result<Box<dyn InferenceBackend>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creation {
            return Err(ClassifierError::model_load("corrupt model graph"));
        }
        Ok(Box::new(StubBackend::new(self.output.clone())))
    }

    fn available_backends(&self) -> Vec<BackendType> {
        vec![BackendType::Tract, BackendType::Onnx]
    }
}
