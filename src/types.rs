//! Core data types flowing through the inference pipeline

use crate::error::{ClassifierError, Result};
use ndarray::{Array1, Array4, ArrayD};
use serde::{Deserialize, Serialize};

/// Number of color channels every model input carries
pub const CHANNELS: usize = 3;

/// Model-ready image tensor of shape `(1, height, width, 3)`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    /// Wrap an NHWC array, checking the batch and channel dimensions
    ///
    /// # Errors
    /// Returns `Internal` when the batch is not 1 or the channel count is not 3.
    pub fn new(data: Array4<f32>) -> Result<Self> {
        let (batch, height, width, channels) = data.dim();
        if batch != 1 || channels != CHANNELS || height == 0 || width == 0 {
            return Err(ClassifierError::internal(format!(
                "Image tensor must have shape (1, H, W, 3), got ({batch}, {height}, {width}, {channels})"
            )));
        }
        Ok(Self { data })
    }

    /// `(batch, height, width, channels)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    #[must_use]
    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    #[must_use]
    pub fn into_inner(self) -> Array4<f32> {
        self.data
    }
}

/// Model output for a single image: logits or probabilities, length N
///
/// Values are always held contiguously, whatever layout the backend produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutputVector {
    values: Array1<f32>,
}

impl RawOutputVector {
    /// Wrap a backend output, copying strided or reversed views into
    /// standard layout
    #[must_use]
    pub fn new(values: Array1<f32>) -> Self {
        Self {
            values: standard_layout(values),
        }
    }

    #[must_use]
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self {
            values: Array1::from(values),
        }
    }

    /// Squeeze an arbitrary-rank single-batch output into a vector
    ///
    /// A scalar output becomes a one-element vector.
    #[must_use]
    pub fn from_dyn(output: &ArrayD<f32>) -> Self {
        Self {
            values: output.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.values.as_slice().unwrap_or(&[])
    }

    #[must_use]
    pub fn values(&self) -> &Array1<f32> {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<&ProbabilityVector> for RawOutputVector {
    fn from(probs: &ProbabilityVector) -> Self {
        Self {
            values: probs.values.mapv(|p| p as f32),
        }
    }
}

/// A non-empty probability distribution over the known categories
///
/// Every element lies in `[0, 1]` and the elements sum to 1 (within tolerance).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector {
    values: Array1<f64>,
}

impl ProbabilityVector {
    /// Tolerance used when checking externally supplied distributions
    pub const TOLERANCE: f64 = 1e-3;

    /// Construct from values already known to satisfy the invariants
    pub(crate) fn from_normalized(values: Array1<f64>) -> Self {
        debug_assert!(!values.is_empty());
        Self {
            values: standard_layout(values),
        }
    }

    /// Construct from caller-supplied probabilities, checking the invariants
    ///
    /// # Errors
    /// Returns `InvalidConfig` for empty input, non-finite or out-of-range
    /// elements, or a sum further than [`Self::TOLERANCE`] from 1.
    pub fn try_from_vec(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ClassifierError::invalid_config(
                "Probability vector must not be empty",
            ));
        }
        if let Some(bad) = values
            .iter()
            .find(|p| !p.is_finite() || **p < -Self::TOLERANCE || **p > 1.0 + Self::TOLERANCE)
        {
            return Err(ClassifierError::invalid_config(format!(
                "Probability {bad} is outside [0, 1]"
            )));
        }
        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > Self::TOLERANCE {
            return Err(ClassifierError::invalid_config(format!(
                "Probabilities sum to {sum}, expected 1"
            )));
        }
        Ok(Self {
            values: Array1::from(values),
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice().unwrap_or(&[])
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }
}

fn standard_layout<A: Clone>(values: Array1<A>) -> Array1<A> {
    if values.is_standard_layout() {
        values
    } else {
        values.as_standard_layout().into_owned()
    }
}

/// Top-1 verdict for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Index into the category catalog
    pub category_index: usize,
    /// Probability of the selected category
    pub confidence: f64,
    /// Set when `confidence` is strictly below the threshold
    pub low_confidence: bool,
}

/// Classification result joined with catalog names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrediction {
    pub category_id: usize,
    pub name: String,
    pub pretty_name: String,
    pub confidence: f64,
    pub low_confidence: bool,
}
