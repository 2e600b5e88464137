//! Tensor validation utilities
//!
//! Shape checks for model inputs and bounds checks for decoded images.

use crate::error::{ClassifierError, Result};
use ndarray::Array4;

/// Validator for tensor operations and shape validation
pub struct TensorValidator;

impl TensorValidator {
    /// Validate an NHWC tensor against the expected `(batch, height, width, channels)`
    ///
    /// A mismatch here means the preprocessor and the model disagree, which is
    /// reported as an inference failure.
    pub fn validate_tensor_shape(
        tensor: &Array4<f32>,
        expected_shape: (usize, usize, usize, usize),
    ) -> Result<()> {
        let actual = tensor.dim();
        if actual != expected_shape {
            let (batch, height, width, channels) = expected_shape;
            return Err(ClassifierError::inference(format!(
                "Input shape mismatch. Expected [{}, {}, {}, {}], got [{}, {}, {}, {}]",
                batch, height, width, channels, actual.0, actual.1, actual.2, actual.3
            )));
        }

        Ok(())
    }

    /// Validate decoded image dimensions are within reasonable bounds
    pub fn validate_image_dimensions(width: u32, height: u32) -> Result<()> {
        const MAX_DIMENSION: u32 = 16384; // 16K pixels
        const MIN_DIMENSION: u32 = 1;

        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(ClassifierError::invalid_image(format!(
                "Image dimensions too small: {}x{}. Minimum: {}x{}",
                width, height, MIN_DIMENSION, MIN_DIMENSION
            )));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ClassifierError::invalid_image(format!(
                "Image dimensions too large: {}x{}. Maximum: {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(())
    }
}
