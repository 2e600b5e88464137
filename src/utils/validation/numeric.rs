//! Numeric validation utilities
//!
//! Range checks for configuration scalars and finiteness checks for model
//! output vectors.

use crate::error::{ClassifierError, Result};

/// Validator for numeric parameters and model outputs
pub struct NumericValidator;

impl NumericValidator {
    /// Validate thread count
    pub fn validate_thread_count(value: usize) -> Result<usize> {
        const MAX_THREADS: usize = 256; // Reasonable upper limit

        if value > MAX_THREADS {
            return Err(ClassifierError::invalid_config(format!(
                "Thread count {} exceeds maximum allowed ({})",
                value, MAX_THREADS
            )));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ClassifierError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is positive
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(ClassifierError::invalid_config(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate that every element of a model output is finite
    ///
    /// Non-finite values are a numeric failure of the forward pass, so this
    /// reports an inference error rather than a configuration error.
    pub fn validate_finite_output(values: &[f32]) -> Result<()> {
        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ClassifierError::inference(format!(
                "Model output contains non-finite value {} at index {}",
                value, index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert!(NumericValidator::validate_range(50, 0, 100, "test").is_ok());
        assert!(NumericValidator::validate_range(0, 0, 100, "test").is_ok());
        assert!(NumericValidator::validate_range(100, 0, 100, "test").is_ok());

        assert!(NumericValidator::validate_range(-1, 0, 100, "test").is_err());
        assert!(NumericValidator::validate_range(101, 0, 100, "test").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(NumericValidator::validate_positive(1, "test").is_ok());
        assert!(NumericValidator::validate_positive(100, "test").is_ok());

        assert!(NumericValidator::validate_positive(0, "test").is_err());
        assert!(NumericValidator::validate_positive(-1, "test").is_err());
    }

    #[test]
    fn test_validate_thread_count() {
        assert!(NumericValidator::validate_thread_count(0).is_ok());
        assert!(NumericValidator::validate_thread_count(256).is_ok());
        assert!(NumericValidator::validate_thread_count(257).is_err());
    }

    #[test]
    fn test_validate_finite_output() {
        assert!(NumericValidator::validate_finite_output(&[0.0, -3.5, 12.0]).is_ok());
        assert!(NumericValidator::validate_finite_output(&[]).is_ok());

        let err = NumericValidator::validate_finite_output(&[1.0, f32::NAN]).unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
        assert!(err.to_string().contains("index 1"));

        assert!(NumericValidator::validate_finite_output(&[f32::NEG_INFINITY]).is_err());
    }
}
