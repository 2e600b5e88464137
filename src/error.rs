//! Error types for classification operations

use thiserror::Error;

/// Result type alias for classification operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Error types for the inference pipeline
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Input bytes could not be decoded as an image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The engine has no loaded model; predictions cannot be served
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model artifact is missing or could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// The forward pass or its numeric post-processing failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// The category catalog is missing or malformed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Invalid configuration or request parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected conditions (worker panics, broken invariants)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing discriminant of a failed classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Undecodable upload
    InvalidImage,
    /// Bad request parameters (e.g. threshold outside [0, 1])
    InvalidRequest,
    /// Engine never loaded or failed to load
    ModelUnavailable,
    /// Forward pass failed
    Inference,
    /// Anything else
    Internal,
}

impl FailureKind {
    /// HTTP status code the request boundary should answer with
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidImage | Self::InvalidRequest => 400,
            Self::ModelUnavailable => 503,
            Self::Inference | Self::Internal => 500,
        }
    }
}

impl ClassifierError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new model unavailable error
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new model load error
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new catalog error
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create model load error with troubleshooting context
    pub fn model_load_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
        suggestions: &[&str],
    ) -> Self {
        let path_display = model_path.as_ref().display();
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::ModelLoad(format!(
            "Failed to {} model '{}': {}.{}",
            operation, path_display, error, suggestion_text
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Classify this error for the request boundary
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidImage(_) => FailureKind::InvalidImage,
            Self::InvalidConfig(_) => FailureKind::InvalidRequest,
            Self::ModelUnavailable(_) | Self::ModelLoad(_) => FailureKind::ModelUnavailable,
            Self::Inference(_) => FailureKind::Inference,
            Self::Catalog(_) | Self::Io(_) | Self::Internal(_) => FailureKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = ClassifierError::invalid_image("truncated PNG");
        assert!(matches!(err, ClassifierError::InvalidImage(_)));

        let err = ClassifierError::model_unavailable("not loaded");
        assert!(matches!(err, ClassifierError::ModelUnavailable(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ClassifierError::invalid_config("threshold out of range");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: threshold out of range"
        );
    }

    #[test]
    fn test_failure_kind_status_codes() {
        assert_eq!(
            ClassifierError::invalid_image("x").kind().status_code(),
            400
        );
        assert_eq!(
            ClassifierError::invalid_config("x").kind().status_code(),
            400
        );
        assert_eq!(
            ClassifierError::model_unavailable("x").kind().status_code(),
            503
        );
        assert_eq!(ClassifierError::model_load("x").kind().status_code(), 503);
        assert_eq!(ClassifierError::inference("x").kind().status_code(), 500);
        assert_eq!(ClassifierError::internal("x").kind().status_code(), 500);
    }

    #[test]
    fn test_enhanced_error_context() {
        let err = ClassifierError::model_load_error_with_context(
            "load",
            Path::new("/models/missing.onnx"),
            "file not found",
            &["check MODEL_PATH", "verify permissions"],
        );
        let error_string = err.to_string();
        assert!(error_string.contains("load"));
        assert!(error_string.contains("/models/missing.onnx"));
        assert!(error_string.contains("Suggestions"));

        let err = ClassifierError::config_value_error("confidence_threshold", 1.5, "0.0-1.0", Some(0.4));
        let error_string = err.to_string();
        assert!(error_string.contains("confidence_threshold"));
        assert!(error_string.contains("1.5"));
        assert!(error_string.contains("Recommended: 0.4"));
    }
}
