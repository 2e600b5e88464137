//! Shared utilities: image preprocessing and validation

pub mod preprocessing;
pub mod validation;

pub use preprocessing::ImagePreprocessor;
pub use validation::{NumericValidator, TensorValidator};
