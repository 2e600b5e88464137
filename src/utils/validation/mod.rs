//! Validation helpers shared across the pipeline

mod numeric;
mod tensor;

pub use numeric::NumericValidator;
pub use tensor::TensorValidator;
