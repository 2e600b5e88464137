#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Breed Classifier
//!
//! Single-image classification inference with ONNX Runtime and Tract backends.
//!
//! An uploaded image is decoded, forced to three channels, resized to the model
//! resolution and transformed into an NHWC tensor. The forward pass output is
//! normalized into a probability distribution (softmax when the model emits
//! logits), the top-1 category is selected and flagged when its probability is
//! below the confidence threshold, and the index is labeled from a category
//! catalog loaded at startup.
//!
//! ## Features
//!
//! - **Two Backends**: Tract (pure Rust, default) and ONNX Runtime
//! - **Format Support**: JPEG, PNG, WebP, BMP, TIFF
//! - **Degraded Availability**: a missing or broken model keeps the process up;
//!   predictions report `ModelUnavailable` until restart
//! - **CLI Integration**: `classify`, `breeds` and `serve` subcommands (`cli` feature)
//! - **HTTP Endpoint**: `/health`, `/breeds` and `/predict` (`server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use breed_classifier::{ClassificationService, ClassifierConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ClassifierConfig::builder()
//!     .model_path("model/efficientnetv2b2_320.onnx")
//!     .catalog_path("breed_info.json")
//!     .confidence_threshold(0.4)
//!     .build()?;
//! let service = ClassificationService::from_config(&config)?;
//!
//! let bytes = std::fs::read("dog.jpg")?;
//! let prediction = service.classify(&bytes)?;
//! println!("{} ({:.2})", prediction.pretty_name, prediction.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend
//! - `tract` (default): Pure Rust backend
//! - `cli` (default): Command-line interface and tracing setup
//! - `server` (default): HTTP endpoint built on axum
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON log output

pub mod backends;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod inference;
pub mod normalizer;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

// Public API exports
pub use backends::DefaultBackendFactory;
pub use catalog::{prettify, Category, CategoryCatalog, UNKNOWN_CATEGORY};
pub use config::{
    BackendType, ClassifierConfig, ClassifierConfigBuilder, InputTransform, OutputMode,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_SIZE,
};
pub use decision::{decide, decide_scores};
pub use error::{ClassifierError, FailureKind, Result};
pub use inference::{BackendFactory, EngineStatus, InferenceBackend, InferenceEngine};
pub use normalizer::{detect_output_kind, softmax, OutputKind, OutputNormalizer};
pub use service::ClassificationService;
pub use types::{
    ClassificationResult, ImageTensor, LabeledPrediction, ProbabilityVector, RawOutputVector,
};
pub use utils::{ImagePreprocessor, NumericValidator, TensorValidator};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Read an image file and classify it on the blocking pool
///
/// # Errors
/// - `Io` when the file cannot be read
/// - Everything [`ClassificationService::classify_offloaded`] returns
pub async fn classify_file<P: AsRef<Path>>(
    service: Arc<ClassificationService>,
    path: P,
    threshold: Option<f64>,
) -> Result<LabeledPrediction> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    service.classify_offloaded(bytes, threshold).await
}
