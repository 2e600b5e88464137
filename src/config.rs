//! Configuration types for classification

use crate::error::{ClassifierError, Result};
use crate::utils::NumericValidator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default confidence threshold below which a prediction is flagged
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Default model input resolution (width, height)
pub const DEFAULT_TARGET_SIZE: [u32; 2] = [320, 320];

/// Largest accepted model input edge
pub const MAX_TARGET_DIMENSION: u32 = 4096;

/// ImageNet channel statistics used by torchvision-style models
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Inference backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime backend
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    #[default]
    Tract,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
        }
    }
}

impl FromStr for BackendType {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" | "ort" => Ok(Self::Onnx),
            "tract" => Ok(Self::Tract),
            other => Err(ClassifierError::invalid_config(format!(
                "Unknown backend '{other}' (expected onnx or tract)"
            ))),
        }
    }
}

/// Pixel transform applied after resizing, matching the model family's training-time input
///
/// Pixels enter the transform as `f32` in `0.0..=255.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTransform {
    /// EfficientNetV2: the rescaling layer lives inside the graph, values stay in 0..255
    #[default]
    EfficientNetV2,
    /// `x / 255`
    UnitRange,
    /// `x / 127.5 - 1` (MobileNet, Inception)
    SymmetricUnit,
    /// `(x / 255 - mean) / std` per channel
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl InputTransform {
    /// ImageNet mean/std normalization
    #[must_use]
    pub fn imagenet() -> Self {
        Self::MeanStd {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Map one 0..255 channel value of channel `c` into model space
    #[inline]
    #[must_use]
    pub fn apply(&self, value: f32, c: usize) -> f32 {
        match self {
            Self::EfficientNetV2 => value,
            Self::UnitRange => value / 255.0,
            Self::SymmetricUnit => value / 127.5 - 1.0,
            Self::MeanStd { mean, std } => {
                let m = mean.get(c).copied().unwrap_or(0.0);
                let s = std.get(c).copied().unwrap_or(1.0);
                (value / 255.0 - m) / s
            },
        }
    }
}

impl std::fmt::Display for InputTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EfficientNetV2 => write!(f, "efficientnetv2"),
            Self::UnitRange => write!(f, "unit"),
            Self::SymmetricUnit => write!(f, "symmetric"),
            Self::MeanStd { .. } => write!(f, "mean-std"),
        }
    }
}

impl FromStr for InputTransform {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "efficientnetv2" | "efficientnet_v2" | "passthrough" => Ok(Self::EfficientNetV2),
            "unit" | "unit_range" => Ok(Self::UnitRange),
            "symmetric" | "symmetric_unit" | "tf" => Ok(Self::SymmetricUnit),
            "imagenet" | "mean-std" | "torch" => Ok(Self::imagenet()),
            other => Err(ClassifierError::invalid_config(format!(
                "Unknown input transform '{other}' (expected efficientnetv2, unit, symmetric or imagenet)"
            ))),
        }
    }
}

/// How the raw model output is interpreted before the top-1 decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Detect probabilities vs. logits per output vector
    #[default]
    Auto,
    /// Always apply softmax
    Logits,
    /// Treat the output as probability scores: clamped to `[0, 1]` and
    /// rescaled to sum to 1, never passed through softmax
    Probabilities,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Logits => write!(f, "logits"),
            Self::Probabilities => write!(f, "probabilities"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "logits" => Ok(Self::Logits),
            "probabilities" | "probs" => Ok(Self::Probabilities),
            other => Err(ClassifierError::invalid_config(format!(
                "Unknown output mode '{other}' (expected auto, logits or probabilities)"
            ))),
        }
    }
}

/// Configuration for the classification pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the serialized model
    pub model_path: PathBuf,

    /// Path to the category catalog JSON
    pub catalog_path: PathBuf,

    /// Minimum top-1 probability for a confident prediction
    pub confidence_threshold: f64,

    /// Model input resolution as `[width, height]`
    pub target_size: [u32; 2],

    /// Pixel transform matching the model family
    pub input_transform: InputTransform,

    /// Inference backend
    pub backend: BackendType,

    /// Output interpretation
    pub output_mode: OutputMode,

    /// Number of intra-op threads for the ONNX backend (0 = auto)
    pub intra_threads: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/efficientnetv2b2_320.onnx"),
            catalog_path: PathBuf::from("breed_info.json"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            target_size: DEFAULT_TARGET_SIZE,
            input_transform: InputTransform::default(),
            backend: BackendType::default(),
            output_mode: OutputMode::default(),
            intra_threads: 0,
        }
    }
}

impl ClassifierConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - Threshold outside `[0, 1]`
    /// - Zero or oversized target dimensions
    /// - Excessive thread count
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.confidence_threshold)?;

        for (name, value) in [
            ("target width", self.target_size[0]),
            ("target height", self.target_size[1]),
        ] {
            NumericValidator::validate_positive(value, name)?;
            NumericValidator::validate_range(value, 1, MAX_TARGET_DIMENSION, name)?;
        }

        if let InputTransform::MeanStd { std, .. } = self.input_transform {
            if std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err(ClassifierError::invalid_config(
                    "Normalization std values must be positive and finite",
                ));
            }
        }

        NumericValidator::validate_thread_count(self.intra_threads)?;
        Ok(())
    }

    /// Build a configuration from process environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// - Unparseable values (the error names the variable)
    /// - Validation failures
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Same as [`ClassifierConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CATALOG_PATH") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = raw.trim().parse().map_err(|e| {
                ClassifierError::invalid_config(format!(
                    "CONFIDENCE_THRESHOLD '{raw}' is not a number: {e}"
                ))
            })?;
        }
        if let Some(raw) = lookup("TARGET_SIZE") {
            config.target_size = parse_target_size(&raw)?;
        }
        if let Some(raw) = lookup("INPUT_TRANSFORM") {
            config.input_transform = raw.parse()?;
        }
        if let Some(raw) = lookup("INFERENCE_BACKEND") {
            config.backend = raw.parse()?;
        }
        if let Some(raw) = lookup("OUTPUT_MODE") {
            config.output_mode = raw.parse()?;
        }
        if let Some(raw) = lookup("INTRA_THREADS") {
            config.intra_threads = raw.trim().parse().map_err(|e| {
                ClassifierError::invalid_config(format!(
                    "INTRA_THREADS '{raw}' is not a thread count: {e}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Input tensor shape `(1, height, width, 3)` expected by the model
    #[must_use]
    pub fn input_shape(&self) -> (usize, usize, usize, usize) {
        (
            1,
            self.target_size[1] as usize,
            self.target_size[0] as usize,
            3,
        )
    }
}

/// Check that a confidence threshold lies in `[0, 1]`
///
/// # Errors
/// Returns `InvalidConfig` for non-finite or out-of-range values.
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(ClassifierError::config_value_error(
            "confidence_threshold",
            threshold,
            "0.0-1.0",
            Some(DEFAULT_CONFIDENCE_THRESHOLD),
        ));
    }
    Ok(threshold)
}

/// Parse `"WxH"` or a single edge `"N"` into `[width, height]`
///
/// # Errors
/// Returns `InvalidConfig` when the value is not of either form.
pub fn parse_target_size(raw: &str) -> Result<[u32; 2]> {
    let invalid = |detail: String| {
        ClassifierError::invalid_config(format!("TARGET_SIZE '{raw}' is invalid: {detail}"))
    };

    let trimmed = raw.trim().to_ascii_lowercase();
    match trimmed.split_once('x') {
        Some((w, h)) => {
            let width = w.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            let height = h.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            Ok([width, height])
        },
        None => {
            let edge = trimmed.parse().map_err(|e| invalid(format!("{e}")))?;
            Ok([edge, edge])
        },
    }
}

/// Builder for `ClassifierConfig`
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.model_path = path.into();
        self
    }

    #[must_use]
    pub fn catalog_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.catalog_path = path.into();
        self
    }

    #[must_use]
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    #[must_use]
    pub fn target_size(mut self, width: u32, height: u32) -> Self {
        self.config.target_size = [width, height];
        self
    }

    #[must_use]
    pub fn input_transform(mut self, transform: InputTransform) -> Self {
        self.config.input_transform = transform;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.backend = backend;
        self
    }

    #[must_use]
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `ClassifierError::InvalidConfig` when validation fails.
    pub fn build(self) -> Result<ClassifierConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClassifierConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
