//! Classification service
//!
//! Ties the pipeline together for one request: availability check, decode and
//! preprocess, forward pass, normalization, decision and catalog lookup. The
//! service is immutable after construction and shared behind an `Arc`, so the
//! CLI and the HTTP server run exactly the same code path.

use crate::{
    catalog::{CategoryCatalog, UNKNOWN_CATEGORY},
    config::{validate_threshold, ClassifierConfig},
    decision::decide,
    error::{ClassifierError, Result},
    inference::{BackendFactory, EngineStatus, InferenceEngine},
    normalizer::OutputNormalizer,
    types::{ClassificationResult, LabeledPrediction},
    utils::ImagePreprocessor,
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, instrument, span, warn, Level};

/// Single-image breed classification over a process-wide engine and catalog
///
/// The engine and catalog are shared handles, so several services (for
/// example with different thresholds) can run over one loaded model.
#[derive(Debug)]
pub struct ClassificationService {
    engine: Arc<InferenceEngine>,
    catalog: Arc<CategoryCatalog>,
    preprocessor: ImagePreprocessor,
    normalizer: OutputNormalizer,
    threshold: f64,
}

impl ClassificationService {
    /// Assemble a service from already-built parts
    ///
    /// # Errors
    /// - `InvalidConfig` when `threshold` is outside `[0, 1]`
    pub fn new(
        engine: Arc<InferenceEngine>,
        catalog: Arc<CategoryCatalog>,
        preprocessor: ImagePreprocessor,
        normalizer: OutputNormalizer,
        threshold: f64,
    ) -> Result<Self> {
        let threshold = validate_threshold(threshold)?;

        let expected = (
            1,
            preprocessor.target_size()[1] as usize,
            preprocessor.target_size()[0] as usize,
            3,
        );
        if engine.input_shape() != expected {
            return Err(ClassifierError::invalid_config(format!(
                "engine expects input {:?} but preprocessor produces {expected:?}",
                engine.input_shape()
            )));
        }

        Ok(Self {
            engine,
            catalog,
            preprocessor,
            normalizer,
            threshold,
        })
    }

    /// Build the service from configuration with the default backends
    ///
    /// The catalog must load; the model may fail, leaving the service up in a
    /// degraded state where every prediction reports `ModelUnavailable`.
    ///
    /// # Errors
    /// - `InvalidConfig` for invalid configuration
    /// - `Catalog` when the catalog cannot be loaded
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::from_config_with_factory(config, &crate::backends::DefaultBackendFactory)
    }

    /// [`ClassificationService::from_config`] with an explicit backend factory
    ///
    /// # Errors
    /// Same as [`ClassificationService::from_config`].
    pub fn from_config_with_factory(
        config: &ClassifierConfig,
        factory: &dyn BackendFactory,
    ) -> Result<Self> {
        config.validate()?;
        let catalog = CategoryCatalog::load(&config.catalog_path)?;
        let engine = InferenceEngine::load_or_degraded_with_factory(config, factory);

        info!(
            categories = catalog.len(),
            model_loaded = engine.is_loaded(),
            threshold = config.confidence_threshold,
            transform = %config.input_transform,
            output_mode = %config.output_mode,
            "classification service ready"
        );

        Self::new(
            Arc::new(engine),
            Arc::new(catalog),
            ImagePreprocessor::from_config(config),
            OutputNormalizer::new(config.output_mode),
            config.confidence_threshold,
        )
    }

    /// Classify one encoded image with the configured threshold
    ///
    /// # Errors
    /// - `ModelUnavailable` when no model is loaded
    /// - `InvalidImage` for undecodable input
    /// - `Inference` when the forward pass or normalization fails
    pub fn classify(&self, image_bytes: &[u8]) -> Result<LabeledPrediction> {
        self.classify_with_threshold(image_bytes, self.threshold)
    }

    /// Classify one encoded image with a per-request threshold
    ///
    /// # Errors
    /// - `InvalidConfig` when `threshold` is outside `[0, 1]`
    /// - Everything [`ClassificationService::classify`] returns
    #[instrument(skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    pub fn classify_with_threshold(
        &self,
        image_bytes: &[u8],
        threshold: f64,
    ) -> Result<LabeledPrediction> {
        let threshold = validate_threshold(threshold)?;
        self.engine.ensure_loaded()?;
        let total_start = Instant::now();

        let tensor = {
            let _span = span!(Level::DEBUG, "preprocessing").entered();
            self.preprocessor.preprocess(image_bytes)?
        };

        let raw = {
            let _span = span!(Level::DEBUG, "inference").entered();
            self.engine.predict(&tensor)?
        };

        let probabilities = {
            let _span = span!(Level::DEBUG, "normalization", outputs = raw.len()).entered();
            self.normalizer.normalize(&raw)?
        };

        if probabilities.len() != self.catalog.len() {
            warn!(
                outputs = probabilities.len(),
                categories = self.catalog.len(),
                "model output length does not match catalog size"
            );
        }

        let result = decide(&probabilities, threshold);
        let prediction = self.label(&result);

        debug!(
            category = prediction.category_id,
            confidence = prediction.confidence,
            low_confidence = prediction.low_confidence,
            elapsed_ms = total_start.elapsed().as_millis(),
            "classified image"
        );
        Ok(prediction)
    }

    /// Run [`ClassificationService::classify_with_threshold`] on the blocking pool
    ///
    /// `threshold` falls back to the configured value when `None`.
    ///
    /// # Errors
    /// - Everything the synchronous call returns
    /// - `Internal` when the blocking task panics or is cancelled
    pub async fn classify_offloaded(
        self: Arc<Self>,
        image_bytes: Vec<u8>,
        threshold: Option<f64>,
    ) -> Result<LabeledPrediction> {
        let threshold = threshold.unwrap_or(self.threshold);
        tokio::task::spawn_blocking(move || self.classify_with_threshold(&image_bytes, threshold))
            .await
            .map_err(|e| ClassifierError::internal(format!("classification task failed: {e}")))?
    }

    /// Attach catalog names to a decision
    ///
    /// Indices outside the catalog are labeled [`UNKNOWN_CATEGORY`].
    #[must_use]
    pub fn label(&self, result: &ClassificationResult) -> LabeledPrediction {
        let (name, pretty_name) = match self.catalog.get(result.category_index) {
            Some(category) => (category.name.clone(), category.pretty_name.clone()),
            None => {
                warn!(
                    index = result.category_index,
                    categories = self.catalog.len(),
                    "predicted index has no catalog entry"
                );
                (UNKNOWN_CATEGORY.to_string(), UNKNOWN_CATEGORY.to_string())
            },
        };

        LabeledPrediction {
            category_id: result.category_index,
            name,
            pretty_name,
            confidence: result.confidence,
            low_confidence: result.low_confidence,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Shared handle to the catalog
    #[must_use]
    pub fn catalog_handle(&self) -> Arc<CategoryCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Shared handle to the inference engine
    #[must_use]
    pub fn engine_handle(&self) -> Arc<InferenceEngine> {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub fn engine_status(&self) -> EngineStatus {
        self.engine.status()
    }

    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
