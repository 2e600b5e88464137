//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::ModelArgs;
use crate::config::{ClassifierConfig, ClassifierConfigBuilder};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `ClassifierConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Apply every flag (or its environment fallback) over the defaults
    pub(crate) fn from_args(args: &ModelArgs) -> Result<ClassifierConfig> {
        let mut builder = ClassifierConfigBuilder::new();

        if let Some(path) = &args.model_path {
            builder = builder.model_path(path);
        }
        if let Some(path) = &args.catalog_path {
            builder = builder.catalog_path(path);
        }
        if let Some(threshold) = args.confidence_threshold {
            builder = builder.confidence_threshold(threshold);
        }
        if let Some([width, height]) = args.target_size {
            builder = builder.target_size(width, height);
        }
        if let Some(transform) = args.input_transform {
            builder = builder.input_transform(transform);
        }
        if let Some(backend) = args.backend {
            builder = builder.backend(backend);
        }
        if let Some(mode) = args.output_mode {
            builder = builder.output_mode(mode);
        }
        if let Some(threads) = args.threads {
            builder = builder.intra_threads(threads);
        }

        builder.build().context("Invalid configuration")
    }
}
