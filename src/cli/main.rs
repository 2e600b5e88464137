//! Breed classifier CLI
//!
//! Classifies image files, prints the category catalog, or runs the HTTP endpoint.

use super::config::CliConfigBuilder;
use crate::{
    catalog::CategoryCatalog,
    config::{parse_target_size, BackendType, InputTransform, OutputMode},
    service::ClassificationService,
    tracing_config::{TracingConfig, TracingFormat},
    types::LabeledPrediction,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Image breed classification CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "breed-classifier")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (console, compact)
    #[arg(long, global = true, default_value = "console")]
    pub log_format: TracingFormat,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Model and pipeline settings shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the model file
    #[arg(long = "model", env = "MODEL_PATH", global = true, value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Path to the category catalog JSON
    #[arg(long = "catalog", env = "CATALOG_PATH", global = true, value_name = "PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Default confidence threshold in [0, 1]
    #[arg(long, env = "CONFIDENCE_THRESHOLD", global = true)]
    pub confidence_threshold: Option<f64>,

    /// Model input size as WIDTHxHEIGHT or a single edge length
    #[arg(long, env = "TARGET_SIZE", global = true, value_parser = target_size_arg)]
    pub target_size: Option<[u32; 2]>,

    /// Pixel transform (efficientnetv2, unit, symmetric, imagenet)
    #[arg(long, env = "INPUT_TRANSFORM", global = true)]
    pub input_transform: Option<InputTransform>,

    /// Inference backend (tract, onnx)
    #[arg(long, env = "INFERENCE_BACKEND", global = true)]
    pub backend: Option<BackendType>,

    /// Output interpretation (auto, logits, probabilities)
    #[arg(long, env = "OUTPUT_MODE", global = true)]
    pub output_mode: Option<OutputMode>,

    /// Number of intra-op threads (0 = all cores)
    #[arg(short, long, env = "INTRA_THREADS", global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify image files ("-" reads stdin) and print one JSON line per input
    Classify {
        #[arg(value_name = "IMAGE", required = true)]
        inputs: Vec<String>,

        /// Threshold for this run, overriding the configured default
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Print the category catalog as JSON
    Breeds,

    /// Serve the HTTP endpoint
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[cfg(feature = "server")]
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = crate::server::DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Per-request classification timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

fn target_size_arg(raw: &str) -> std::result::Result<[u32; 2], String> {
    parse_target_size(raw).map_err(|e| e.to_string())
}

/// One line of `classify` output
#[derive(Debug, Serialize)]
struct ClassifyLine<'a> {
    input: &'a str,
    #[serde(flatten)]
    prediction: Option<LabeledPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_env_override()
        .init()
        .context("Failed to initialize tracing subscriber")?;

    let config = CliConfigBuilder::from_args(&cli.model)?;
    debug!(?config, "resolved configuration");

    match cli.command {
        Command::Classify { inputs, threshold } => {
            let service = Arc::new(
                ClassificationService::from_config(&config)
                    .context("Failed to start classification service")?,
            );
            if !service.is_model_loaded() {
                bail!("Model unavailable: {:?}", service.engine_status());
            }
            let failures = classify_inputs(&service, &inputs, threshold).await?;
            if failures > 0 {
                bail!("{failures} of {} input(s) failed", inputs.len());
            }
            Ok(())
        },
        Command::Breeds => print_breeds(&CategoryCatalog::load(&config.catalog_path)?),
        #[cfg(feature = "server")]
        Command::Serve(args) => serve(&config, &args).await,
    }
}

async fn classify_inputs(
    service: &Arc<ClassificationService>,
    inputs: &[String],
    threshold: Option<f64>,
) -> Result<usize> {
    let mut failures = 0;

    for input in inputs {
        let result = if input == "-" {
            let bytes = read_stdin().await?;
            Arc::clone(service).classify_offloaded(bytes, threshold).await
        } else {
            crate::classify_file(Arc::clone(service), input, threshold).await
        };

        let line = match result {
            Ok(prediction) => {
                info!(
                    input = %input,
                    breed = %prediction.pretty_name,
                    confidence = prediction.confidence,
                    "classified"
                );
                ClassifyLine {
                    input,
                    prediction: Some(prediction),
                    error: None,
                }
            },
            Err(e) => {
                warn!(input = %input, error = %e, "classification failed");
                failures += 1;
                ClassifyLine {
                    input,
                    prediction: None,
                    error: Some(e.to_string()),
                }
            },
        };

        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer(&mut stdout, &line)?;
        writeln!(stdout)?;
    }

    Ok(failures)
}

async fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut buffer)
        .await
        .context("Failed to read image from stdin")?;
    Ok(buffer)
}

fn print_breeds(catalog: &CategoryCatalog) -> Result<()> {
    #[derive(Serialize)]
    struct Breeds<'a> {
        breeds: Vec<&'a crate::catalog::Category>,
    }

    let body = Breeds {
        breeds: catalog.iter().collect(),
    };
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &body)?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(feature = "server")]
async fn serve(config: &crate::config::ClassifierConfig, args: &ServeArgs) -> Result<()> {
    use crate::server::{self, ServerConfig};
    use std::net::SocketAddr;
    use std::time::Duration;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    let service = Arc::new(
        ClassificationService::from_config(config)
            .context("Failed to start classification service")?,
    );
    if !service.is_model_loaded() {
        warn!("serving without a model; /predict will answer 503");
    }

    let server_config = ServerConfig {
        addr,
        max_body_bytes: args.max_body_bytes,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };
    server::serve(service, server_config)
        .await
        .context("HTTP server failed")
}
