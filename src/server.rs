//! HTTP endpoint over the classification service
//!
//! - `GET /health` reports liveness and whether a model is loaded
//! - `GET /breeds` lists the category catalog
//! - `POST /predict` classifies the multipart field `file`, with an optional
//!   `?threshold=` override
//!
//! Failures are answered as `{"detail": "..."}` with a status derived from the
//! error's [`FailureKind`](crate::error::FailureKind). Classification runs on
//! the blocking pool and is bounded by the configured request timeout.

use crate::{
    catalog::Category,
    error::{ClassifierError, Result},
    service::ClassificationService,
    types::LabeledPrediction,
};
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Default request body limit (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
struct AppState {
    service: Arc<ClassificationService>,
    request_timeout: Duration,
}

/// Error response body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, detail: S) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(error: ClassifierError) -> Self {
        let status = StatusCode::from_u16(error.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

#[derive(Debug, Serialize)]
struct BreedsResponse {
    breeds: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct PredictParams {
    threshold: Option<f64>,
}

/// `/predict` success body
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub low_confidence: bool,
    pub prediction: String,
    pub prediction_id: usize,
    pub confidence: f64,
}

impl From<LabeledPrediction> for PredictResponse {
    fn from(prediction: LabeledPrediction) -> Self {
        Self {
            low_confidence: prediction.low_confidence,
            prediction: prediction.pretty_name,
            prediction_id: prediction.category_id,
            confidence: round_confidence(prediction.confidence),
        }
    }
}

/// Round to four decimal places for display
fn round_confidence(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 10_000.0
}

/// Build the application router
pub fn router(service: Arc<ClassificationService>, config: &ServerConfig) -> Router {
    let state = AppState {
        service,
        request_timeout: config.request_timeout,
    };

    Router::new()
        .route("/health", get(health))
        .route("/breeds", get(breeds))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
///
/// # Errors
/// - `Io` when the address cannot be bound or the server fails
pub async fn serve(service: Arc<ClassificationService>, config: ServerConfig) -> Result<()> {
    let app = router(service, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.service.is_model_loaded(),
    })
}

async fn breeds(State(state): State<AppState>) -> Json<BreedsResponse> {
    Json(BreedsResponse {
        breeds: state.service.catalog().iter().cloned().collect(),
    })
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn predict(
    State(state): State<AppState>,
    params: std::result::Result<Query<PredictParams>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;
    let mut multipart =
        multipart.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;

    let image_bytes = read_file_field(&mut multipart).await?;

    let classification = Arc::clone(&state.service).classify_offloaded(image_bytes, params.threshold);
    let prediction = tokio::time::timeout(state.request_timeout, classification)
        .await
        .map_err(|_| {
            warn!(timeout_ms = state.request_timeout.as_millis(), "classification timed out");
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "classification timed out")
        })?
        .map_err(|e| {
            warn!(error = %e, "classification failed");
            ApiError::from(e)
        })?;

    info!(
        prediction = %prediction.pretty_name,
        confidence = prediction.confidence,
        low_confidence = prediction.low_confidence,
        "prediction served"
    );
    Ok(Json(PredictResponse::from(prediction)))
}

async fn read_file_field(multipart: &mut Multipart) -> std::result::Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        format!("missing multipart field '{FILE_FIELD}'"),
    ))
}
