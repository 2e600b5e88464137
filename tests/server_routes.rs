//! Router tests against a service started without a model file

#![cfg(feature = "server")]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use breed_classifier::server::{router, ServerConfig};
use breed_classifier::{ClassificationService, ClassifierConfig};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn degraded_app(dir: &TempDir) -> axum::Router {
    let catalog = dir.path().join("breed_info.json");
    std::fs::write(
        &catalog,
        r#"{"breeds": [{"id": 0, "name": "chow_chow"}, {"id": 1, "name": "whippet"}]}"#,
    )
    .unwrap();

    let config = ClassifierConfig::builder()
        .model_path(dir.path().join("missing.onnx"))
        .catalog_path(catalog)
        .build()
        .unwrap();
    let service = ClassificationService::from_config(&config).unwrap();
    router(Arc::new(service), &ServerConfig::default())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_degraded_service_keeps_serving_metadata() {
    let dir = TempDir::new().unwrap();
    let app = degraded_app(&dir);

    let health = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let json = body_json(health).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);

    let breeds = app
        .oneshot(Request::get("/breeds").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(breeds).await;
    assert_eq!(json["breeds"].as_array().unwrap().len(), 2);
    assert_eq!(json["breeds"][0]["pretty_name"], "Chow Chow");
}

#[tokio::test]
async fn test_predict_without_model_answers_503_every_time() {
    let dir = TempDir::new().unwrap();
    let app = degraded_app(&dir);

    for _ in 0..3 {
        let body = "--b\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.png\"\r\n\r\nxyz\r\n--b--\r\n";
        let request = Request::post("/predict")
            .header("content-type", "multipart/form-data; boundary=b")
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("Model unavailable"));
    }
}

#[tokio::test]
async fn test_predict_requires_multipart() {
    let dir = TempDir::new().unwrap();
    let response = degraded_app(&dir)
        .oneshot(
            Request::post("/predict")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await.get("detail").is_some());
}
