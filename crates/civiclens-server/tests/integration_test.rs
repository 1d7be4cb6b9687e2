//! Integration tests for the CivicLens HTTP surface

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use civiclens_classifiers::testing::{MockLoader, MockPredictor};
use civiclens_classifiers::{ClassifierConfig, ClassifierRegistry, SlotId};
use civiclens_server::{create_router, AppState, ClassificationService, ServiceConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(loader: Arc<MockLoader>, config: ServiceConfig) -> Router {
    let registry = ClassifierRegistry::with_loader(ClassifierConfig::default(), loader);
    let service = ClassificationService::new(Arc::new(registry), &config);

    create_router(AppState {
        config: Arc::new(config),
        service: Arc::new(service),
        metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
    })
}

fn seeded() -> ServiceConfig {
    ServiceConfig {
        fallback_seed: Some(21),
        ..ServiceConfig::default()
    }
}

fn png() -> Vec<u8> {
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([90, 90, 90])))
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();
    encoded
}

fn multipart(field: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "civiclens-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post_raw(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_classify_multipart_streetlight() {
    let loader = MockLoader::new()
        .with(SlotId::General, MockPredictor::new("Streetlights", 0.85))
        .with(SlotId::Common, MockPredictor::new("potholes", 0.2));
    let app = app_with(Arc::new(loader), seeded());

    let (content_type, body) = multipart("file", &png());
    let request = Request::post("/classify")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["issueType"], "streetlight");
    assert!((json["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
}

#[tokio::test]
async fn test_classify_raw_body_garbage_override() {
    let loader = MockLoader::new()
        .with(SlotId::General, MockPredictor::new("streetlight", 0.95))
        .with(SlotId::Garbage, MockPredictor::new("Garbage", 0.6));
    let app = app_with(Arc::new(loader), seeded());

    let (status, json) = send(app, post_raw("/classify", png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["issueType"], "garbage");
}

#[tokio::test]
async fn test_classify_survives_failing_predictors() {
    let loader = MockLoader::new()
        .with(SlotId::General, MockPredictor::panicking())
        .with(SlotId::Common, MockPredictor::failing("bad tensor"))
        .with_broken(SlotId::Garbage);
    let app = app_with(Arc::new(loader), seeded());

    let (status, json) = send(app, post_raw("/classify", png())).await;
    assert_eq!(status, StatusCode::OK);
    let issue = json["issueType"].as_str().unwrap();
    assert!(["pothole", "garbage", "streetlight", "water_leak", "other"].contains(&issue));
    let confidence = json["confidence"].as_f64().unwrap();
    assert!((0.0..1.0).contains(&confidence));
}

#[tokio::test]
async fn test_undecodable_image_masked_by_default() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());

    let (status, json) = send(app, post_raw("/classify", b"<html>".to_vec())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["issueType"].is_string());
}

#[tokio::test]
async fn test_undecodable_image_rejected_when_strict() {
    let config = ServiceConfig {
        reject_undecodable_images: true,
        ..seeded()
    };
    let app = app_with(Arc::new(MockLoader::new()), config);

    let (status, json) = send(app, post_raw("/severity", b"<html>".to_vec())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_multipart_without_file_field() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());

    let (content_type, body) = multipart("image", &png());
    let request = Request::post("/classify")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_severity_uses_general_confidence() {
    let loader = MockLoader::new()
        .with(SlotId::General, MockPredictor::new("pothole", 0.82))
        .with(SlotId::Common, MockPredictor::new("pothole", 0.3));
    let app = app_with(Arc::new(loader), seeded());

    let (status, json) = send(app, post_raw("/severity", png())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["severity"], "high");
}

#[tokio::test]
async fn test_severity_falls_through_to_next_slot() {
    let loader = MockLoader::new()
        .with(SlotId::General, MockPredictor::failing("oom"))
        .with(SlotId::Common, MockPredictor::new("garbage", 0.65));
    let app = app_with(Arc::new(loader), seeded());

    let (_, json) = send(app, post_raw("/severity", png())).await;
    assert_eq!(json["severity"], "medium");
}

#[tokio::test]
async fn test_area_type_is_deterministic() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());
    let uri = "/area-type?latitude=40.7128&longitude=-74.0060";

    let (status, first) = send(app.clone(), Request::post(uri).body(Body::empty()).unwrap()).await;
    let (_, second) = send(app, Request::post(uri).body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["areaType"], "urban");
    assert_eq!(first["areaType"], second["areaType"]);
}

#[tokio::test]
async fn test_area_type_rejects_bad_coordinates() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());

    let (status, _) = send(
        app.clone(),
        Request::post("/area-type?latitude=95&longitude=0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app,
        Request::post("/area-type?latitude=north").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_models_info() {
    let loader = MockLoader::new().with(SlotId::Garbage, MockPredictor::new("garbage", 0.9));
    let app = app_with(Arc::new(loader), seeded());

    let (status, json) = send(app, Request::get("/models/info").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["models"]["garbage_detector"]["available"], true);
    assert_eq!(json["models"]["resnet50"]["available"], false);
    assert_eq!(json["models"]["simple_cnn"]["slot"], "common");
    assert_eq!(json["severity_model"]["classes"][2], "high");
    assert_eq!(json["area_type_model"]["classes"][0], "urban");
}

#[tokio::test]
async fn test_reload_single_slot() {
    let loader = Arc::new(MockLoader::new());
    let app = app_with(loader.clone(), seeded());

    loader.set(SlotId::Common, Arc::new(MockPredictor::new("pothole", 0.9)));
    let (status, json) = send(
        app.clone(),
        Request::post("/models/reload?slot=common").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["models"]["common"], true);
    assert_eq!(loader.load_count(SlotId::General), 1);

    let (_, info) = send(app, Request::get("/models/info").body(Body::empty()).unwrap()).await;
    assert_eq!(info["models"]["simple_cnn"]["available"], true);
}

#[tokio::test]
async fn test_reload_without_artifact_keeps_model() {
    let loader = Arc::new(MockLoader::new().with(SlotId::General, MockPredictor::new("streetlight", 0.9)));
    let app = app_with(loader.clone(), seeded());

    loader.remove(SlotId::General);
    let (status, json) = send(
        app.clone(),
        Request::post("/models/reload?slot=general").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("keeping current model"));

    let (_, json) = send(app, post_raw("/classify", png())).await;
    assert_eq!(json["issueType"], "streetlight");
}

#[tokio::test]
async fn test_reload_all_and_unknown_slot() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());

    let (status, json) = send(
        app.clone(),
        Request::post("/models/reload").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Reloaded 0/3 models");

    let (status, _) = send(
        app,
        Request::post("/models/reload?slot=resnet").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = app_with(Arc::new(MockLoader::new()), seeded());
    let (status, _) = send(app, Request::get("/v1/predict").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
