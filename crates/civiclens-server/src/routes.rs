//! HTTP routes and handlers

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        rejection::QueryRejection, DefaultBodyLimit, FromRequest, Multipart, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use civiclens_classifiers::SlotId;
use civiclens_core::{AreaDecision, FusionDecision, SeverityDecision};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::config::ServiceConfig;
use crate::service::{ClassificationService, ModelsInfo, ReloadReport};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServiceConfig>,

    /// Registry, fusion policy, and fallback source
    pub service: Arc<ClassificationService>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/classify", post(classify))
        .route("/severity", post(severity))
        .route("/area-type", post(area_type))
        .route("/models/info", get(models_info))
        .route("/models/reload", post(reload_models))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "CivicLens classification service" }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn classify(
    State(state): State<AppState>,
    ImageUpload(image): ImageUpload,
) -> Result<Json<FusionDecision>, AppError> {
    metrics::counter!("civiclens_requests_total", "endpoint" => "classify").increment(1);

    let outcome = state.service.classify(image).await?;
    Ok(Json(outcome.decision))
}

async fn severity(
    State(state): State<AppState>,
    ImageUpload(image): ImageUpload,
) -> Result<Json<SeverityDecision>, AppError> {
    metrics::counter!("civiclens_requests_total", "endpoint" => "severity").increment(1);

    let decision = state.service.severity(image).await?;
    Ok(Json(decision))
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

async fn area_type(
    State(state): State<AppState>,
    query: Result<Query<Coordinates>, QueryRejection>,
) -> Result<Json<AreaDecision>, AppError> {
    metrics::counter!("civiclens_requests_total", "endpoint" => "area_type").increment(1);

    let Query(coordinates) = query.map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
    let decision = state
        .service
        .area_type(coordinates.latitude, coordinates.longitude)?;
    Ok(Json(decision))
}

async fn models_info(State(state): State<AppState>) -> Json<ModelsInfo> {
    metrics::counter!("civiclens_requests_total", "endpoint" => "models_info").increment(1);
    Json(state.service.models_info())
}

#[derive(Debug, Default, Deserialize)]
struct ReloadParams {
    slot: Option<String>,
}

async fn reload_models(
    State(state): State<AppState>,
    query: Result<Query<ReloadParams>, QueryRejection>,
) -> Result<Json<ReloadReport>, AppError> {
    metrics::counter!("civiclens_requests_total", "endpoint" => "models_reload").increment(1);

    let Query(params) = query.map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
    let slot = params
        .slot
        .as_deref()
        .map(str::parse::<SlotId>)
        .transpose()?;

    let report = state.service.reload(slot).await?;
    if !report.success {
        warn!("Reload did not load any model: {}", report.message);
    }
    Ok(Json(report))
}

async fn fallback() -> AppError {
    AppError::Rejected(StatusCode::NOT_FOUND, "Not found".to_string())
}

/// Image bytes from a multipart `file` field or the raw request body
pub struct ImageUpload(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
            return Ok(Self(body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?
        {
            if field.name() == Some("file") {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
                return Ok(Self(data));
            }
        }

        Err(AppError::InvalidRequest(
            "multipart field 'file' is required".to_string(),
        ))
    }
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Rejected(StatusCode, String),
    InternalError(String),
}

impl From<civiclens_core::Error> for AppError {
    fn from(err: civiclens_core::Error) -> Self {
        use civiclens_core::Error;

        match err {
            Error::InvalidImage(_) | Error::InvalidCoordinates(_) | Error::UnknownSlot(_) => {
                AppError::InvalidRequest(err.to_string())
            }
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, kind) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg, "invalid_request_error"),
            AppError::Rejected(status, msg) => (status, msg, "invalid_request_error"),
            AppError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "internal_error")
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
