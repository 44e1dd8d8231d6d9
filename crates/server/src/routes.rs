//! HTTP routes: `GET /api/extract` and `GET /health`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use siphon_core::{ExtractionResult, ExtractionService, PageFetcher, SiphonError};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub struct AppState<F> {
    pub service: Arc<ExtractionService<F>>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self { service: Arc::clone(&self.service) }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractParams {
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Pipeline failure as an HTTP response.
#[derive(Debug)]
pub struct ApiError(SiphonError);

impl From<SiphonError> for ApiError {
    fn from(error: SiphonError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            SiphonError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to extract data"),
        };
        let body = ErrorBody { error: error.to_string(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthBody {
    pub status: String,
    pub active: usize,
    pub waiting: usize,
    pub limit: usize,
}

pub fn router<F>(service: Arc<ExtractionService<F>>, request_timeout: Duration) -> Router
where
    F: PageFetcher + 'static,
{
    Router::new()
        .route("/api/extract", get(extract_handler::<F>))
        .route("/health", get(health_handler::<F>))
        .with_state(AppState { service })
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn extract_handler<F: PageFetcher + 'static>(
    State(state): State<AppState<F>>, Query(params): Query<ExtractParams>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let url = params
        .url
        .ok_or_else(|| SiphonError::InvalidInput("url query parameter is required".to_string()))?;

    let result = state
        .service
        .extract(&url)
        .instrument(info_span!("request", id = %Uuid::new_v4()))
        .await?;
    Ok(Json(result))
}

async fn health_handler<F: PageFetcher + 'static>(State(state): State<AppState<F>>) -> Json<HealthBody> {
    let gate = state.service.gate();
    Json(HealthBody { status: "ok".to_string(), active: gate.active(), waiting: gate.waiting(), limit: gate.limit() })
}
