//! Router and handlers for the analysis API.
//!
//! The analyze handler renders [`AnalysisResponse`] in the annotate-style
//! envelope the original frontend consumes, and maps pipeline errors onto
//! 400 (validation) / 500 (upstream, decode).

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use optic_common::{OpticError, SimilarImage};
use optic_pipeline::{AnalysisPipeline, AnalysisRequest, AnalysisResponse};
use optic_vision::{LabelAnnotation, SafeSearchAnnotation};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Base64 image payloads are large; mirror the original's 50 MiB allowance.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub struct AppState {
    pub pipeline: AnalysisPipeline,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    match state.pipeline.analyze(&request).await {
        Ok(analysis) => Json(WireResponse::from(&analysis)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Serialize)]
struct WireResponse<'a> {
    responses: [AnnotatePayload<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotatePayload<'a> {
    label_annotations: &'a [LabelAnnotation],
    #[serde(skip_serializing_if = "Option::is_none")]
    safe_search_annotation: Option<&'a SafeSearchAnnotation>,
    web_detection: WebDetectionPayload<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebDetectionPayload<'a> {
    visually_similar_images: &'a [SimilarImage],
}

impl<'a> From<&'a AnalysisResponse> for WireResponse<'a> {
    fn from(analysis: &'a AnalysisResponse) -> Self {
        Self {
            responses: [AnnotatePayload {
                label_annotations: &analysis.labels,
                safe_search_annotation: analysis.safety.as_ref(),
                web_detection: WebDetectionPayload {
                    visually_similar_images: &analysis.similar_images,
                },
            }],
        }
    }
}

fn error_response(error: OpticError) -> Response {
    let (status, message) = match &error {
        OpticError::Validation(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        // The malformed upstream payload stays in the logs; callers get a
        // fixed message.
        OpticError::Decode(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "classification response could not be decoded".to_string(),
        ),
        OpticError::Upstream { .. } => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
}
