//! Route-level tests: pipeline outcomes mapped onto HTTP statuses and the
//! annotate-style response envelope.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use optic_app::routes::{build_router, AppState};
use optic_common::{OpticError, Result, SimilarImage};
use optic_pipeline::AnalysisPipeline;
use optic_scrape::RelatedImages;
use optic_vision::{
    ClassificationResult, ImageAnnotator, LabelAnnotation, Likelihood, SafeSearchAnnotation,
};
use serde_json::{json, Value};
use tower::ServiceExt;

enum Outcome {
    Classified(ClassificationResult),
    Upstream(u16, &'static str),
    Garbled,
}

struct FixedAnnotator(Outcome);

#[async_trait]
impl ImageAnnotator for FixedAnnotator {
    async fn annotate(&self, _image: &str, _key: &str) -> Result<ClassificationResult> {
        match &self.0 {
            Outcome::Classified(result) => Ok(result.clone()),
            Outcome::Upstream(status, detail) => Err(OpticError::Upstream {
                status: Some(*status),
                detail: (*detail).to_string(),
            }),
            Outcome::Garbled => Err(OpticError::Decode("expected value at line 1".into())),
        }
    }
}

struct FixedScraper(Vec<SimilarImage>);

#[async_trait]
impl RelatedImages for FixedScraper {
    async fn find_related(&self, _query: &str) -> Vec<SimilarImage> {
        self.0.clone()
    }
}

fn app(outcome: Outcome, scraped: Vec<SimilarImage>) -> Router {
    let pipeline = AnalysisPipeline::new(
        Arc::new(FixedAnnotator(outcome)),
        Arc::new(FixedScraper(scraped)),
        "nature",
    );
    build_router(Arc::new(AppState { pipeline }))
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn safe_result(first_label: &str) -> ClassificationResult {
    ClassificationResult {
        labels: vec![LabelAnnotation {
            mid: None,
            description: first_label.to_string(),
            score: Some(0.97),
            topicality: None,
        }],
        safety: Some(SafeSearchAnnotation::default()),
    }
}

#[tokio::test]
async fn missing_api_key_maps_to_400() {
    let app = app(Outcome::Classified(safe_result("mountain")), Vec::new());

    let response = app
        .oneshot(analyze_request(json!({ "imageData": "aGk=" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "API key required");
}

#[tokio::test]
async fn missing_image_data_maps_to_400() {
    let app = app(Outcome::Classified(safe_result("mountain")), Vec::new());

    let response = app
        .oneshot(analyze_request(json!({ "apiKey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Image data required");
}

#[tokio::test]
async fn upstream_rejection_maps_to_500_with_detail() {
    let app = app(Outcome::Upstream(403, "API key expired"), Vec::new());

    let response = app
        .oneshot(analyze_request(json!({ "imageData": "aGk=", "apiKey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("API key expired"));
}

#[tokio::test]
async fn decode_failure_maps_to_500_with_a_generic_message() {
    let app = app(Outcome::Garbled, Vec::new());

    let response = app
        .oneshot(analyze_request(json!({ "imageData": "aGk=", "apiKey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "classification response could not be decoded"
    );
}

#[tokio::test]
async fn safe_analysis_renders_the_annotate_envelope() {
    let scraped = vec![
        SimilarImage {
            url: "https://example.com/1.jpg".into(),
        },
        SimilarImage {
            url: "https://example.com/2.jpg".into(),
        },
    ];
    let app = app(Outcome::Classified(safe_result("mountain")), scraped);

    let response = app
        .oneshot(analyze_request(json!({ "imageData": "aGk=", "apiKey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let entry = &body["responses"][0];
    assert_eq!(entry["labelAnnotations"][0]["description"], "mountain");
    assert_eq!(entry["safeSearchAnnotation"]["adult"], "UNKNOWN");
    let similar = entry["webDetection"]["visuallySimilarImages"]
        .as_array()
        .unwrap();
    assert_eq!(similar.len(), 2);
    assert_eq!(similar[0]["url"], "https://example.com/1.jpg");
}

#[tokio::test]
async fn unsafe_analysis_is_suppressed_but_still_200() {
    let result = ClassificationResult {
        labels: vec![LabelAnnotation {
            mid: None,
            description: "Person".into(),
            score: None,
            topicality: None,
        }],
        safety: Some(SafeSearchAnnotation {
            adult: Likelihood::VeryLikely,
            ..Default::default()
        }),
    };
    let app = app(
        Outcome::Classified(result),
        vec![SimilarImage {
            url: "https://example.com/should-not-appear.jpg".into(),
        }],
    );

    let response = app
        .oneshot(analyze_request(json!({ "imageData": "aGk=", "apiKey": "k" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let entry = &body["responses"][0];
    assert_eq!(entry["labelAnnotations"].as_array().unwrap().len(), 0);
    assert_eq!(
        entry["webDetection"]["visuallySimilarImages"]
            .as_array()
            .unwrap()
            .len(),
        0
    );
    assert_eq!(entry["safeSearchAnnotation"]["adult"], "VERY_LIKELY");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app(Outcome::Classified(safe_result("mountain")), Vec::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}
