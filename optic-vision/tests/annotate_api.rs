//! Integration tests for the annotate client against a mocked upstream.

use optic_common::OpticError;
use optic_vision::{ImageAnnotator, Likelihood, VisionClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGE: &str = "aGVsbG8gd29ybGQ=";

async fn mock_upstream(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .and(query_param("key", "test-key"))
        .respond_with(template)
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn parses_labels_in_relevance_order_and_safety_signals() {
    let body = json!({
        "responses": [{
            "labelAnnotations": [
                { "mid": "/m/09d_r", "description": "Mountain", "score": 0.98, "topicality": 0.98 },
                { "description": "Ridge", "score": 0.91 }
            ],
            "safeSearchAnnotation": {
                "adult": "VERY_UNLIKELY",
                "spoof": "UNLIKELY",
                "medical": "UNLIKELY",
                "violence": "POSSIBLE",
                "racy": "UNLIKELY"
            }
        }]
    });
    let server = mock_upstream(ResponseTemplate::new(200).set_body_json(body)).await;

    let client = VisionClient::new(&server.uri()).unwrap();
    let result = client.annotate(IMAGE, "test-key").await.unwrap();

    let descriptions: Vec<&str> = result
        .labels
        .iter()
        .map(|l| l.description.as_str())
        .collect();
    assert_eq!(descriptions, ["Mountain", "Ridge"]);

    let safety = result.safety.expect("safety annotation present");
    assert_eq!(safety.adult, Likelihood::VeryUnlikely);
    assert_eq!(safety.violence, Likelihood::Possible);
}

#[tokio::test]
async fn sends_the_fixed_feature_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "requests": [{
                "image": { "content": IMAGE },
                "features": [
                    { "type": "WEB_DETECTION", "maxResults": 30 },
                    { "type": "LABEL_DETECTION", "maxResults": 10 },
                    { "type": "SAFE_SEARCH_DETECTION" }
                ],
                "imageContext": { "webDetectionParams": { "includeGeoResults": false } }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": [{}] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = VisionClient::new(&server.uri()).unwrap();
    let result = client.annotate(IMAGE, "test-key").await.unwrap();
    assert!(result.labels.is_empty());
    assert!(result.safety.is_none());
}

#[tokio::test]
async fn non_success_status_surfaces_upstream_detail() {
    let body = json!({
        "error": { "code": 403, "message": "The request is missing a valid API key.", "status": "PERMISSION_DENIED" }
    });
    let server = mock_upstream(ResponseTemplate::new(403).set_body_json(body)).await;

    let client = VisionClient::new(&server.uri()).unwrap();
    let error = client.annotate(IMAGE, "test-key").await.unwrap_err();

    match error {
        OpticError::Upstream { status, detail } => {
            assert_eq!(status, Some(403));
            assert!(detail.contains("missing a valid API key"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server =
        mock_upstream(ResponseTemplate::new(200).set_body_string("<!doctype html>nope")).await;

    let client = VisionClient::new(&server.uri()).unwrap();
    let error = client.annotate(IMAGE, "test-key").await.unwrap_err();
    assert!(matches!(error, OpticError::Decode(_)));
}

#[tokio::test]
async fn empty_responses_array_is_a_decode_error() {
    let server =
        mock_upstream(ResponseTemplate::new(200).set_body_json(json!({ "responses": [] }))).await;

    let client = VisionClient::new(&server.uri()).unwrap();
    let error = client.annotate(IMAGE, "test-key").await.unwrap_err();
    assert!(matches!(error, OpticError::Decode(_)));
}
