use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use optic_common::{OpticError, Result};
use optic_http::{Auth, HttpClient, HttpError, RequestOpts};

use crate::types::{
    AnnotateBatch, AnnotateBatchResponse, AnnotateRequest, ClassificationResult, Feature,
    FeatureKind, ImageContent, ImageContext, WebDetectionParams,
};

const ANNOTATE_PATH: &str = "v1/images:annotate";
const MAX_LABELS: u32 = 10;
const MAX_WEB_HITS: u32 = 30;
const ANNOTATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam the pipeline classifies through, so tests can script results and
/// count invocations.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    /// Classify one base64-encoded image using the caller-supplied credential.
    async fn annotate(&self, image_base64: &str, api_key: &str) -> Result<ClassificationResult>;
}

/// Client for the external image-annotation service.
///
/// One outbound POST per call, no retries: a failure propagates immediately
/// to the caller with the upstream detail attached.
pub struct VisionClient {
    http: HttpClient,
}

impl VisionClient {
    /// Create a client against the annotation service's base URL. Production
    /// uses `https://vision.googleapis.com`; tests point this at a mock.
    pub fn new(endpoint: &str) -> std::result::Result<Self, HttpError> {
        let http = HttpClient::new(endpoint)?;
        Ok(Self { http })
    }

    fn build_request(image_base64: &str) -> AnnotateBatch {
        AnnotateBatch {
            requests: vec![AnnotateRequest {
                image: ImageContent {
                    content: image_base64.to_owned(),
                },
                features: vec![
                    Feature {
                        kind: FeatureKind::WebDetection,
                        max_results: Some(MAX_WEB_HITS),
                    },
                    Feature {
                        kind: FeatureKind::LabelDetection,
                        max_results: Some(MAX_LABELS),
                    },
                    Feature {
                        kind: FeatureKind::SafeSearchDetection,
                        max_results: None,
                    },
                ],
                image_context: Some(ImageContext {
                    web_detection_params: WebDetectionParams {
                        include_geo_results: false,
                    },
                }),
            }],
        }
    }
}

#[async_trait]
impl ImageAnnotator for VisionClient {
    async fn annotate(&self, image_base64: &str, api_key: &str) -> Result<ClassificationResult> {
        let body = Self::build_request(image_base64);

        let response: AnnotateBatchResponse = self
            .http
            .post_json(
                ANNOTATE_PATH,
                &body,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(api_key),
                    }),
                    timeout: Some(ANNOTATE_TIMEOUT),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_http_error)?;

        let first = response.responses.into_iter().next().ok_or_else(|| {
            OpticError::Decode("annotate response contained no entries".into())
        })?;

        tracing::debug!(
            target: "vision.annotate",
            labels = first.label_annotations.len(),
            has_safety = first.safe_search_annotation.is_some(),
            "vision.annotate.ok"
        );

        Ok(ClassificationResult {
            labels: first.label_annotations,
            safety: first.safe_search_annotation,
        })
    }
}

fn map_http_error(error: HttpError) -> OpticError {
    match error {
        HttpError::Api { status, message } => OpticError::Upstream {
            status: Some(status.as_u16()),
            detail: message,
        },
        HttpError::Decode(message, snippet) => {
            tracing::warn!(
                target: "vision.annotate",
                body_snippet = %snippet,
                "annotate response was not well-formed"
            );
            OpticError::Decode(message)
        }
        other => OpticError::Upstream {
            status: None,
            detail: other.to_string(),
        },
    }
}
