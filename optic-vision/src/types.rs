//! Wire types for the annotate endpoint, request and response side.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct AnnotateBatch {
    pub requests: Vec<AnnotateRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnotateRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageContent {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum FeatureKind {
    WebDetection,
    LabelDetection,
    SafeSearchDetection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageContext {
    pub web_detection_params: WebDetectionParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebDetectionParams {
    pub include_geo_results: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnnotateBatchResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnotateImageResponse {
    #[serde(default)]
    pub label_annotations: Vec<LabelAnnotation>,
    pub safe_search_annotation: Option<SafeSearchAnnotation>,
}

/// One descriptive label for the image, in upstream relevance order. The full
/// object is retained so the response can pass upstream detail through
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topicality: Option<f32>,
}

/// Likelihood levels as reported by the annotation service, ordered from
/// least to most likely so gate thresholds can compare with `>=`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

/// Per-category safety signals. Categories the service omits default to
/// [`Likelihood::Unknown`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeSearchAnnotation {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub spoof: Likelihood,
    #[serde(default)]
    pub medical: Likelihood,
    #[serde(default)]
    pub violence: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
}

/// What the classification call yields: ranked labels plus safety signals,
/// both carried through to the assembled response.
#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub labels: Vec<LabelAnnotation>,
    pub safety: Option<SafeSearchAnnotation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likelihood_levels_are_ordered() {
        assert!(Likelihood::Unknown < Likelihood::VeryUnlikely);
        assert!(Likelihood::Possible < Likelihood::Likely);
        assert!(Likelihood::Likely < Likelihood::VeryLikely);
    }

    #[test]
    fn likelihood_uses_wire_names() {
        let parsed: Likelihood = serde_json::from_str("\"VERY_LIKELY\"").unwrap();
        assert_eq!(parsed, Likelihood::VeryLikely);
        assert_eq!(
            serde_json::to_string(&Likelihood::VeryUnlikely).unwrap(),
            "\"VERY_UNLIKELY\""
        );
    }

    #[test]
    fn missing_safety_categories_default_to_unknown() {
        let parsed: SafeSearchAnnotation =
            serde_json::from_str(r#"{"adult":"LIKELY"}"#).unwrap();
        assert_eq!(parsed.adult, Likelihood::Likely);
        assert_eq!(parsed.violence, Likelihood::Unknown);
        assert_eq!(parsed.racy, Likelihood::Unknown);
    }

    #[test]
    fn annotate_request_serializes_like_the_service_expects() {
        let batch = AnnotateBatch {
            requests: vec![AnnotateRequest {
                image: ImageContent {
                    content: "aGk=".into(),
                },
                features: vec![
                    Feature {
                        kind: FeatureKind::WebDetection,
                        max_results: Some(30),
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
        };
        let v = serde_json::to_value(&batch).unwrap();
        assert_eq!(v["requests"][0]["image"]["content"], "aGk=");
        assert_eq!(v["requests"][0]["features"][0]["type"], "WEB_DETECTION");
        assert_eq!(v["requests"][0]["features"][0]["maxResults"], 30);
        assert!(v["requests"][0]["features"][1].get("maxResults").is_none());
        assert_eq!(
            v["requests"][0]["imageContext"]["webDetectionParams"]["includeGeoResults"],
            false
        );
    }
}
