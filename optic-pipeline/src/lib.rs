//! Orchestration of the moderation-and-retrieval pipeline:
//! validate → classify → gate → (scrape) → assemble.
//!
//! Classification failures abort the request; scrape degradation never does.
//! When the gate rejects an image the response suppresses labels entirely and
//! the scraper is not invoked, so nothing about flagged content leaks back to
//! the caller.

use std::sync::Arc;

use optic_common::{OpticError, Result, SimilarImage};
use optic_scrape::RelatedImages;
use optic_vision::{evaluate, ImageAnnotator, LabelAnnotation, SafeSearchAnnotation, SafetyVerdict};
use serde::Deserialize;
use tracing::info;

/// Inbound analysis request. Absent JSON fields deserialize to empty strings
/// so validation stays the pipeline's responsibility rather than the
/// deserializer's.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRequest {
    pub image_data: String,
    pub api_key: String,
}

/// The unified pipeline result.
#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    pub labels: Vec<LabelAnnotation>,
    pub safety: Option<SafeSearchAnnotation>,
    pub similar_images: Vec<SimilarImage>,
}

/// Sequences one request through classification, the safety gate, and the
/// conditional related-image lookup.
pub struct AnalysisPipeline {
    annotator: Arc<dyn ImageAnnotator>,
    related: Arc<dyn RelatedImages>,
    fallback_query: String,
}

impl AnalysisPipeline {
    pub fn new(
        annotator: Arc<dyn ImageAnnotator>,
        related: Arc<dyn RelatedImages>,
        fallback_query: impl Into<String>,
    ) -> Self {
        Self {
            annotator,
            related,
            fallback_query: fallback_query.into(),
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Fails with [`OpticError::Validation`] before any network call when a
    /// required field is missing; `Upstream`/`Decode` propagate unchanged
    /// from the classification step. Scrape failures never propagate.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        if request.api_key.is_empty() {
            return Err(OpticError::Validation("API key required".into()));
        }
        if request.image_data.is_empty() {
            return Err(OpticError::Validation("Image data required".into()));
        }

        let classified = self
            .annotator
            .annotate(&request.image_data, &request.api_key)
            .await?;

        if evaluate(classified.safety.as_ref()) == SafetyVerdict::Unsafe {
            info!(target: "pipeline", "image rejected by safety gate");
            return Ok(AnalysisResponse {
                labels: Vec::new(),
                safety: classified.safety,
                similar_images: Vec::new(),
            });
        }

        let query = classified
            .labels
            .first()
            .map(|label| label.description.clone())
            .unwrap_or_else(|| self.fallback_query.clone());

        let similar_images = self.related.find_related(&query).await;

        info!(
            target: "pipeline",
            labels = classified.labels.len(),
            similar = similar_images.len(),
            "analysis complete"
        );

        Ok(AnalysisResponse {
            labels: classified.labels,
            safety: classified.safety,
            similar_images,
        })
    }
}
