//! Client and decision logic for the external image-annotation service.
//!
//! [`VisionClient`] performs the single outbound classification call;
//! [`gate::evaluate`] turns the returned safety signals into a binary
//! verdict. The [`ImageAnnotator`] trait is the seam the pipeline consumes,
//! so orchestration tests can substitute a scripted annotator.

pub mod client;
pub mod gate;
pub mod types;

pub use client::{ImageAnnotator, VisionClient};
pub use gate::{evaluate, SafetyVerdict};
pub use types::{ClassificationResult, LabelAnnotation, Likelihood, SafeSearchAnnotation};
