//! Common types shared across the optic workspace.
//!
//! This crate defines the pipeline error taxonomy, small value types that
//! cross crate boundaries, and the [`observability`] module with centralised
//! tracing initialisation. It is intentionally lightweight so every crate can
//! depend on it without heavy transitive costs.

use serde::{Deserialize, Serialize};

pub mod observability;

/// A single related-image hit, either scraped from a results page or passed
/// through from the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarImage {
    pub url: String,
}

/// Error taxonomy for the analysis pipeline.
///
/// Scrape failures are deliberately absent: the scraper's public operation
/// never fails and degrades to an empty result at its own boundary.
#[derive(thiserror::Error, Debug)]
pub enum OpticError {
    /// The caller omitted a required request field. Surfaced as HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// The classification service rejected the request, returned a
    /// non-success status, or could not be reached. Carries the upstream
    /// detail for diagnostics. Surfaced as HTTP 500.
    #[error("classification service error: {detail}")]
    Upstream {
        status: Option<u16>,
        detail: String,
    },

    /// The classification service responded with a body that could not be
    /// parsed. The malformed payload is logged, never surfaced.
    #[error("failed to decode classification response: {0}")]
    Decode(String),
}

/// Convenient alias for results that use [`OpticError`].
pub type Result<T> = std::result::Result<T, OpticError>;
