//! Related-image retrieval by scraping a rendered search-results page.
//!
//! The public operation is total: it never fails. Navigation timeouts,
//! extraction faults, and a missing browser all degrade to an empty result at
//! this boundary, so callers need no error handling around it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use optic_browser::{BrowserSession, PageLease};
use optic_common::SimilarImage;
use tracing::{debug, warn};
use url::Url;

/// Hard cap on returned image URLs.
pub const MAX_RELATED_IMAGES: usize = 30;

/// Hard bound on results-page navigation.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Search-engine thumbnails are served from this host; they are internal CDN
/// artifacts, not source images, and are excluded from results.
const THUMBNAIL_MARKER: &str = "gstatic.com";

const RESULTS_BASE: &str = "https://www.google.com/search";

/// Seam the pipeline retrieves related images through. Implementations never
/// fail; degraded lookups return an empty list.
#[async_trait]
pub trait RelatedImages: Send + Sync {
    async fn find_related(&self, query: &str) -> Vec<SimilarImage>;
}

/// Scraper backed by the shared [`BrowserSession`].
pub struct RelatedImageScraper {
    session: Arc<BrowserSession>,
}

impl RelatedImageScraper {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    async fn collect(&self, query: &str) -> anyhow::Result<Vec<SimilarImage>> {
        let page = self.session.lease_page().await?;
        let outcome = collect_on_page(&page, query).await;
        // The lease is released on every path, success or failure.
        if let Err(error) = page.close().await {
            debug!(target: "scrape", %error, "failed to close results page");
        }
        outcome
    }
}

#[async_trait]
impl RelatedImages for RelatedImageScraper {
    async fn find_related(&self, query: &str) -> Vec<SimilarImage> {
        match self.collect(query).await {
            Ok(images) => {
                debug!(
                    target: "scrape",
                    %query,
                    hit_count = images.len(),
                    "related-image scrape complete"
                );
                images
            }
            Err(error) => {
                warn!(
                    target: "scrape",
                    %query,
                    %error,
                    "related-image scrape degraded to empty result"
                );
                Vec::new()
            }
        }
    }
}

async fn collect_on_page(page: &PageLease, query: &str) -> anyhow::Result<Vec<SimilarImage>> {
    let url = build_results_url(query);
    page.goto(url.as_str(), SEARCH_TIMEOUT).await?;
    let sources = page.image_sources().await?;
    Ok(filter_candidates(sources))
}

/// Image-results URL for `query`, with the strict content filter fixed to its
/// safest setting.
pub fn build_results_url(query: &str) -> Url {
    let mut url = Url::parse(RESULTS_BASE).expect("valid base");
    url.query_pairs_mut()
        .append_pair("tbm", "isch")
        .append_pair("safe", "active")
        .append_pair("q", query);
    url
}

/// Keep absolute `http`/`https` sources that are not engine thumbnails, in
/// document order, capped at [`MAX_RELATED_IMAGES`].
pub fn filter_candidates(sources: Vec<String>) -> Vec<SimilarImage> {
    sources
        .into_iter()
        .filter(|src| is_external_image_url(src))
        .take(MAX_RELATED_IMAGES)
        .map(|url| SimilarImage { url })
        .collect()
}

fn is_external_image_url(src: &str) -> bool {
    if src.contains(THUMBNAIL_MARKER) {
        return false;
    }
    match Url::parse(src) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
