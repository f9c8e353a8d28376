//! Blog listing source.
//!
//! Renders the listing page, waiting for article anchors to appear, then
//! hands the HTML to [`ListingExtractor`]. A listing that cannot be rendered
//! fails the pipeline; a listing that renders but yields no entries is
//! reported by the caller.

use crate::config::PageTiming;
use crate::error::PipelineError;
use crate::extract::{ListingExtractor, ListingSource};
use crate::models::ArticleRecord;
use crate::render::Renderer;
use tracing::{error, info, instrument};

/// Render and extract the listing page.
#[instrument(level = "info", skip_all, fields(base_url = %source.base_url))]
pub async fn collect<R: Renderer>(
    pages: &R,
    source: &ListingSource,
    extractor: &ListingExtractor,
    timing: &PageTiming,
) -> Result<Vec<ArticleRecord>, PipelineError> {
    info!("Rendering listing page");
    let html = pages
        .render(&timing.request(source.base_url.as_str()))
        .await
        .inspect_err(|e| error!(error = %e, "Could not obtain the listing page"))?;
    info!(bytes = html.len(), "Listing page rendered");

    Ok(extractor.extract(&html))
}
