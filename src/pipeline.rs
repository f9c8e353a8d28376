//! One pipeline run, end to end.
//!
//! ```text
//! source (listing render + extract | upstream feed parse)
//!   -> truncate to max_articles
//!   -> per-article content fetch (sequential, rate limited)
//!   -> optional JSON dump
//!   -> assemble (sort by date, newest first)
//!   -> write RSS
//! ```
//!
//! Renders go through a [`RetryRenderer`] built from the pipeline's retry
//! settings. Only a failure to obtain the starting document, an empty
//! result or an output write error fails the run.

use crate::config::{PipelineConfig, SourceConfig};
use crate::error::PipelineError;
use crate::extract::{ContentExtractor, ListingExtractor};
use crate::feed::FeedAssembler;
use crate::outputs::{json, rss};
use crate::render::Renderer;
use crate::retry::RetryRenderer;
use crate::sources::relay::CategoryPageFilter;
use crate::sources::{self, ContentStats, listing, relay};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub items: usize,
    pub path: PathBuf,
    pub content: Option<ContentStats>,
}

/// Run `config` once. `pages` renders HTML pages, `documents` fetches
/// static documents such as upstream feeds.
#[instrument(level = "info", skip_all, fields(pipeline = %config.name))]
pub async fn run_pipeline<P, D>(
    config: &PipelineConfig,
    pages: &P,
    documents: &D,
    now: DateTime<Utc>,
) -> Result<PipelineReport, PipelineError>
where
    P: Renderer,
    D: Renderer,
{
    let pages = RetryRenderer::new(pages, config.retry);
    let documents = RetryRenderer::new(documents, config.retry);
    let content = ContentExtractor::new(&config.name, &config.content)?;

    let mut records = match &config.source {
        SourceConfig::Listing(source) => {
            let extractor = ListingExtractor::new(&config.name, source)?;
            listing::collect(&pages, source, &extractor, &config.render.listing).await?
        }
        SourceConfig::Relay(source) => {
            let filter = CategoryPageFilter::new(&config.name, &source.category_page)?;
            relay::collect(&documents, source, &filter, &config.feed.default_author).await?
        }
    };

    if records.is_empty() {
        return Err(PipelineError::NoArticles {
            source_url: config.source.origin().to_string(),
        });
    }
    if records.len() > config.max_articles {
        info!(found = records.len(), max = config.max_articles, "Truncating to max_articles");
        records.truncate(config.max_articles);
    }

    let content_stats = if config.fetch_content {
        Some(
            sources::fetch_contents(
                &pages,
                &content,
                &config.render.article,
                &mut records,
                config.rate_limit(),
            )
            .await,
        )
    } else {
        info!("Content fetch disabled; feed will carry descriptions only");
        None
    };

    let bodiless = records.iter().filter(|r| !r.has_content()).count();
    if config.fetch_content && bodiless > 0 {
        warn!(bodiless, total = records.len(), "Some items have no article body");
    }

    if let Some(path) = &config.json_dump {
        if let Err(e) = json::write_records(&records, path).await {
            warn!(path = %path.display(), error = %e, "Failed to write JSON record dump");
        }
    }

    let feed = FeedAssembler::new(config.feed.clone()).assemble(&records, now);
    rss::write_feed(&feed, &config.output).await?;
    info!(items = feed.len(), path = %config.output.display(), "Pipeline finished");

    Ok(PipelineReport {
        items: feed.len(),
        path: config.output.clone(),
        content: content_stats,
    })
}
