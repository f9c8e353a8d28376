//! Record sources and the detail-page enrichment they share.
//!
//! Each source turns one starting document into a list of
//! [`ArticleRecord`]s, in an order that is newest-first as far as the source
//! knows it:
//!
//! | Source | Module | Starting document | Title from |
//! |--------|--------|-------------------|------------|
//! | Blog listing | [`listing`] | rendered HTML listing | card markup, else URL slug |
//! | Feed relay | [`relay`] | upstream RSS 2.0 | the upstream `<title>` |
//!
//! Records from either source then go through [`fetch_contents`], which
//! renders each article page one at a time and fills in the body.
//! A failed article fetch is logged and the record keeps its description
//! as content; it never fails the pipeline.

pub mod listing;
pub mod relay;

use crate::config::PageTiming;
use crate::extract::ContentExtractor;
use crate::models::{ArticleRecord, DetailPage};
use crate::render::Renderer;
use crate::utils::truncate_for_log;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Counters from one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    pub fetched: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Render each record's link and apply what the detail page yields.
///
/// Fetches run sequentially in record order with `rate_limit` between
/// them.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn fetch_contents<R: Renderer>(
    pages: &R,
    extractor: &ContentExtractor,
    timing: &PageTiming,
    records: &mut [ArticleRecord],
    rate_limit: Duration,
) -> ContentStats {
    let total = records.len();
    let mut stats = ContentStats::default();

    for (i, record) in records.iter_mut().enumerate() {
        info!(
            "[{}/{}] Fetching content: {}",
            i + 1,
            total,
            truncate_for_log(&record.title, 50)
        );

        let detail = match pages.render(&timing.request(record.link.as_str())).await {
            Ok(html) => {
                let detail = extractor.extract(&html);
                if detail.body.is_empty() {
                    stats.empty += 1;
                    warn!(link = %record.link, "No content container passed the threshold; using description");
                } else {
                    stats.fetched += 1;
                }
                detail
            }
            Err(e) => {
                stats.failed += 1;
                warn!(link = %record.link, error = %e, "Content fetch failed; using description");
                DetailPage::default()
            }
        };
        record.apply_detail(detail);

        if i + 1 < total && !rate_limit.is_zero() {
            sleep(rate_limit).await;
        }
    }

    info!(
        fetched = stats.fetched,
        empty = stats.empty,
        failed = stats.failed,
        "Content fetch finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::extract::ContentSettings;
    use crate::models::TitleSource;
    use crate::render::RenderRequest;

    /// Serves a body for `/good`, an empty page for `/empty` and fails otherwise.
    struct Pages;

    impl Renderer for Pages {
        async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
            if request.url.ends_with("/good") {
                Ok(format!(
                    r#"<article><p>{}</p></article><span class="author">Jane Doe</span>"#,
                    "Full article text. ".repeat(10)
                ))
            } else if request.url.ends_with("/empty") {
                Ok("<article>tiny</article>".to_string())
            } else {
                Err(FetchError::Timeout {
                    url: request.url.clone(),
                    secs: 20,
                })
            }
        }
    }

    fn record(path: &str) -> ArticleRecord {
        let mut r = ArticleRecord::new(path, format!("https://example.com/blog{path}"), TitleSource::AnchorText);
        r.description = Some(format!("Summary of {path}"));
        r
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_description() {
        let extractor = ContentExtractor::new("t", &ContentSettings::default()).unwrap();
        let mut records = vec![record("/good"), record("/empty"), record("/broken")];

        let stats = fetch_contents(
            &Pages,
            &extractor,
            &PageTiming::default(),
            &mut records,
            Duration::ZERO,
        )
        .await;

        assert_eq!(
            stats,
            ContentStats {
                fetched: 1,
                empty: 1,
                failed: 1
            }
        );
        assert!(records[0].content.as_deref().unwrap().starts_with("<p>Full article text."));
        assert_eq!(records[0].author.as_deref(), Some("Jane Doe"));
        assert_eq!(records[1].content.as_deref(), Some("Summary of /empty"));
        assert_eq!(records[2].content.as_deref(), Some("Summary of /broken"));
        // order is untouched
        assert!(records[2].link.ends_with("/broken"));
    }
}
