//! Records to [`Feed`].
//!
//! Ordering is by normalized publish date, newest first. The sort is
//! stable, so records with the same instant keep their input order, which
//! for listing pages is document order.

use crate::dates::normalize_date_at;
use crate::feed::{Channel, Feed, FeedItem, ItemExtensions, guid};
use crate::models::{ArticleRecord, FeedConfig};
use crate::utils::truncate_chars;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

const DESCRIPTION_FROM_CONTENT_CHARS: usize = 500;

/// Builds feeds for one channel configuration.
#[derive(Debug, Clone)]
pub struct FeedAssembler {
    config: FeedConfig,
}

impl FeedAssembler {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Assemble a feed; `now` is the build time and the fallback publish date.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn assemble(&self, records: &[ArticleRecord], now: DateTime<Utc>) -> Feed {
        let mut dated: Vec<(DateTime<Utc>, &ArticleRecord)> = records
            .iter()
            .map(|r| (normalize_date_at(&r.publish_date, now), r))
            .collect();
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        let items: Vec<FeedItem> = dated.into_iter().map(|(date, r)| self.item(r, date)).collect();
        debug!(items = items.len(), "Assembled feed");

        Feed {
            channel: Channel {
                title: self.config.title.clone(),
                description: self.config.description.clone(),
                link: self.config.link.clone(),
                language: self.config.language.clone(),
                last_build_date: now,
                generator: self.config.generator.clone(),
            },
            items,
        }
    }

    fn item(&self, record: &ArticleRecord, pub_date: DateTime<Utc>) -> FeedItem {
        let title = match record.title.trim() {
            "" => "Untitled".to_string(),
            t => t.to_string(),
        };

        let description = record
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                record
                    .content
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| truncate_chars(c, DESCRIPTION_FROM_CONTENT_CHARS, "..."))
            })
            .unwrap_or_default();

        let author = record
            .author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.config.default_author)
            .to_string();

        FeedItem {
            title,
            link: record.link.clone(),
            description,
            pub_date,
            guid: guid::record_guid(record),
            author,
            category: record.category.clone().filter(|c| !c.trim().is_empty()),
            extensions: Some(ItemExtensions::from_record(record, &self.config.default_author)),
        }
    }
}
