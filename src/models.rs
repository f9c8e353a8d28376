//! Data models shared by the sources, the feed assembler and the writers.
//!
//! - [`ArticleRecord`]: one article as it moves through a pipeline run
//! - [`TitleSource`]: which extraction step produced a record's title
//! - [`DetailPage`]: what the content fetcher learned from a detail page
//! - [`FeedConfig`]: channel-level metadata, fixed for a run

use serde::{Deserialize, Serialize};

/// Where an article's title came from.
///
/// A synthesized title is a degraded outcome: the listing had no usable
/// text for the entry and the title was rebuilt from the URL slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    /// A styled text container inside the anchor, named by its marker.
    Container(String),
    /// The anchor's own visible text.
    AnchorText,
    /// Rebuilt from the last path segment of the link.
    Synthesized,
    /// Taken verbatim from an upstream feed item.
    Upstream,
}

/// A single article.
///
/// Created by a source (listing extraction or upstream feed parsing),
/// refined once by the content fetcher via [`ArticleRecord::apply_detail`],
/// then only read by the feed assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Never empty once a source has accepted the record.
    pub title: String,
    pub title_source: TitleSource,
    /// Absolute URL; the correlation key for feed items.
    pub link: String,
    /// Raw, un-normalized publish date as found in the markup.
    pub publish_date: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    /// Article body, HTML fragment or plain text.
    pub content: Option<String>,
    /// GUID supplied by an upstream feed, used verbatim when present.
    pub upstream_guid: Option<String>,
}

impl ArticleRecord {
    /// A record with only the two mandatory fields set.
    pub fn new(title: impl Into<String>, link: impl Into<String>, title_source: TitleSource) -> Self {
        Self {
            title: title.into(),
            title_source,
            link: link.into(),
            publish_date: String::new(),
            category: None,
            description: None,
            image_url: None,
            author: None,
            content: None,
            upstream_guid: None,
        }
    }

    /// Merge what the content fetcher found on the detail page.
    ///
    /// The listing date wins over the detail date; the detail author wins
    /// over whatever the source set. An empty body falls back to the
    /// listing description so the feed still carries something.
    pub fn apply_detail(&mut self, detail: DetailPage) {
        if !detail.body.trim().is_empty() {
            self.content = Some(detail.body);
        } else if let Some(desc) = self.description.as_ref().filter(|d| !d.trim().is_empty()) {
            self.content = Some(desc.clone());
        }

        if let Some(author) = detail.author.filter(|a| !a.trim().is_empty()) {
            self.author = Some(author);
        }

        if self.publish_date.trim().is_empty() {
            if let Some(published) = detail.published {
                self.publish_date = published;
            }
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// The result of fetching one article's detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    /// Inner HTML of the accepted content container, or empty.
    pub body: String,
    pub author: Option<String>,
    pub published: Option<String>,
}

/// Channel-level metadata for an emitted feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    pub link: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Used for `author` and `dc:creator` when a record has none.
    pub default_author: String,
    pub generator: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        let mut r = ArticleRecord::new(
            "Hello World",
            "https://example.com/blog/hello-world",
            TitleSource::AnchorText,
        );
        r.description = Some("Listing summary".to_string());
        r.publish_date = "2024-01-15".to_string();
        r
    }

    #[test]
    fn test_apply_detail_sets_body_and_author() {
        let mut r = record();
        r.apply_detail(DetailPage {
            body: "<p>Body</p>".to_string(),
            author: Some("Jane".to_string()),
            published: Some("2024-02-01".to_string()),
        });
        assert_eq!(r.content.as_deref(), Some("<p>Body</p>"));
        assert_eq!(r.author.as_deref(), Some("Jane"));
        // listing date wins
        assert_eq!(r.publish_date, "2024-01-15");
    }

    #[test]
    fn test_apply_detail_empty_body_falls_back_to_description() {
        let mut r = record();
        r.apply_detail(DetailPage::default());
        assert_eq!(r.content.as_deref(), Some("Listing summary"));
        assert!(r.has_content());
    }

    #[test]
    fn test_apply_detail_fills_missing_date() {
        let mut r = record();
        r.publish_date.clear();
        r.apply_detail(DetailPage {
            published: Some("2024-03-03T10:00:00Z".to_string()),
            ..Default::default()
        });
        assert_eq!(r.publish_date, "2024-03-03T10:00:00Z");
    }

    #[test]
    fn test_apply_detail_keeps_author_when_detail_blank() {
        let mut r = record();
        r.author = Some("Upstream Author".to_string());
        r.apply_detail(DetailPage {
            author: Some("   ".to_string()),
            ..Default::default()
        });
        assert_eq!(r.author.as_deref(), Some("Upstream Author"));
    }

    #[test]
    fn test_record_json_roundtrip_keeps_title_source() {
        let mut r = record();
        r.title_source = TitleSource::Container("line-clamp".to_string());
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"container\":\"line-clamp\""));
        let back: ArticleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_feed_config_language_defaults_to_en() {
        let yaml = "title: T\ndescription: D\nlink: https://example.com\ndefault_author: A\ngenerator: G\n";
        let cfg: FeedConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.language, "en");
    }
}
