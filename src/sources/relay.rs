//! Upstream RSS relay.
//!
//! Reads items from an existing RSS 2.0 feed so they can be republished
//! with their full article bodies. Only the fields the feed assembler needs
//! are read: `title`, `link`, `pubDate`, `description`, `dc:creator` and
//! `guid`. The creator is matched by the Dublin Core namespace, whatever
//! prefix the upstream document binds it to.
//!
//! # Category pages
//!
//! Some upstream feeds mix section landing pages in with articles. A link
//! is treated as a category page when it contains the section marker but
//! does not match the article-id pattern, e.g. with the defaults
//! `…/square/news/bitcoin` is dropped and `…/square/news/bitcoin-123456` is
//! kept. The rule is a heuristic; both parts are configurable.

use crate::error::{ConfigError, FeedError, PipelineError};
use crate::models::{ArticleRecord, TitleSource};
use crate::outputs::rss::DC_NS;
use crate::render::{RenderRequest, Renderer};
use crate::utils::truncate_for_log;
use quick_xml::NsReader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Where the upstream feed lives and which of its links to drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaySource {
    pub feed_url: String,
    #[serde(default)]
    pub category_page: CategoryPageRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPageRule {
    /// Path fragment that marks a link as belonging to the news section.
    pub section_marker: String,
    /// Regex an article link in that section must match.
    pub article_id_pattern: String,
}

impl Default for CategoryPageRule {
    fn default() -> Self {
        Self {
            section_marker: "/square/news/".to_string(),
            article_id_pattern: r"-\d+$".to_string(),
        }
    }
}

/// Compiled [`CategoryPageRule`].
#[derive(Debug, Clone)]
pub struct CategoryPageFilter {
    section_marker: String,
    article_id: Regex,
}

impl CategoryPageFilter {
    pub fn new(pipeline: &str, rule: &CategoryPageRule) -> Result<Self, ConfigError> {
        let article_id = Regex::new(&rule.article_id_pattern).map_err(|e| {
            ConfigError::invalid(pipeline, format!("article_id_pattern {:?}: {e}", rule.article_id_pattern))
        })?;
        Ok(Self {
            section_marker: rule.section_marker.clone(),
            article_id,
        })
    }

    pub fn is_category_page(&self, link: &str) -> bool {
        !self.section_marker.is_empty() && link.contains(&self.section_marker) && !self.article_id.is_match(link)
    }
}

/// One `<item>` as read from the upstream document, fields trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
    pub creator: String,
    pub guid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
    Creator,
    Guid,
}

impl Field {
    fn resolve(ns: &ResolveResult<'_>, local: &[u8]) -> Option<Self> {
        match (ns, local) {
            (ResolveResult::Unbound, b"title") => Some(Field::Title),
            (ResolveResult::Unbound, b"link") => Some(Field::Link),
            (ResolveResult::Unbound, b"pubDate") => Some(Field::PubDate),
            (ResolveResult::Unbound, b"description") => Some(Field::Description),
            (ResolveResult::Unbound, b"guid") => Some(Field::Guid),
            (ResolveResult::Bound(Namespace(uri)), b"creator") if *uri == DC_NS.as_bytes() => Some(Field::Creator),
            _ => None,
        }
    }
}

impl UpstreamItem {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Description => &mut self.description,
            Field::Creator => &mut self.creator,
            Field::Guid => &mut self.guid,
        };
        *slot = value;
    }
}

/// Parse the items of an RSS 2.0 document in document order.
pub fn parse_items(xml: &str) -> Result<Vec<UpstreamItem>, FeedError> {
    let mut reader = NsReader::from_str(xml);

    let mut items = Vec::new();
    let mut saw_channel = false;
    let mut current: Option<UpstreamItem> = None;
    // field being read while inside a recognised item child
    let mut open: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) => match e.local_name().as_ref() {
                b"channel" => saw_channel = true,
                b"item" => current = Some(UpstreamItem::default()),
                local if current.is_some() && open.is_none() => {
                    if let Some(field) = Field::resolve(&ns, local) {
                        open = Some(field);
                        text.clear();
                    }
                }
                _ => {}
            },
            (_, Event::Empty(e)) if e.local_name().as_ref() == b"channel" => saw_channel = true,
            (_, Event::Text(t)) if open.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            (_, Event::CData(c)) if open.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            (_, Event::GeneralRef(r)) if open.is_some() => match r.resolve_char_ref().ok().flatten() {
                Some(ch) => text.push(ch),
                None => {
                    let name = String::from_utf8_lossy(&r);
                    match resolve_predefined_entity(&name) {
                        Some(resolved) => text.push_str(resolved),
                        None => {
                            text.push('&');
                            text.push_str(&name);
                            text.push(';');
                        }
                    }
                }
            },
            (ns, Event::End(e)) => {
                let local = e.local_name();
                if local.as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    open = None;
                } else if let Some(field) = open.filter(|f| Field::resolve(&ns, local.as_ref()) == Some(*f)) {
                    if let Some(item) = current.as_mut() {
                        item.set(field, text.trim().to_string());
                    }
                    open = None;
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if !saw_channel {
        return Err(FeedError::MissingChannel);
    }
    Ok(items)
}

/// Turn upstream items into records, dropping incomplete items and category pages.
pub fn records_from_items(
    items: Vec<UpstreamItem>,
    filter: &CategoryPageFilter,
    default_author: &str,
) -> Vec<ArticleRecord> {
    let total = items.len();
    let mut incomplete = 0usize;
    let mut category_pages = 0usize;

    let records: Vec<ArticleRecord> = items
        .into_iter()
        .filter_map(|item| {
            if filter.is_category_page(&item.link) {
                category_pages += 1;
                info!(title = %truncate_for_log(&item.title, 50), link = %item.link, "Skipping category page");
                return None;
            }
            if item.title.is_empty() || item.link.is_empty() {
                incomplete += 1;
                debug!(guid = %item.guid, "Skipping upstream item without title or link");
                return None;
            }

            let mut record = ArticleRecord::new(item.title, item.link, TitleSource::Upstream);
            record.publish_date = item.pub_date;
            record.description = Some(item.description).filter(|d| !d.is_empty());
            record.author = Some(if item.creator.is_empty() {
                default_author.to_string()
            } else {
                item.creator
            });
            record.upstream_guid = Some(item.guid).filter(|g| !g.is_empty());
            Some(record)
        })
        .collect();

    info!(total, kept = records.len(), category_pages, incomplete, "Parsed upstream feed");
    records
}

/// Fetch the upstream feed and turn it into records.
#[instrument(level = "info", skip_all, fields(feed_url = %source.feed_url))]
pub async fn collect<D: Renderer>(
    documents: &D,
    source: &RelaySource,
    filter: &CategoryPageFilter,
    default_author: &str,
) -> Result<Vec<ArticleRecord>, PipelineError> {
    info!("Fetching upstream feed");
    let xml = documents.render(&RenderRequest::document(source.feed_url.as_str())).await?;
    let items = parse_items(&xml)?;
    Ok(records_from_items(items, filter, default_author))
}
