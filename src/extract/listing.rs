//! Listing page extraction.
//!
//! Pulls one [`ArticleRecord`] per article anchor out of a rendered blog
//! listing. Every field is resolved by its own [`Cascade`]; the only
//! dependency between fields is that date, category, description and image
//! are looked up inside the anchor's enclosing card.
//!
//! Entries that fail are logged and skipped, never fatal. Output order is
//! document order, which is newest-first on the sites this targets.

use crate::error::ConfigError;
use crate::extract::cascade::Cascade;
use crate::extract::classes::{
    ClassMatch, attr_of, find_first, first_child, nearest_ancestor, text_of,
};
use crate::models::{ArticleRecord, TitleSource};
use crate::utils::{title_from_slug, truncate_for_log};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where and how to find articles on a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSource {
    /// The listing page URL; relative links resolve against it.
    pub base_url: String,
    /// Substring every article href contains, e.g. `/blog/`.
    pub path_marker: String,
    /// CSS selector of the application root that scopes the primary search.
    #[serde(default = "default_app_root")]
    pub app_root: String,
    #[serde(default)]
    pub markers: ListingMarkers,
}

fn default_app_root() -> String {
    "#__APP".to_string()
}

/// Class markers and patterns for the per-field lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingMarkers {
    /// Title containers inside the anchor, most specific first.
    pub title_containers: Vec<String>,
    /// Container whose first child `div` holds the date.
    pub date_container: String,
    pub date_pattern: String,
    pub category_pattern: String,
    pub description_pattern: String,
}

impl Default for ListingMarkers {
    fn default() -> Self {
        Self {
            title_containers: vec![
                "line-clamp".to_string(),
                "text-SecondaryText".to_string(),
                "typography-body".to_string(),
            ],
            date_container: "text-TertiaryText".to_string(),
            date_pattern: "date|time|published".to_string(),
            category_pattern: "category|tag".to_string(),
            description_pattern: "description|excerpt|summary".to_string(),
        }
    }
}

/// Why a single anchor produced no record.
#[derive(Debug, Error)]
enum SkipReason {
    #[error("empty href")]
    EmptyHref,
    #[error("href {0:?} lacks the path marker")]
    NotAnArticle(String),
    #[error("cannot resolve href {href:?}: {source}")]
    BadUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("no title and no usable slug in {0}")]
    NoTitle(String),
}

/// Lookup scope for one listing entry.
struct EntryScope<'a> {
    anchor: ElementRef<'a>,
    card: Option<ElementRef<'a>>,
}

/// Compiled form of a [`ListingSource`].
#[derive(Debug)]
pub struct ListingExtractor {
    base: Url,
    base_dir: Url,
    path_marker: String,
    primary: Selector,
    fallback: Selector,
    title_containers: Vec<String>,
    date_container: ClassMatch,
    date_class: ClassMatch,
    category_class: ClassMatch,
    description_class: ClassMatch,
}

impl ListingExtractor {
    /// Compile selectors and patterns, rejecting a source that could never match.
    pub fn new(pipeline: &str, source: &ListingSource) -> Result<Self, ConfigError> {
        let base = Url::parse(&source.base_url)
            .map_err(|e| ConfigError::invalid(pipeline, format!("base_url {:?}: {e}", source.base_url)))?;
        let mut base_dir = base.clone();
        if !base_dir.path().ends_with('/') {
            let path = format!("{}/", base_dir.path());
            base_dir.set_path(&path);
        }

        if source.path_marker.is_empty() || source.path_marker.contains('"') {
            return Err(ConfigError::invalid(pipeline, "path_marker must be non-empty and unquoted"));
        }
        let anchor_css = format!(r#"a[href*="{}"]"#, source.path_marker);
        let selector = |css: &str| {
            Selector::parse(css).map_err(|e| ConfigError::invalid(pipeline, format!("selector {css:?}: {e}")))
        };
        let primary = selector(&format!("{} {}", source.app_root, anchor_css))?;
        let fallback = selector(&anchor_css)?;

        let pattern = |p: &str| {
            ClassMatch::pattern(p).map_err(|e| ConfigError::invalid(pipeline, format!("pattern {p:?}: {e}")))
        };
        let m = &source.markers;

        Ok(Self {
            base,
            base_dir,
            path_marker: source.path_marker.clone(),
            primary,
            fallback,
            title_containers: m.title_containers.clone(),
            date_container: ClassMatch::contains(m.date_container.clone()),
            date_class: pattern(&m.date_pattern)?,
            category_class: pattern(&m.category_pattern)?,
            description_class: pattern(&m.description_pattern)?,
        })
    }

    /// Extract records from a listing page in document order.
    ///
    /// Anchors sharing a link collapse into the first occurrence; a later
    /// genuine title replaces an earlier synthesized one.
    #[instrument(level = "info", skip_all, fields(base = %self.base))]
    pub fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);

        let mut anchors: Vec<ElementRef<'_>> = document.select(&self.primary).collect();
        if anchors.is_empty() {
            debug!("No anchors under the app root; falling back to a global search");
            anchors = document.select(&self.fallback).collect();
        }

        let title = self.title_cascade();
        let date = self.date_cascade();

        let mut records: Vec<ArticleRecord> = Vec::new();
        let mut by_link: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for (index, anchor) in anchors.iter().enumerate() {
            match self.extract_entry(*anchor, &title, &date) {
                Ok(record) => {
                    if record.title_source == TitleSource::Synthesized {
                        warn!(index, link = %record.link, title = %record.title, "Title synthesized from URL");
                    }
                    match by_link.get(&record.link).copied() {
                        Some(i) => merge_duplicate(&mut records[i], record),
                        None => {
                            by_link.insert(record.link.clone(), records.len());
                            records.push(record);
                        }
                    }
                }
                Err(reason) => {
                    skipped += 1;
                    info!(index, %reason, "Skipping listing entry");
                }
            }
        }

        info!(
            anchors = anchors.len(),
            extracted = records.len(),
            skipped,
            "Extracted listing entries"
        );
        records
    }

    fn title_cascade<'d>(&self) -> Cascade<'_, EntryScope<'d>> {
        let mut cascade = Cascade::new();
        for marker in &self.title_containers {
            let class = ClassMatch::contains(marker.clone());
            cascade = cascade.then(marker.clone(), move |s: &EntryScope<'d>| {
                find_first(s.anchor, &["div"], &class).map(text_of)
            });
        }
        cascade.then("anchor-text", |s: &EntryScope<'d>| Some(text_of(s.anchor)))
    }

    fn date_cascade<'d>(&self) -> Cascade<'_, EntryScope<'d>> {
        let tertiary = move |scope: ElementRef<'d>| {
            find_first(scope, &["div"], &self.date_container)
                .and_then(|c| first_child(c, "div"))
                .map(text_of)
        };
        Cascade::new()
            .then("anchor-tertiary", move |s: &EntryScope<'d>| tertiary(s.anchor))
            .then("card-tertiary", move |s: &EntryScope<'d>| s.card.and_then(tertiary))
            .then("card-date-class", move |s: &EntryScope<'d>| {
                let el = find_first(s.card?, &["time", "span", "div"], &self.date_class)?;
                attr_of(el, "datetime").or_else(|| Some(text_of(el)))
            })
    }

    fn extract_entry<'a>(
        &self,
        anchor: ElementRef<'a>,
        title: &Cascade<'_, EntryScope<'a>>,
        date: &Cascade<'_, EntryScope<'a>>,
    ) -> Result<ArticleRecord, SkipReason> {
        let href = anchor.value().attr("href").map(str::trim).unwrap_or_default();
        if href.is_empty() {
            return Err(SkipReason::EmptyHref);
        }
        if !href.contains(self.path_marker.as_str()) {
            return Err(SkipReason::NotAnArticle(truncate_for_log(href, 80)));
        }
        let link = self.resolve(href).map_err(|source| SkipReason::BadUrl {
            href: truncate_for_log(href, 80),
            source,
        })?;

        let scope = EntryScope {
            anchor,
            card: nearest_ancestor(anchor, &["div", "article"]),
        };

        let (title, title_source) = match title.run(&scope) {
            Some(hit) if hit.strategy == "anchor-text" => (hit.value, TitleSource::AnchorText),
            Some(hit) => (hit.value, TitleSource::Container(hit.strategy)),
            None => {
                let synthesized = slug_of(&link).map(|s| title_from_slug(&s)).unwrap_or_default();
                if synthesized.is_empty() {
                    return Err(SkipReason::NoTitle(link.to_string()));
                }
                (synthesized, TitleSource::Synthesized)
            }
        };

        let mut record = ArticleRecord::new(title, link.to_string(), title_source);
        if let Some(hit) = date.run(&scope) {
            debug!(strategy = %hit.strategy, date = %hit.value, "Resolved listing date");
            record.publish_date = hit.value;
        }

        if let Some(card) = scope.card {
            record.category = find_first(card, &["span", "div", "a"], &self.category_class)
                .map(text_of)
                .filter(|v| !v.is_empty());
            record.description = find_first(card, &["p", "div"], &self.description_class)
                .map(text_of)
                .filter(|v| !v.is_empty());
            record.image_url = find_first(card, &["img"], &ClassMatch::Any)
                .and_then(|img| {
                    attr_of(img, "src")
                        .or_else(|| attr_of(img, "data-src"))
                        .or_else(|| attr_of(img, "data-lazy-src"))
                })
                .map(|src| self.resolve(&src).map(|u| u.to_string()).unwrap_or(src));
        }

        Ok(record)
    }

    /// Absolute URL for an href: root-relative paths against the site
    /// origin, other relative paths under the listing URL.
    fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        if href.starts_with('/') {
            self.base.join(href)
        } else {
            self.base_dir.join(href)
        }
    }
}

fn slug_of(link: &Url) -> Option<String> {
    link.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn merge_duplicate(existing: &mut ArticleRecord, later: ArticleRecord) {
    if existing.title_source == TitleSource::Synthesized && later.title_source != TitleSource::Synthesized {
        existing.title = later.title;
        existing.title_source = later.title_source;
    }
    if existing.publish_date.is_empty() {
        existing.publish_date = later.publish_date;
    }
    existing.category = existing.category.take().or(later.category);
    existing.description = existing.description.take().or(later.description);
    existing.image_url = existing.image_url.take().or(later.image_url);
}
