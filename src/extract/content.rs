//! Article body extraction from a rendered detail page.
//!
//! Candidate containers are probed in configured order. Within a selector,
//! matches are tried in document order; the first whose visible text is
//! longer than `min_text_len` wins, which skips empty wrappers that happen
//! to share a class name with the real body. Non-content subtrees are left
//! out when the container is serialized.

use crate::error::ConfigError;
use crate::extract::classes::{ClassMatch, attr_of, find_first, text_of};
use crate::models::DetailPage;
use crate::utils::collapse_whitespace;
use quick_xml::escape::{escape, partial_escape};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// How to find the body on a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    /// CSS selectors, most specific first.
    pub selectors: Vec<String>,
    /// Visible characters a container needs before it is accepted.
    pub min_text_len: usize,
    /// Elements dropped from the accepted container.
    pub strip_tags: Vec<String>,
    /// Also look for an author and a publish date on the page.
    pub refine_metadata: bool,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            selectors: vec![
                "article".to_string(),
                r#"div[class*="article-content"]"#.to_string(),
                r#"div[class*="post-content"]"#.to_string(),
            ],
            min_text_len: 100,
            strip_tags: ["script", "style", "nav", "footer", "header", "aside"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            refine_metadata: true,
        }
    }
}

/// Compiled form of [`ContentSettings`].
#[derive(Debug)]
pub struct ContentExtractor {
    selectors: Vec<(String, Selector)>,
    min_text_len: usize,
    strip_tags: Vec<String>,
    refine_metadata: bool,
    author_class: ClassMatch,
    date_class: ClassMatch,
    time_with_datetime: Selector,
}

impl ContentExtractor {
    pub fn new(pipeline: &str, settings: &ContentSettings) -> Result<Self, ConfigError> {
        let selectors = settings
            .selectors
            .iter()
            .map(|css| {
                Selector::parse(css)
                    .map(|sel| (css.clone(), sel))
                    .map_err(|e| ConfigError::invalid(pipeline, format!("content selector {css:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let compile = |p: &str| {
            ClassMatch::pattern(p).map_err(|e| ConfigError::invalid(pipeline, e.to_string()))
        };
        let time_with_datetime = Selector::parse("time[datetime]")
            .map_err(|e| ConfigError::invalid(pipeline, e.to_string()))?;

        Ok(Self {
            selectors,
            min_text_len: settings.min_text_len,
            strip_tags: settings.strip_tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            refine_metadata: settings.refine_metadata,
            author_class: compile("author|writer")?,
            date_class: compile("date|published")?,
            time_with_datetime,
        })
    }

    /// Extract body and metadata. Never fails; misses come back empty.
    pub fn extract(&self, html: &str) -> DetailPage {
        let document = Html::parse_document(html);
        let body = self.body(&document).unwrap_or_default();

        if !self.refine_metadata {
            return DetailPage {
                body,
                ..Default::default()
            };
        }

        let root = document.root_element();
        let author = find_first(root, &["span", "div", "a"], &self.author_class)
            .map(text_of)
            .filter(|a| !a.is_empty());
        let published = document
            .select(&self.time_with_datetime)
            .next()
            .and_then(|t| attr_of(t, "datetime"))
            .or_else(|| {
                find_first(root, &["span", "div"], &self.date_class)
                    .and_then(|el| attr_of(el, "datetime").or_else(|| Some(text_of(el))))
                    .filter(|d| !d.is_empty())
            });

        DetailPage {
            body,
            author,
            published,
        }
    }

    fn body(&self, document: &Html) -> Option<String> {
        for (css, selector) in &self.selectors {
            for candidate in document.select(selector) {
                let text_len = visible_text(candidate, &self.strip_tags).chars().count();
                if text_len > self.min_text_len {
                    debug!(selector = %css, text_len, "Accepted content container");
                    let mut out = String::new();
                    write_inner_html(candidate, &self.strip_tags, &mut out);
                    return Some(out.trim().to_string());
                }
                debug!(selector = %css, text_len, min = self.min_text_len, "Content candidate below threshold");
            }
        }
        None
    }
}

fn is_stripped(name: &str, strip: &[String]) -> bool {
    strip.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Visible text of `el` without the stripped subtrees, whitespace collapsed.
fn visible_text(el: ElementRef<'_>, strip: &[String]) -> String {
    fn collect(el: ElementRef<'_>, strip: &[String], out: &mut String) {
        for child in el.children() {
            match child.value() {
                Node::Text(t) => {
                    out.push_str(&**t);
                    out.push(' ');
                }
                Node::Element(e) if !is_stripped(e.name(), strip) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        collect(child_el, strip, out);
                    }
                }
                _ => {}
            }
        }
    }
    let mut raw = String::new();
    collect(el, strip, &mut raw);
    collapse_whitespace(&raw)
}

/// Serialize the children of `el` as HTML, omitting stripped subtrees and comments.
fn write_inner_html(el: ElementRef<'_>, strip: &[String], out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&partial_escape(&**t)),
            Node::Element(e) => {
                let name = e.name();
                if is_stripped(name, strip) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                out.push('<');
                out.push_str(name);
                for (key, value) in e.attrs() {
                    let _ = write!(out, " {}=\"{}\"", key, escape(value));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name) {
                    continue;
                }
                write_inner_html(child_el, strip, out);
                let _ = write!(out, "</{name}>");
            }
            _ => {}
        }
    }
}
