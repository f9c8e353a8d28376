//! Predicates over an element's `class` attribute and the tree walks that use them.
//!
//! Listing markup is built from utility-class soup (`line-clamp-2`,
//! `text-TertiaryText`, `bn-flex`). Lookups are expressed as a tag filter
//! plus a [`ClassMatch`], evaluated against the raw class string.

use crate::utils::collapse_whitespace;
use regex::{Regex, RegexBuilder};
use scraper::ElementRef;

/// How a class attribute is matched.
#[derive(Debug, Clone)]
pub enum ClassMatch {
    /// Substring of the whole class attribute (CSS `[class*=...]`).
    Contains(String),
    /// Case-insensitive regex over the whole class attribute.
    Pattern(Regex),
    /// Matches every element, with or without a class.
    Any,
}

impl ClassMatch {
    pub fn contains(marker: impl Into<String>) -> Self {
        ClassMatch::Contains(marker.into())
    }

    /// Compile a case-insensitive class pattern.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(ClassMatch::Pattern)
    }

    pub fn matches(&self, el: &ElementRef<'_>) -> bool {
        if let ClassMatch::Any = self {
            return true;
        }
        let Some(class) = el.value().attr("class") else {
            return false;
        };
        match self {
            ClassMatch::Contains(marker) => class.contains(marker.as_str()),
            ClassMatch::Pattern(re) => re.is_match(class),
            ClassMatch::Any => true,
        }
    }
}

fn tag_allowed(el: &ElementRef<'_>, tags: &[&str]) -> bool {
    tags.is_empty() || tags.iter().any(|t| el.value().name().eq_ignore_ascii_case(t))
}

/// First descendant of `scope` (excluding `scope` itself), in document
/// order, whose tag is in `tags` (any tag when empty) and whose class
/// satisfies `class`.
pub fn find_first<'a>(scope: ElementRef<'a>, tags: &[&str], class: &ClassMatch) -> Option<ElementRef<'a>> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| tag_allowed(el, tags) && class.matches(el))
}

/// First direct child element with the given tag.
pub fn first_child<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name().eq_ignore_ascii_case(tag))
}

/// Nearest ancestor whose tag is in `tags`.
pub fn nearest_ancestor<'a>(el: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| tag_allowed(a, tags))
}

/// Visible text of an element with whitespace collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Non-empty, trimmed attribute value.
pub fn attr_of(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    const CARD: &str = r#"
        <div class="card">
          <a href="/blog/x">
            <div class="css-1 line-clamp-2 text-PrimaryText">  Hello
               World </div>
            <div class="text-TertiaryText"><div>2024-01-15</div><div>3 min</div></div>
          </a>
          <span class="Post-Category">Research</span>
          <time class="published" datetime="2024-01-15T10:00:00Z">Jan 15</time>
        </div>"#;

    fn with_anchor<T>(f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let doc = Html::parse_fragment(CARD);
        let sel = Selector::parse("a").unwrap();
        let anchor = doc.select(&sel).next().unwrap();
        f(anchor)
    }

    #[test]
    fn test_contains_matches_substring_of_class_string() {
        with_anchor(|a| {
            let el = find_first(a, &["div"], &ClassMatch::contains("line-clamp")).unwrap();
            assert_eq!(text_of(el), "Hello World");
        });
    }

    #[test]
    fn test_pattern_is_case_insensitive() {
        with_anchor(|a| {
            let card = nearest_ancestor(a, &["div", "article"]).unwrap();
            let cat = find_first(card, &["span"], &ClassMatch::pattern("category|tag").unwrap()).unwrap();
            assert_eq!(text_of(cat), "Research");
        });
    }

    #[test]
    fn test_first_child_and_attr() {
        with_anchor(|a| {
            let tertiary = find_first(a, &["div"], &ClassMatch::contains("text-TertiaryText")).unwrap();
            assert_eq!(text_of(first_child(tertiary, "div").unwrap()), "2024-01-15");

            let card = nearest_ancestor(a, &["div"]).unwrap();
            let time = find_first(card, &["time"], &ClassMatch::Any).unwrap();
            assert_eq!(attr_of(time, "datetime").as_deref(), Some("2024-01-15T10:00:00Z"));
            assert_eq!(attr_of(time, "missing"), None);
        });
    }

    #[test]
    fn test_find_first_excludes_scope_itself() {
        with_anchor(|a| {
            let card = nearest_ancestor(a, &["div"]).unwrap();
            assert!(find_first(card, &["div"], &ClassMatch::contains("card")).is_none());
        });
    }
}
