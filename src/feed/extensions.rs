//! `dc:` and `content:` extension elements for feed items.
//!
//! Each item's extensions are computed from the very record the item was
//! built from, so sorting never pairs an item with another record's body,
//! even when two records share a link.

use crate::models::ArticleRecord;
use quick_xml::escape::escape;

/// Values for `dc:identifier`, `dc:creator` and `content:encoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemExtensions {
    pub identifier: String,
    pub creator: String,
    /// HTML for `content:encoded`; empty when the record has no body.
    pub content_encoded: String,
}

impl ItemExtensions {
    pub fn from_record(record: &ArticleRecord, default_author: &str) -> Self {
        let creator = record
            .author
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(default_author)
            .to_string();
        Self {
            identifier: record.link.clone(),
            creator,
            content_encoded: record.content.as_deref().map(to_html).unwrap_or_default(),
        }
    }
}

/// Body as HTML. Content that already starts with a tag is passed through;
/// plain text is escaped and each line becomes its own paragraph.
pub fn to_html(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('<') {
        return content.to_string();
    }
    format!("<p>{}</p>", escape(content).replace('\n', "</p><p>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleSource;

    #[test]
    fn test_plain_text_becomes_paragraphs() {
        assert_eq!(to_html("first line\nsecond & third"), "<p>first line</p><p>second &amp; third</p>");
    }

    #[test]
    fn test_markup_passes_through() {
        let html = "<p>Already <b>HTML</b></p>";
        assert_eq!(to_html(html), html);
        assert_eq!(to_html("  \n "), "");
    }

    #[test]
    fn test_creator_falls_back_to_default_author() {
        let mut r = ArticleRecord::new("T", "https://example.com/a", TitleSource::AnchorText);
        let ext = ItemExtensions::from_record(&r, "Binance Blog");
        assert_eq!(ext.creator, "Binance Blog");
        assert_eq!(ext.identifier, "https://example.com/a");
        assert_eq!(ext.content_encoded, "");

        r.author = Some("Jane".to_string());
        assert_eq!(ItemExtensions::from_record(&r, "Binance Blog").creator, "Jane");
    }
}
