//! RSS 2.0 serialization.
//!
//! The whole document, extension elements included, is written in a single
//! pass with a `quick_xml::Writer`. The `dc` and `content` prefixes are
//! declared once, on `<rss>`.
//!
//! ```text
//! <rss version="2.0" xmlns:dc="…" xmlns:content="…">
//!   <channel>
//!     title, link, description, language, lastBuildDate, generator
//!     <item>
//!       title, link, description, pubDate, guid, author, category?,
//!       dc:identifier, dc:creator, content:encoded
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::error::FeedError;
use crate::feed::{Feed, FeedItem};
use crate::utils::ensure_parent_dir;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

/// Drop characters XML 1.0 does not allow anywhere, such as stray control bytes.
fn xml_chars(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<(), FeedError> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&xml_chars(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_item<W: Write>(w: &mut Writer<W>, item: &FeedItem) -> Result<(), FeedError> {
    w.write_event(Event::Start(BytesStart::new("item")))?;
    text_element(w, "title", &item.title)?;
    text_element(w, "link", &item.link)?;
    text_element(w, "description", &item.description)?;
    text_element(w, "pubDate", &item.pub_date.to_rfc2822())?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    w.write_event(Event::Start(guid))?;
    w.write_event(Event::Text(BytesText::new(&xml_chars(&item.guid))))?;
    w.write_event(Event::End(BytesEnd::new("guid")))?;

    text_element(w, "author", &item.author)?;
    if let Some(category) = &item.category {
        text_element(w, "category", category)?;
    }

    if let Some(ext) = &item.extensions {
        text_element(w, "dc:identifier", &ext.identifier)?;
        text_element(w, "dc:creator", &ext.creator)?;
        text_element(w, "content:encoded", &ext.content_encoded)?;
    }

    w.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

/// Serialize a feed to UTF-8 XML bytes.
pub fn render_feed(feed: &Feed) -> Result<Vec<u8>, FeedError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:dc", DC_NS));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let ch = &feed.channel;
    text_element(&mut writer, "title", &ch.title)?;
    text_element(&mut writer, "link", &ch.link)?;
    text_element(&mut writer, "description", &ch.description)?;
    text_element(&mut writer, "language", &ch.language)?;
    text_element(&mut writer, "lastBuildDate", &ch.last_build_date.to_rfc2822())?;
    text_element(&mut writer, "generator", &ch.generator)?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Write the feed to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display(), items = feed.len()))]
pub async fn write_feed(feed: &Feed, path: &Path) -> Result<(), FeedError> {
    let bytes = render_feed(feed)?;
    ensure_parent_dir(path).await?;
    fs::write(path, &bytes).await?;
    info!(bytes = bytes.len(), "Wrote RSS feed");
    Ok(())
}
