//! Feed documents as values.
//!
//! [`FeedAssembler`] turns records into a [`Feed`]; the RSS writer in
//! `outputs::rss` serializes it. Nothing here touches the filesystem.

pub mod assemble;
pub mod extensions;
pub mod guid;

use chrono::{DateTime, Utc};

pub use assemble::FeedAssembler;
pub use extensions::ItemExtensions;

/// Channel-level elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub last_build_date: DateTime<Utc>,
    pub generator: String,
}

/// One `<item>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub guid: String,
    pub author: String,
    pub category: Option<String>,
    pub extensions: Option<ItemExtensions>,
}

/// A complete feed, items newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub channel: Channel,
    pub items: Vec<FeedItem>,
}

impl Feed {
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
