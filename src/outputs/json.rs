//! JSON dump of a pipeline's final records.
//!
//! Optional, for debugging extraction: the records are written exactly as
//! they were handed to the feed assembler, with `title_source` showing which
//! cascade step produced each title.

use crate::error::FeedError;
use crate::models::ArticleRecord;
use crate::utils::ensure_parent_dir;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `records` as pretty-printed JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display(), records = records.len()))]
pub async fn write_records(records: &[ArticleRecord], path: &Path) -> Result<(), FeedError> {
    let json = serde_json::to_string_pretty(records)?;
    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;
    info!("Wrote JSON record dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleSource;

    #[tokio::test]
    async fn test_dump_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug").join("records.json");
        let mut r = ArticleRecord::new("My Cool Post", "https://example.com/blog/my-cool-post", TitleSource::Synthesized);
        r.content = Some("<p>x</p>".to_string());

        write_records(std::slice::from_ref(&r), &path).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"title_source\": \"synthesized\""));
        let back: Vec<ArticleRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, vec![r]);
    }
}
