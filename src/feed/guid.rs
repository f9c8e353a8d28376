//! Stable item identifiers.

use crate::models::ArticleRecord;
use sha2::{Digest, Sha256};

/// GUID for a link: the first 16 bytes of its SHA-256, lowercase hex.
///
/// Depends on the link only, so a re-run that picks up edited content
/// still produces the same identifier.
pub fn guid_for(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    hex::encode(&digest[..16])
}

/// The upstream GUID when the source supplied one, else [`guid_for`] the link.
pub fn record_guid(record: &ArticleRecord) -> String {
    record
        .upstream_guid
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| guid_for(&record.link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleSource;

    #[test]
    fn test_guid_is_deterministic_and_link_only() {
        let link = "https://example.com/blog/my-post-1";
        let a = guid_for(link);
        assert_eq!(a, guid_for(link));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, guid_for("https://example.com/blog/my-post-2"));

        let mut r = ArticleRecord::new("T", link, TitleSource::AnchorText);
        let before = record_guid(&r);
        r.content = Some("edited body".to_string());
        r.title = "Edited".to_string();
        assert_eq!(record_guid(&r), before);
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        assert_eq!(guid_for("abc"), "ba7816bf8f01cfea414140de5dae2223");
    }

    #[test]
    fn test_upstream_guid_used_verbatim() {
        let mut r = ArticleRecord::new("T", "https://example.com/a", TitleSource::Upstream);
        r.upstream_guid = Some("tag:example.com,2024:42".to_string());
        assert_eq!(record_guid(&r), "tag:example.com,2024:42");

        r.upstream_guid = Some("  ".to_string());
        assert_eq!(record_guid(&r), guid_for("https://example.com/a"));
    }
}
