//! Small string and filesystem helpers.
//!
//! - String truncation for logs and feed descriptions
//! - Whitespace collapsing for text pulled out of markup
//! - Title-casing for titles rebuilt from URL slugs
//! - Parent directory creation for output files

use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a byte
/// count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Keep the first `max` characters, appending `suffix` only if something was cut.
pub fn truncate_chars(s: &str, max: usize, suffix: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalize the first character of a string and lowercase the rest.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
    }
}

/// Turn a URL slug into a readable title.
///
/// ```ignore
/// assert_eq!(title_from_slug("my-cool-post"), "My Cool Post");
/// ```
pub fn title_from_slug(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(upcase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Make sure the directory that will hold `path` exists.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            debug!(dir = %parent.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "币安博客文章";
        assert_eq!(truncate_for_log(s, 2), "币安…(+12 bytes)");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_chars("abc", 3, "..."), "abc");
        assert_eq!(truncate_chars("", 3, "..."), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Hello \n\t World  "), "Hello World");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("hello"), "Hello");
        assert_eq!(upcase("wORLD"), "World");
        assert_eq!(upcase(""), "");
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("my-cool-post"), "My Cool Post");
        assert_eq!(title_from_slug("bitcoin_etf--update"), "Bitcoin Etf Update");
        assert_eq!(title_from_slug(""), "");
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("feeds/nested/out.xml");
        ensure_parent_dir(&target).await.unwrap();
        assert!(tmp.path().join("feeds/nested").is_dir());
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_bare_filename() {
        ensure_parent_dir(Path::new("out.xml")).await.unwrap();
    }
}
