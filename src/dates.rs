//! Publish date normalization.
//!
//! Listing pages and upstream feeds carry dates in whatever shape the site
//! chose. [`normalize_date_at`] turns any string into a UTC instant and never
//! fails: when nothing parses it logs the input and returns the current
//! time, because every feed item needs a valid `pubDate`.
//!
//! Order of attempts:
//! 1. An embedded ISO-like `YYYY-MM-DD[T ]HH:MM:SS` substring, honoring a
//!    trailing `Z` or numeric offset when one is attached.
//! 2. RFC 2822 (the RSS date format).
//! 3. Datetime patterns with and without a zone.
//! 4. Date-only patterns: ISO, US slash, long-form month names.
//!
//! Values without an explicit zone are taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static ISO_SUBSTRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2}:\d{2})(?:\.\d+)?(Z|[+-]\d{2}:?\d{2})?")
        .unwrap()
});

const ZONED_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %e %b %Y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%a, %d %b %Y %H:%M:%S GMT",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a date string, returning `None` when no known pattern matches.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = parse_iso_substring(s) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Normalize a date string, substituting `now` when it is empty or unparseable.
///
/// Taking the clock as an argument lets one assembly pass give every
/// undated record the same instant.
pub fn normalize_date_at(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    if raw.trim().is_empty() {
        return now;
    }
    match parse_date(raw) {
        Some(dt) => dt,
        None => {
            warn!(raw = %raw, "Unparseable date; using current time");
            now
        }
    }
}

fn parse_iso_substring(s: &str) -> Option<DateTime<Utc>> {
    let caps = ISO_SUBSTRING.captures(s)?;
    let stamp = format!("{} {}", &caps[1], &caps[2]);
    let naive = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").ok()?;

    match caps.get(3).map(|m| m.as_str()) {
        None | Some("Z") => Some(Utc.from_utc_datetime(&naive)),
        Some(zone) => {
            let offset = parse_offset(zone)?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        assert_eq!(parse_date("2024-01-15"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(
            normalize_date_at("2024-01-15", Utc::now()).to_rfc3339(),
            "2024-01-15T00:00:00+00:00"
        );
    }

    #[test]
    fn test_garbage_falls_back_to_now() {
        let before = Utc::now();
        let dt = normalize_date_at("garbage", Utc::now());
        let after = Utc::now();
        assert!(dt >= before - Duration::seconds(1) && dt <= after + Duration::seconds(1));
    }

    #[test]
    fn test_empty_returns_supplied_now() {
        let now = utc(2030, 5, 5, 5, 5, 5);
        assert_eq!(normalize_date_at("", now), now);
        assert_eq!(normalize_date_at("   ", now), now);
        assert_eq!(normalize_date_at("not a date", now), now);
    }

    #[test]
    fn test_embedded_iso_substring() {
        assert_eq!(
            parse_date("Published: 2024-03-10T08:30:00 by staff"),
            Some(utc(2024, 3, 10, 8, 30, 0))
        );
        assert_eq!(
            parse_date("2024-03-10 08:30:00"),
            Some(utc(2024, 3, 10, 8, 30, 0))
        );
    }

    #[test]
    fn test_iso_with_offset_is_converted() {
        assert_eq!(
            parse_date("2024-03-10T08:30:00+08:00"),
            Some(utc(2024, 3, 10, 0, 30, 0))
        );
        assert_eq!(
            parse_date("2024-03-10T08:30:00.123Z"),
            Some(utc(2024, 3, 10, 8, 30, 0))
        );
        assert_eq!(
            parse_date("2024-03-10T08:30:00-0500"),
            Some(utc(2024, 3, 10, 13, 30, 0))
        );
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            parse_date("Mon, 15 Jan 2024 10:00:00 +0000"),
            Some(utc(2024, 1, 15, 10, 0, 0))
        );
        assert_eq!(
            parse_date("Mon, 15 Jan 2024 10:00:00 GMT"),
            Some(utc(2024, 1, 15, 10, 0, 0))
        );
    }

    #[test]
    fn test_us_and_long_form() {
        assert_eq!(parse_date("01/15/2024"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_date("January 15, 2024"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_date("Jan 15, 2024"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_date("15 January 2024"), Some(utc(2024, 1, 15, 0, 0, 0)));
    }

    #[test]
    fn test_normalize_is_total() {
        let now = utc(2030, 1, 1, 0, 0, 0);
        for input in ["", "\u{0}", "2024-13-45", "9999-99-99T99:99:99", "🙂", "  2024  "] {
            let _ = normalize_date_at(input, now);
        }
    }
}
