//! HTTP cache validation module
//!
//! Validators derived from file metadata and conditional request checks.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// IMF-fixdate layout used by `Last-Modified` and `If-Modified-Since`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Weak `ETag` from size and modification time, e.g. `W/"1f4-65a1b2c3"`
///
/// Computed without reading the file so that 304s stay cheap.
pub fn weak_etag(len: u64, modified: Option<SystemTime>) -> String {
    let secs = modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    format!("W/\"{len:x}-{secs:x}\"")
}

/// Format a timestamp as an HTTP date
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date (IMF-fixdate or RFC 2822)
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single `ETag`, a comma-separated list and the `*` wildcard.
/// Comparison is weak: `W/` prefixes are ignored on both sides.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let etag = etag.trim_start_matches("W/");
    if_none_match.is_some_and(|client| {
        client.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/") == etag
        })
    })
}

/// Whether the resource is unchanged since the client's `If-Modified-Since`
///
/// HTTP dates have one-second resolution, so sub-second parts are dropped.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: Option<SystemTime>) -> bool {
    let (Some(header), Some(modified)) = (if_modified_since, modified) else {
        return false;
    };
    let Some(since) = parse_http_date(header) else {
        return false;
    };
    let secs = |t: SystemTime| t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    secs(modified) <= secs(since)
}
