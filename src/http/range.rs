//! HTTP Range request parsing module
//!
//! Single byte-range parsing for resumable downloads, following RFC 7233.
//! Multi-range requests are answered with the full content.

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[inline]
    pub const fn len(self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// What the `Range` header asks for
#[derive(Debug, PartialEq, Eq)]
pub enum RangeSpec {
    /// No usable Range header: send everything
    Full,
    /// One satisfiable range: 206
    Partial(ByteRange),
    /// Syntactically valid but outside the file: 416
    Unsatisfiable,
}

/// Parse a `Range` header against a file of `size` bytes
///
/// Supported forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`.
///
/// # Examples
/// ```
/// use tryfiles::http::range::{parse_range_header, ByteRange, RangeSpec};
///
/// assert_eq!(
///     parse_range_header(Some("bytes=0-99"), 1000),
///     RangeSpec::Partial(ByteRange { start: 0, end: 99 })
/// );
/// assert_eq!(parse_range_header(None, 1000), RangeSpec::Full);
/// ```
pub fn parse_range_header(range_header: Option<&str>, size: u64) -> RangeSpec {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeSpec::Full;
    };

    if spec.contains(',') {
        return RangeSpec::Full;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeSpec::Full;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix_range(end_str, size);
    }
    parse_standard_range(start_str, end_str, size)
}

/// `-500`: the last 500 bytes
fn parse_suffix_range(suffix_str: &str, size: u64) -> RangeSpec {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeSpec::Full;
    };
    if suffix == 0 || size == 0 {
        return RangeSpec::Unsatisfiable;
    }
    RangeSpec::Partial(ByteRange {
        start: size.saturating_sub(suffix),
        end: size - 1,
    })
}

/// `0-99` or `100-`
fn parse_standard_range(start_str: &str, end_str: &str, size: u64) -> RangeSpec {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeSpec::Full;
    };
    if start >= size {
        return RangeSpec::Unsatisfiable;
    }

    let end = if end_str.is_empty() {
        size - 1
    } else {
        let Ok(end) = end_str.parse::<u64>() else {
            return RangeSpec::Full;
        };
        if end < start {
            return RangeSpec::Full;
        }
        end.min(size - 1)
    };

    RangeSpec::Partial(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_header(None, 100), RangeSpec::Full);
        assert_eq!(parse_range_header(Some("items=0-1"), 100), RangeSpec::Full);
    }

    #[test]
    fn test_standard_range() {
        let RangeSpec::Partial(r) = parse_range_header(Some("bytes=0-9"), 100) else {
            panic!("Expected Partial");
        };
        assert_eq!((r.start, r.end, r.len()), (0, 9, 10));
        assert_eq!(r.content_range(100), "bytes 0-9/100");
    }

    #[test]
    fn test_open_and_clamped_range() {
        assert_eq!(
            parse_range_header(Some("bytes=50-"), 100),
            RangeSpec::Partial(ByteRange { start: 50, end: 99 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=90-500"), 100),
            RangeSpec::Partial(ByteRange { start: 90, end: 99 })
        );
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(
            parse_range_header(Some("bytes=-20"), 100),
            RangeSpec::Partial(ByteRange { start: 80, end: 99 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=-500"), 100),
            RangeSpec::Partial(ByteRange { start: 0, end: 99 })
        );
    }

    #[test]
    fn test_unsatisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeSpec::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeSpec::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=0-"), 0),
            RangeSpec::Unsatisfiable
        );
    }

    #[test]
    fn test_malformed_is_ignored() {
        assert_eq!(parse_range_header(Some("bytes=a-b"), 100), RangeSpec::Full);
        assert_eq!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeSpec::Full
        );
        assert_eq!(parse_range_header(Some("bytes=9-3"), 100), RangeSpec::Full);
    }
}
