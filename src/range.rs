//! Byte-range request parsing and Content-Range computation.
//!
//! Only the single-range byte form `bytes=<start>-<end>` is recognized,
//! with either bound optionally empty.  Anything else — multi-range
//! syntax, other units, zero-length or inverted spans — degrades to "no
//! range" and the request falls back to a full response.  This mirrors
//! HTTP's lenient treatment of unusable Range headers and must not be
//! tightened into strict validation.

use axum::http::HeaderMap;

/// Parsed byte range from a Range header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// bytes=start-  (from start to end of object)
    Offset(u64),
    /// bytes=-N  (last N bytes)
    Suffix(u64),
    /// bytes=start-end, stored as (start, length) with length > 0
    Bounded(u64, u64),
}

/// Parse the Range header into a [`RangeSpec`], if one is present and
/// usable.  Returns `None` for absent, malformed, multi-range, or
/// empty-span headers.
pub fn try_parse(headers: &HeaderMap) -> Option<RangeSpec> {
    let value = headers.get("range")?.to_str().ok()?;
    parse_range_value(value)
}

/// Parse a Range header value like "bytes=0-4", "bytes=5-", "bytes=-3".
fn parse_range_value(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?;

    // Only a single range (no multi-range).
    if spec.contains(',') {
        return None;
    }

    let (start_s, end_s) = spec.split_once('-')?;
    match (start_s.is_empty(), end_s.is_empty()) {
        (true, false) => {
            let n: u64 = end_s.parse().ok()?;
            // A zero-byte suffix is an empty span.
            if n == 0 {
                return None;
            }
            Some(RangeSpec::Suffix(n))
        }
        (false, true) => {
            let start: u64 = start_s.parse().ok()?;
            Some(RangeSpec::Offset(start))
        }
        (false, false) => {
            let start: u64 = start_s.parse().ok()?;
            let end: u64 = end_s.parse().ok()?;
            if end < start {
                return None;
            }
            Some(RangeSpec::Bounded(start, end - start + 1))
        }
        (true, true) => None,
    }
}

/// Resolve a [`RangeSpec`] against the object's total size.
///
/// Returns the effective `(start, end_exclusive)` span, or `None` when the
/// range cannot be satisfied (offset past the end, empty object) — callers
/// treat `None` as "no range" and serve the full body.  Spans that
/// overshoot the object are clamped.
pub fn resolve(spec: &RangeSpec, total_size: u64) -> Option<(u64, u64)> {
    if total_size == 0 {
        return None;
    }
    match spec {
        RangeSpec::Offset(start) => {
            if *start >= total_size {
                return None;
            }
            Some((*start, total_size))
        }
        RangeSpec::Suffix(n) => {
            let start = total_size.saturating_sub(*n);
            Some((start, total_size))
        }
        RangeSpec::Bounded(start, length) => {
            if *start >= total_size {
                return None;
            }
            let end = std::cmp::min(start + length, total_size);
            Some((*start, end))
        }
    }
}

/// Render the `Content-Range` header value for a resolved span.
///
/// The span must be exactly what the store returned; this function only
/// formats, it never re-slices.
pub fn content_range(start: u64, end_exclusive: u64, total_size: u64) -> String {
    format!("bytes {}-{}/{}", start, end_exclusive - 1, total_size)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_range(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("range", HeaderValue::from_static(value));
        headers
    }

    // -- Parsing --------------------------------------------------------------

    #[test]
    fn test_parse_bounded() {
        assert_eq!(
            parse_range_value("bytes=0-4"),
            Some(RangeSpec::Bounded(0, 5))
        );
        assert_eq!(
            parse_range_value("bytes=100-199"),
            Some(RangeSpec::Bounded(100, 100))
        );
        // Single byte.
        assert_eq!(
            parse_range_value("bytes=7-7"),
            Some(RangeSpec::Bounded(7, 1))
        );
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_range_value("bytes=5-"), Some(RangeSpec::Offset(5)));
        assert_eq!(parse_range_value("bytes=0-"), Some(RangeSpec::Offset(0)));
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(parse_range_value("bytes=-3"), Some(RangeSpec::Suffix(3)));
        assert_eq!(
            parse_range_value("bytes=-100"),
            Some(RangeSpec::Suffix(100))
        );
    }

    #[test]
    fn test_parse_invalid_degrades_to_none() {
        // end < start is an empty span, not an error.
        assert_eq!(parse_range_value("bytes=10-5"), None);
        assert_eq!(parse_range_value("bytes=-0"), None);
        assert_eq!(parse_range_value("bytes=-"), None);
        assert_eq!(parse_range_value(""), None);
        assert_eq!(parse_range_value("chars=0-4"), None);
        assert_eq!(parse_range_value("bytes=abc-def"), None);
        // Multi-range is not recognized.
        assert_eq!(parse_range_value("bytes=0-4,6-8"), None);
    }

    #[test]
    fn test_try_parse_from_headers() {
        assert_eq!(
            try_parse(&headers_with_range("bytes=0-9")),
            Some(RangeSpec::Bounded(0, 10))
        );
        assert_eq!(try_parse(&headers_with_range("bytes=10-5")), None);
        assert_eq!(try_parse(&HeaderMap::new()), None);
    }

    // -- Resolution -----------------------------------------------------------

    #[test]
    fn test_resolve_bounded() {
        assert_eq!(resolve(&RangeSpec::Bounded(0, 5), 16), Some((0, 5)));
        // Overshooting length clamps to the object size.
        assert_eq!(resolve(&RangeSpec::Bounded(0, 100), 16), Some((0, 16)));
        // Start past the end is unsatisfiable.
        assert_eq!(resolve(&RangeSpec::Bounded(20, 5), 16), None);
    }

    #[test]
    fn test_resolve_offset() {
        assert_eq!(resolve(&RangeSpec::Offset(5), 16), Some((5, 16)));
        assert_eq!(resolve(&RangeSpec::Offset(16), 16), None);
    }

    #[test]
    fn test_resolve_suffix() {
        assert_eq!(resolve(&RangeSpec::Suffix(5), 16), Some((11, 16)));
        // Suffix larger than the object clamps to the whole object.
        assert_eq!(resolve(&RangeSpec::Suffix(100), 16), Some((0, 16)));
    }

    #[test]
    fn test_resolve_empty_object() {
        assert_eq!(resolve(&RangeSpec::Bounded(0, 5), 0), None);
        assert_eq!(resolve(&RangeSpec::Offset(0), 0), None);
        assert_eq!(resolve(&RangeSpec::Suffix(5), 0), None);
    }

    // -- Content-Range rendering ----------------------------------------------

    #[test]
    fn test_content_range_bounded() {
        // Bounded(start, length) renders bytes start-(start+length-1)/size.
        let (start, end) = resolve(&RangeSpec::Bounded(100, 100), 1000).unwrap();
        assert_eq!(content_range(start, end, 1000), "bytes 100-199/1000");
    }

    #[test]
    fn test_content_range_suffix() {
        // Suffix(n) starts at size-n and ends at size-1.
        let (start, end) = resolve(&RangeSpec::Suffix(16), 1000).unwrap();
        assert_eq!(start, 984);
        assert_eq!(content_range(start, end, 1000), "bytes 984-999/1000");
    }

    #[test]
    fn test_content_range_offset() {
        let (start, end) = resolve(&RangeSpec::Offset(990), 1000).unwrap();
        assert_eq!(content_range(start, end, 1000), "bytes 990-999/1000");
    }
}
