//! Conditional request parsing and evaluation.
//!
//! The four conditional headers (`If-None-Match`, `If-Match`,
//! `If-Modified-Since`, `If-Unmodified-Since`) are folded into a
//! [`Conditional`] with up to four independent predicates.  Unparseable
//! header values are treated as absent; a request with none of the four
//! headers has no conditional at all, which is distinct from a conditional
//! whose predicates all pass.
//!
//! Evaluation order is fixed: not-modified predicates strictly before
//! precondition-failed predicates, and within each pair the ETag predicate
//! before the date predicate.  The first predicate that triggers decides
//! the outcome.

use std::time::{Duration, SystemTime};

use axum::http::HeaderMap;

/// Structured conditional specification for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditional {
    /// From `If-None-Match`, quoting stripped.
    pub etag_does_not_match: Option<String>,
    /// From `If-Match`, quoting stripped.
    pub etag_matches: Option<String>,
    /// From `If-Modified-Since`, parsed time plus one second.
    pub uploaded_after: Option<SystemTime>,
    /// From `If-Unmodified-Since`, parsed as-is.
    pub uploaded_before: Option<SystemTime>,
}

/// Outcome of a conditional short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    /// 304 Not Modified.
    NotModified,
    /// 412 Precondition Failed.
    PreconditionFailed,
}

/// Parse the conditional headers into a [`Conditional`], if any are
/// present and usable.
pub fn try_parse(headers: &HeaderMap) -> Option<Conditional> {
    let etag_does_not_match = header_str(headers, "if-none-match")
        .map(|v| strip_etag_quoting(v).to_string());

    let etag_matches =
        header_str(headers, "if-match").map(|v| strip_etag_quoting(v).to_string());

    // HTTP dates have whole-second precision while upload times may not.
    // The one-second bump absorbs truncation when a client echoes back a
    // formatted Last-Modified value.
    let uploaded_after = header_str(headers, "if-modified-since")
        .and_then(|v| httpdate::parse_http_date(v).ok())
        .map(|t| t + Duration::from_secs(1));

    let uploaded_before = header_str(headers, "if-unmodified-since")
        .and_then(|v| httpdate::parse_http_date(v).ok());

    let conditional = Conditional {
        etag_does_not_match,
        etag_matches,
        uploaded_after,
        uploaded_before,
    };

    if conditional == Conditional::default() {
        None
    } else {
        Some(conditional)
    }
}

impl Conditional {
    /// Evaluate this conditional against an object's validators.
    ///
    /// `etag` may be quoted or unquoted; the same unquoting convention is
    /// applied to both sides of the comparison.  Returns the first
    /// triggered outcome in the fixed order, or `None` when every present
    /// predicate allows the body to be served.
    pub fn short_circuit(&self, etag: &str, uploaded_at: SystemTime) -> Option<ShortCircuit> {
        let etag = strip_etag_quoting(etag);

        if let Some(value) = &self.etag_does_not_match {
            if value == etag {
                return Some(ShortCircuit::NotModified);
            }
        }
        if let Some(threshold) = self.uploaded_after {
            if uploaded_at > threshold {
                return Some(ShortCircuit::NotModified);
            }
        }
        if let Some(value) = &self.etag_matches {
            if value != etag {
                return Some(ShortCircuit::PreconditionFailed);
            }
        }
        if let Some(threshold) = self.uploaded_before {
            if uploaded_at >= threshold {
                return Some(ShortCircuit::PreconditionFailed);
            }
        }
        None
    }
}

/// Strip an optional weak-validator marker and surrounding quotes from an
/// ETag header value.  Values that are not fully quoted pass through
/// unchanged.
pub fn strip_etag_quoting(value: &str) -> &str {
    let value = value.trim();
    let inner = value.strip_prefix("W/").unwrap_or(value);
    match inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(stripped) => stripped,
        None => value,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

// -- Tests -------------------------------------------------------------------
