//! Abstract object store contract.
//!
//! Every storage backend must implement [`ObjectStore`].  The store is
//! conditional- and range-aware: it evaluates the caller's conditional
//! against the object's validators and slices the body when a range is
//! satisfiable, so the gateway never re-slices data it receives.

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;

use crate::conditional::Conditional;
use crate::range::{self, RangeSpec};

/// Metadata describing one stored object.
///
/// `size` is always the object's total size, even when the accompanying
/// body is a range slice; `etag` is stored unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key.
    pub key: String,
    /// Total object size in bytes.
    pub size: u64,
    /// Unquoted entity tag.
    pub etag: String,
    /// Upload / last-modified time.
    pub uploaded_at: SystemTime,
    /// MIME type, if recorded.
    pub content_type: Option<String>,
    /// Content coding (e.g. `gzip`) the stored bytes are in, if any.
    pub content_encoding: Option<String>,
    /// Content language, if recorded.
    pub content_language: Option<String>,
    /// Cache-Control value, if recorded.
    pub cache_control: Option<String>,
}

impl ObjectMeta {
    /// The quoted form of the entity tag, as it appears on the wire.
    pub fn http_etag(&self) -> String {
        format!("\"{}\"", self.etag)
    }
}

/// An object's metadata together with its (possibly range-sliced) body.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub meta: ObjectMeta,
    pub body: Bytes,
}

/// Result of an [`ObjectStore::get`] call.
#[derive(Debug, Clone)]
pub enum ObjectResult {
    /// Predicates (if any) were satisfied; the body reflects the requested
    /// range when the store honored it, otherwise the full object.
    Body(StoredObject),
    /// The object exists but no body is returned: a conditional
    /// short-circuited, or the range could not be honored together with
    /// the object's content encoding.
    Metadata(ObjectMeta),
    /// The object does not exist.
    Missing,
}

/// Async object store contract consumed by the gateway.
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch `key`, applying the conditional and range modifiers.
    fn get(
        &self,
        key: &str,
        conditional: Option<&Conditional>,
        range: Option<&RangeSpec>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectResult>> + Send + '_>>;
}

/// Shared request-evaluation path for backends that hold the full object
/// bytes: conditional short-circuit first, then the range-vs-encoding
/// decline, then range slicing.
pub(crate) fn evaluate(
    meta: ObjectMeta,
    data: Bytes,
    conditional: Option<&Conditional>,
    range: Option<&RangeSpec>,
) -> ObjectResult {
    if let Some(cond) = conditional {
        if cond.short_circuit(&meta.etag, meta.uploaded_at).is_some() {
            return ObjectResult::Metadata(meta);
        }
    }

    if let Some(spec) = range {
        // Byte offsets are meaningless against an encoded representation;
        // decline the range and let the gateway re-fetch without it.
        if meta.content_encoding.is_some() {
            return ObjectResult::Metadata(meta);
        }
        if let Some((start, end)) = range::resolve(spec, meta.size) {
            let body = data.slice(start as usize..end as usize);
            return ObjectResult::Body(StoredObject { meta, body });
        }
        // Unsatisfiable ranges degrade to the full body.
    }

    ObjectResult::Body(StoredObject { meta, body: data })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn meta(encoding: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            key: "videos/a.mp4".to_string(),
            size: 16,
            etag: "abc123".to_string(),
            uploaded_at: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            content_type: Some("video/mp4".to_string()),
            content_encoding: encoding.map(|s| s.to_string()),
            content_language: None,
            cache_control: None,
        }
    }

    #[test]
    fn test_http_etag_is_quoted() {
        assert_eq!(meta(None).http_etag(), "\"abc123\"");
    }

    #[test]
    fn test_evaluate_full_body() {
        let data = Bytes::from_static(b"0123456789abcdef");
        match evaluate(meta(None), data.clone(), None, None) {
            ObjectResult::Body(obj) => assert_eq!(obj.body, data),
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_slices_range() {
        let data = Bytes::from_static(b"0123456789abcdef");
        let spec = RangeSpec::Bounded(4, 4);
        match evaluate(meta(None), data, None, Some(&spec)) {
            ObjectResult::Body(obj) => {
                assert_eq!(obj.body.as_ref(), b"4567");
                // Size stays the total size.
                assert_eq!(obj.meta.size, 16);
            }
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_declines_range_on_encoded_object() {
        let data = Bytes::from_static(b"0123456789abcdef");
        let spec = RangeSpec::Bounded(4, 4);
        match evaluate(meta(Some("gzip")), data, None, Some(&spec)) {
            ObjectResult::Metadata(m) => assert_eq!(m.content_encoding.as_deref(), Some("gzip")),
            other => panic!("expected metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_unsatisfiable_range_serves_full_body() {
        let data = Bytes::from_static(b"0123456789abcdef");
        let spec = RangeSpec::Offset(100);
        match evaluate(meta(None), data.clone(), None, Some(&spec)) {
            ObjectResult::Body(obj) => assert_eq!(obj.body, data),
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_conditional_short_circuit_wins_over_range() {
        let data = Bytes::from_static(b"0123456789abcdef");
        let cond = Conditional {
            etag_does_not_match: Some("abc123".to_string()),
            ..Default::default()
        };
        let spec = RangeSpec::Bounded(0, 4);
        match evaluate(meta(None), data, Some(&cond), Some(&spec)) {
            ObjectResult::Metadata(m) => assert_eq!(m.etag, "abc123"),
            other => panic!("expected metadata, got {other:?}"),
        }
    }
}
