//! Local filesystem object store.
//!
//! Objects are flat files under a configurable root directory; the object
//! key is used directly as a relative path.  Attributes that the
//! filesystem cannot represent (content type, content encoding, a
//! pre-computed ETag) live in an optional JSON sidecar under
//! `<root>/.meta/<key>.json`; anything the sidecar omits is derived from
//! the file itself (size, mtime, MD5 ETag).

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use md5::{Digest, Md5};
use serde::Deserialize;

use super::store::{evaluate, ObjectMeta, ObjectResult, ObjectStore};
use crate::conditional::Conditional;
use crate::range::RangeSpec;

/// Sidecar attribute file contents.  Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct SidecarAttrs {
    etag: Option<String>,
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    cache_control: Option<String>,
}

/// Serves objects from the local filesystem.
pub struct LocalStore {
    /// Root directory for all stored objects.
    root: PathBuf,
}

impl LocalStore {
    /// Create a new `LocalStore` rooted at `root`.
    ///
    /// The directory will be created if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve an object key to an absolute file path.
    ///
    /// Validates that the resolved path stays within the root directory to
    /// prevent path traversal through crafted keys.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        for component in std::path::Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) | std::path::Component::CurDir => {}
                _ => anyhow::bail!("path traversal detected in object key: {}", key),
            }
        }
        let path = self.root.join(key);
        if path.exists() {
            let canonical_root = self
                .root
                .canonicalize()
                .unwrap_or_else(|_| self.root.clone());
            let canonical_path = path.canonicalize()?;
            if !canonical_path.starts_with(&canonical_root) {
                anyhow::bail!("path traversal detected in object key: {}", key);
            }
        }
        Ok(path)
    }

    /// Read the sidecar attribute file for `key`, if one exists.
    fn read_sidecar(&self, key: &str) -> SidecarAttrs {
        let path = self.root.join(".meta").join(format!("{key}.json"));
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "ignoring malformed sidecar attributes");
                SidecarAttrs::default()
            }),
            Err(_) => SidecarAttrs::default(),
        }
    }

    /// Compute the unquoted hex MD5 ETag for a byte slice.
    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

impl ObjectStore for LocalStore {
    fn get(
        &self,
        key: &str,
        conditional: Option<&Conditional>,
        range: Option<&RangeSpec>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectResult>> + Send + '_>> {
        let key = key.to_string();
        let conditional = conditional.cloned();
        let range = range.cloned();
        Box::pin(async move {
            let path = self.resolve(&key)?;

            if !path.is_file() {
                return Ok(ObjectResult::Missing);
            }

            let file_meta = std::fs::metadata(&path)?;
            let uploaded_at = file_meta.modified()?;
            let data = Bytes::from(std::fs::read(&path)?);

            let attrs = self.read_sidecar(&key);
            let etag = attrs
                .etag
                .unwrap_or_else(|| Self::compute_etag(&data));

            let meta = ObjectMeta {
                key,
                size: data.len() as u64,
                etag,
                uploaded_at,
                content_type: attrs.content_type,
                content_encoding: attrs.content_encoding,
                content_language: attrs.content_language,
                cache_control: attrs.cache_control,
            };

            Ok(evaluate(meta, data, conditional.as_ref(), range.as_ref()))
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = LocalStore::new(dir.path()).expect("failed to create store");
        (dir, store)
    }

    fn write_object(dir: &tempfile::TempDir, key: &str, data: &[u8]) {
        let path = dir.path().join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }

    fn write_sidecar(dir: &tempfile::TempDir, key: &str, json: &str) {
        let path = dir.path().join(".meta").join(format!("{key}.json"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, json).unwrap();
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, store) = test_store();
        match store.get("no-such-key", None, None).await.unwrap() {
            ObjectResult::Missing => {}
            other => panic!("expected missing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_with_derived_metadata() {
        let (dir, store) = test_store();
        write_object(&dir, "hello.txt", b"hello world");

        match store.get("hello.txt", None, None).await.unwrap() {
            ObjectResult::Body(obj) => {
                assert_eq!(obj.body.as_ref(), b"hello world");
                assert_eq!(obj.meta.size, 11);
                // Known MD5 of "hello world".
                assert_eq!(obj.meta.etag, "5eb63bbbe01eeed093cb22bb8f5acdc3");
                assert!(obj.meta.content_type.is_none());
            }
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sidecar_attributes_override_derived() {
        let (dir, store) = test_store();
        write_object(&dir, "videos/a.mp4", b"not really a video");
        write_sidecar(
            &dir,
            "videos/a.mp4",
            r#"{"etag": "v1-deadbeef", "content_type": "video/mp4"}"#,
        );

        match store.get("videos/a.mp4", None, None).await.unwrap() {
            ObjectResult::Body(obj) => {
                assert_eq!(obj.meta.etag, "v1-deadbeef");
                assert_eq!(obj.meta.content_type.as_deref(), Some("video/mp4"));
            }
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_sidecar_is_ignored() {
        let (dir, store) = test_store();
        write_object(&dir, "obj.bin", b"data");
        write_sidecar(&dir, "obj.bin", "{not json");

        match store.get("obj.bin", None, None).await.unwrap() {
            ObjectResult::Body(obj) => {
                // Falls back to the derived MD5 ETag.
                assert_eq!(obj.meta.etag.len(), 32);
            }
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nested_keys() {
        let (dir, store) = test_store();
        write_object(&dir, "a/b/c/deep.txt", b"nested content");

        match store.get("a/b/c/deep.txt", None, None).await.unwrap() {
            ObjectResult::Body(obj) => assert_eq!(obj.body.as_ref(), b"nested content"),
            other => panic!("expected body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let (_dir, store) = test_store();
        assert!(store.get("../etc/passwd", None, None).await.is_err());
        assert!(store.get("a/../../b", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_range_and_conditional_flow_through() {
        let (dir, store) = test_store();
        write_object(&dir, "doc.txt", b"0123456789");

        let spec = RangeSpec::Suffix(4);
        match store.get("doc.txt", None, Some(&spec)).await.unwrap() {
            ObjectResult::Body(obj) => {
                assert_eq!(obj.body.as_ref(), b"6789");
                assert_eq!(obj.meta.size, 10);
            }
            other => panic!("expected body, got {other:?}"),
        }

        let etag = "781e5e245d69b566979b86e28d23f2c7"; // MD5 of "0123456789"
        let cond = Conditional {
            etag_does_not_match: Some(etag.to_string()),
            ..Default::default()
        };
        match store.get("doc.txt", Some(&cond), None).await.unwrap() {
            ObjectResult::Metadata(meta) => assert_eq!(meta.etag, etag),
            other => panic!("expected metadata, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_encoded_object_declines_range() {
        let (dir, store) = test_store();
        write_object(&dir, "bundle.js", b"gzipped-payload");
        write_sidecar(&dir, "bundle.js", r#"{"content_encoding": "gzip"}"#);

        let spec = RangeSpec::Bounded(0, 4);
        match store.get("bundle.js", None, Some(&spec)).await.unwrap() {
            ObjectResult::Metadata(meta) => {
                assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
            }
            other => panic!("expected metadata, got {other:?}"),
        }
    }
}
