//! In-memory object store.
//!
//! Objects are held in a `tokio::sync::RwLock<HashMap<...>>` map.  Useful
//! for development and as the deterministic store behind the gateway's
//! tests; the seeding API is not part of the gateway contract.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;
use md5::{Digest, Md5};

use super::store::{evaluate, ObjectMeta, ObjectResult, ObjectStore};
use crate::conditional::Conditional;
use crate::range::RangeSpec;

/// Optional attributes attached to a seeded object.
#[derive(Debug, Clone, Default)]
pub struct ObjectAttrs {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
}

struct Entry {
    data: Bytes,
    etag: String,
    uploaded_at: SystemTime,
    attrs: ObjectAttrs,
}

/// In-memory store: key -> object bytes plus attributes.
#[derive(Default)]
pub struct MemoryStore {
    objects: tokio::sync::RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the unquoted hex MD5 ETag for a byte slice.
    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Seed an object, stamping it with the current time.
    pub async fn insert(&self, key: &str, data: Bytes, attrs: ObjectAttrs) {
        self.insert_at(key, data, attrs, SystemTime::now()).await;
    }

    /// Seed an object with an explicit upload time.
    pub async fn insert_at(
        &self,
        key: &str,
        data: Bytes,
        attrs: ObjectAttrs,
        uploaded_at: SystemTime,
    ) {
        let etag = Self::compute_etag(&data);
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            Entry {
                data,
                etag,
                uploaded_at,
                attrs,
            },
        );
    }

    /// Remove an object.  Idempotent.
    pub async fn remove(&self, key: &str) {
        self.objects.write().await.remove(key);
    }
}

impl ObjectStore for MemoryStore {
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
            let objects = self.objects.read().await;
            let entry = match objects.get(&key) {
                Some(e) => e,
                None => return Ok(ObjectResult::Missing),
            };

            let meta = ObjectMeta {
                key,
                size: entry.data.len() as u64,
                etag: entry.etag.clone(),
                uploaded_at: entry.uploaded_at,
                content_type: entry.attrs.content_type.clone(),
                content_encoding: entry.attrs.content_encoding.clone(),
                content_language: entry.attrs.content_language.clone(),
                cache_control: entry.attrs.cache_control.clone(),
            };

            Ok(evaluate(
                meta,
                entry.data.clone(),
                conditional.as_ref(),
                range.as_ref(),
            ))
        })
    }
}

// -- Tests -------------------------------------------------------------------
