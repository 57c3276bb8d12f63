//! In-memory object store
//!
//! Keeps objects in a `BTreeMap` so listings come back in the same
//! lexicographic order an S3 server returns. Non-recursive listings group
//! deeper keys into common prefixes the way `ListObjectsV2` does with a `/`
//! delimiter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ObjectStat, ObjectStore, StoreError, StoreResult, DEFAULT_CONTENT_TYPE};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Object store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    bucket_created: RwLock<bool>,
}

impl MemoryStore {
    /// Create an empty store whose bucket does not exist yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Check if the store holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Snapshot of every stored key
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn stat(&self, key: &str) -> StoreResult<ObjectStat> {
        let objects = self.objects.read().await;
        match objects.get(key) {
            Some(obj) => Ok(ObjectStat {
                key: key.to_string(),
                size: obj.data.len() as u64,
                content_type: obj.content_type.clone(),
            }),
            None => Err(StoreError::NotFound { key: key.to_string() }),
        }
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StoreResult<()> {
        debug!("memory put {} ({} bytes)", key, data.len());
        let obj = StoredObject {
            data,
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        };
        self.objects.write().await.insert(key.to_string(), obj);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StoreError::NotFound { key: key.to_string() })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        debug!("memory delete {}", key);
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, recursive: bool) -> StoreResult<Vec<String>> {
        let objects = self.objects.read().await;
        let mut keys: Vec<String> = Vec::new();

        for key in objects.range(prefix.to_string()..).map(|(k, _)| k) {
            if !key.starts_with(prefix) {
                break;
            }

            if recursive {
                keys.push(key.clone());
                continue;
            }

            // Collapse anything below the next delimiter into one common prefix
            let rest = &key[prefix.len()..];
            let entry = match rest.find('/') {
                Some(pos) if pos + 1 < rest.len() => format!("{}{}", prefix, &rest[..=pos]),
                _ => key.clone(),
            };

            if keys.last() != Some(&entry) {
                keys.push(entry);
            }
        }

        Ok(keys)
    }

    async fn any_under(&self, prefix: &str) -> StoreResult<bool> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix)))
    }

    async fn copy(&self, source: &str, destination: &str) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        let obj = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: source.to_string() })?;
        debug!("memory copy {} -> {}", source, destination);
        objects.insert(destination.to_string(), obj);
        Ok(())
    }

    async fn bucket_exists(&self) -> StoreResult<bool> {
        Ok(*self.bucket_created.read().await)
    }

    async fn create_bucket(&self) -> StoreResult<()> {
        *self.bucket_created.write().await = true;
        Ok(())
    }
}
