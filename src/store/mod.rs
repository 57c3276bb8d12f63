//! Object Store Gateway
//!
//! The drive layer talks to storage only through the [`ObjectStore`] trait.
//! Implementations address a single bucket and expose flat keys; directories
//! do not exist at this level.

pub mod memory;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

pub use memory::MemoryStore;
pub use remote::S3Store;

use crate::config::{StoreBackend, StoreConfig};

/// Content type stored when the uploader does not supply one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Gateway error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key does not exist in the bucket
    #[error("No such key: {key}")]
    NotFound { key: String },

    /// Bucket missing or not accessible
    #[error("Bucket error: {0}")]
    Bucket(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for gateway calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Metadata returned by `stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    /// Full object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Stored content type
    pub content_type: String,
}

/// Capability interface over a single bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether an object with exactly this key exists.
    ///
    /// A missing key is `Ok(false)`; any other failure is an error.
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetch object metadata, failing with `NotFound` if absent
    async fn stat(&self, key: &str) -> StoreResult<ObjectStat>;

    /// Store an object, replacing any previous content
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StoreResult<()>;

    /// Read the full object content
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Remove an object. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// List keys under a prefix in lexicographic order.
    ///
    /// Non-recursive listings stop at the next `/` below the prefix and
    /// report each such sub-prefix once, as a key ending in `/`.
    async fn list(&self, prefix: &str, recursive: bool) -> StoreResult<Vec<String>>;

    /// Check whether at least one key starts with `prefix`.
    ///
    /// Backends override this to stop after the first key instead of
    /// reading a whole listing level.
    async fn any_under(&self, prefix: &str) -> StoreResult<bool> {
        Ok(!self.list(prefix, false).await?.is_empty())
    }

    /// Server-side copy preserving content and content type
    async fn copy(&self, source: &str, destination: &str) -> StoreResult<()>;

    /// Check whether the configured bucket exists
    async fn bucket_exists(&self) -> StoreResult<bool>;

    /// Create the configured bucket
    async fn create_bucket(&self) -> StoreResult<()>;
}

/// Build the store selected by the `[store]` section
pub fn open(config: &StoreConfig) -> crate::Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StoreBackend::S3 => {
            let store = S3Store::from_config(config)?;
            info!(
                "Using S3 store at {} (bucket {})",
                config.endpoint.as_deref().unwrap_or_default(),
                store.bucket_name()
            );
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, contents are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: "files".to_string(),
            access_key: None,
            secret_key: None,
            path_style: true,
        };

        let store = open(&config).unwrap();
        store.put("a/b.txt", Bytes::from_static(b"x"), None).await.unwrap();
        assert!(store.exists("a/b.txt").await.unwrap());
        assert_eq!(store.list("a/", false).await.unwrap(), vec!["a/b.txt"]);
        assert_eq!(store.stat("a/b.txt").await.unwrap().content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_open_s3_requires_endpoint() {
        let config = StoreConfig {
            backend: StoreBackend::S3,
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: "files".to_string(),
            access_key: None,
            secret_key: None,
            path_style: true,
        };
        assert!(open(&config).is_err());
    }
}
