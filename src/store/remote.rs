//! S3-compatible object store (MinIO, AWS, WolfDisk's S3 gateway)
//!
//! Thin adapter over `rust-s3`. The client is built without `fail-on-err`,
//! so non-2xx responses come back as status codes and are classified here.

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info};

use super::{ObjectStat, ObjectStore, StoreError, StoreResult, DEFAULT_CONTENT_TYPE};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Object store talking to an S3-compatible endpoint
pub struct S3Store {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Store {
    /// Build a client from the `[store]` configuration section
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("store.endpoint is required for the s3 backend".into()))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| Error::Config(format!("invalid store credentials: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| Error::Config(format!("invalid bucket settings: {}", e)))?;
        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            region,
            credentials,
            path_style: config.path_style,
        })
    }

    /// Name of the bucket this store addresses
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}

fn backend(e: S3Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn check_status(key: &str, op: &str, status: u16) -> StoreResult<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StoreError::NotFound { key: key.to_string() }),
        code => Err(StoreError::Backend(format!("{} {} returned HTTP {}", op, key, code))),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn stat(&self, key: &str) -> StoreResult<ObjectStat> {
        let (head, status) = self.bucket.head_object(key).await.map_err(backend)?;
        check_status(key, "HEAD", status)?;

        Ok(ObjectStat {
            key: key.to_string(),
            size: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StoreResult<()> {
        debug!("s3 put {} ({} bytes)", key, data.len());
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .await
            .map_err(backend)?;
        check_status(key, "PUT", response.status_code())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let response = self.bucket.get_object(key).await.map_err(backend)?;
        check_status(key, "GET", response.status_code())?;
        Ok(response.bytes().clone())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        debug!("s3 delete {}", key);
        let response = self.bucket.delete_object(key).await.map_err(backend)?;
        match response.status_code() {
            // S3 answers 204 for missing keys too, MinIO sometimes 404
            200..=299 | 404 => Ok(()),
            code => Err(StoreError::Backend(format!("DELETE {} returned HTTP {}", key, code))),
        }
    }

    async fn list(&self, prefix: &str, recursive: bool) -> StoreResult<Vec<String>> {
        let delimiter = if recursive { None } else { Some("/".to_string()) };
        let pages = self
            .bucket
            .list(prefix.to_string(), delimiter)
            .await
            .map_err(backend)?;

        let mut keys: Vec<String> = Vec::new();
        for page in pages {
            keys.extend(page.contents.into_iter().map(|obj| obj.key));
            if let Some(prefixes) = page.common_prefixes {
                keys.extend(prefixes.into_iter().map(|cp| cp.prefix));
            }
        }

        // Objects and common prefixes arrive in separate lists
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn any_under(&self, prefix: &str) -> StoreResult<bool> {
        let (page, status) = self
            .bucket
            .list_page(prefix.to_string(), None, None, None, Some(1))
            .await
            .map_err(backend)?;
        check_status(prefix, "LIST", status)?;
        Ok(!page.contents.is_empty())
    }

    async fn copy(&self, source: &str, destination: &str) -> StoreResult<()> {
        debug!("s3 copy {} -> {}", source, destination);
        let status = self
            .bucket
            .copy_object_internal(source, destination)
            .await
            .map_err(backend)?;
        check_status(source, "COPY", status)
    }

    async fn bucket_exists(&self) -> StoreResult<bool> {
        self.bucket
            .exists()
            .await
            .map_err(|e| StoreError::Bucket(e.to_string()))
    }

    async fn create_bucket(&self) -> StoreResult<()> {
        let name = self.bucket.name();
        let config = BucketConfiguration::default();
        let response = if self.path_style {
            Bucket::create_with_path_style(&name, self.region.clone(), self.credentials.clone(), config).await
        } else {
            Bucket::create(&name, self.region.clone(), self.credentials.clone(), config).await
        }
        .map_err(|e| StoreError::Bucket(e.to_string()))?;

        if !response.success() {
            return Err(StoreError::Bucket(format!(
                "create bucket {} returned HTTP {}: {}",
                name, response.response_code, response.response_text
            )));
        }

        info!("Created bucket {}", name);
        Ok(())
    }
}
