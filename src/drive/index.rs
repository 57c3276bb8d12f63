//! Directory emulation over prefix listings
//!
//! A directory exists iff at least one key starts with its prefix. Nothing
//! here caches listings; every answer comes from the store.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use super::entry::ListingEntry;
use crate::error::{Error, Result};
use crate::path::{self, UserRoot};
use crate::store::ObjectStore;

/// Lists, checks and creates emulated directories
#[derive(Clone)]
pub struct DirectoryIndex {
    store: Arc<dyn ObjectStore>,
}

impl DirectoryIndex {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Immediate children of a directory prefix, in store order.
    ///
    /// The directory's own marker and the user root marker are skipped.
    pub async fn list_children(&self, root: &UserRoot, prefix: &str) -> Result<Vec<ListingEntry>> {
        debug_assert!(path::is_directory(prefix));

        let keys = self.store.list(prefix, false).await?;
        let mut entries = Vec::with_capacity(keys.len());

        for key in keys {
            if key == prefix || root.is_root(&key) {
                continue;
            }
            entries.push(self.project(root, &key).await?);
        }

        debug!("Listed {} children under {}", entries.len(), prefix);
        Ok(entries)
    }

    /// Check whether any object lives under a prefix. Reads at most one key.
    pub async fn exists(&self, prefix: &str) -> Result<bool> {
        Ok(self.store.any_under(prefix).await?)
    }

    /// Check whether an object with exactly this key is stored
    pub async fn resource_exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.exists(key).await?)
    }

    /// Check whether a name is taken in either form: `b` is occupied when
    /// the file `b` or anything under `b/` exists, whichever form `key` has
    pub async fn occupied(&self, key: &str) -> Result<bool> {
        let bare = key.strip_suffix(path::SEPARATOR).unwrap_or(key);
        if self.resource_exists(bare).await? {
            return Ok(true);
        }
        self.exists(&path::as_directory(bare)).await
    }

    /// Write an empty marker object for a new directory
    pub async fn create_empty(&self, root: &UserRoot, prefix: &str) -> Result<ListingEntry> {
        path::ensure_valid(prefix)?;
        if root.is_root(prefix) || !root.contains(prefix) {
            return Err(Error::invalid_path());
        }

        if !self.exists(path::parent_of(prefix)).await? {
            return Err(Error::NotFound("Parent folder doesn't exist.".to_string()));
        }

        if self.resource_exists(prefix).await? {
            return Err(Error::AlreadyExists("Directory already exists.".to_string()));
        }

        self.store.put(prefix, Bytes::new(), None).await?;
        info!("Created directory {}", prefix);

        Ok(ListingEntry::directory(root, prefix))
    }

    /// Validate a key and require that it names an existing resource
    pub async fn require(&self, key: &str) -> Result<()> {
        path::ensure_valid(key)?;

        if path::is_directory(key) {
            if !self.exists(key).await? {
                return Err(Error::NotFound("Directory doesn't exist.".to_string()));
            }
        } else if !self.resource_exists(key).await? {
            return Err(Error::NotFound("Object doesn't exist.".to_string()));
        }

        Ok(())
    }

    /// Build the projection of a key: directories from the key alone,
    /// files from a stat call
    pub async fn project(&self, root: &UserRoot, key: &str) -> Result<ListingEntry> {
        if path::is_directory(key) {
            return Ok(ListingEntry::directory(root, key));
        }
        let stat = self.store.stat(key).await?;
        Ok(ListingEntry::file(root, &stat))
    }
}
