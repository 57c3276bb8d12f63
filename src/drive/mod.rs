//! Drive Service
//!
//! The per-user virtual filesystem. Every operation takes an explicit user
//! id, resolves that user's root prefix, builds and validates the object
//! key, and then delegates to the directory index, compound operations,
//! bundler or search. Nothing is cached between calls.
//!
//! Errors leaving this module are either one of the named kinds or
//! `Unidentified` with a generic message.

pub mod bundle;
pub mod entry;
pub mod index;
pub mod ops;
pub mod search;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

pub use bundle::Bundler;
pub use entry::{format_size_si, EntryType, ListingEntry};
pub use index::DirectoryIndex;
pub use ops::{CompoundOps, PartialFailure};
pub use search::SearchIndex;

use crate::error::{Error, Result};
use crate::path::{self, UserRoot};
use crate::store::{ObjectStat, ObjectStore};

/// Default root prefix template, one namespace per user id
pub const DEFAULT_ROOT_TEMPLATE: &str = "root/{id}/";

/// Opaque account identifier handed over by the authentication layer
pub type UserId = u64;

/// Virtual filesystem facade over an object store
#[derive(Clone)]
pub struct Drive {
    store: Arc<dyn ObjectStore>,
    root_template: String,
    index: DirectoryIndex,
    ops: CompoundOps,
    bundler: Bundler,
    search: SearchIndex,
}

impl Drive {
    /// Create a drive over a store with a root template such as `root/{id}/`
    pub fn new(store: Arc<dyn ObjectStore>, root_template: impl Into<String>) -> Self {
        let index = DirectoryIndex::new(Arc::clone(&store));
        Self {
            ops: CompoundOps::new(Arc::clone(&store), index.clone()),
            bundler: Bundler::new(Arc::clone(&store), index.clone()),
            search: SearchIndex::new(Arc::clone(&store), index.clone()),
            index,
            store,
            root_template: root_template.into(),
        }
    }

    /// Root prefix of a user
    pub fn user_root(&self, user_id: UserId) -> UserRoot {
        UserRoot::new(&self.root_template, user_id)
    }

    /// Create the bucket if it does not exist yet. Run once at startup.
    pub async fn ensure_bucket(&self) -> Result<()> {
        if !self.store.bucket_exists().await? {
            self.store.create_bucket().await?;
            info!("Bucket created");
        }
        Ok(())
    }

    /// Write the empty root marker for a new account
    pub async fn provision_user(&self, user_id: UserId) -> Result<ListingEntry> {
        boundary(async {
            let root = self.user_root(user_id);
            if !self.index.resource_exists(root.as_str()).await? {
                self.store.put(root.as_str(), Bytes::new(), None).await?;
                info!("Provisioned root {} for user {}", root, user_id);
            }
            Ok(ListingEntry::directory(&root, root.as_str()))
        })
        .await
    }

    /// Immediate children of a directory; `""` or `/` is the user root
    pub async fn list_directory(&self, user_id: UserId, path: &str) -> Result<Vec<ListingEntry>> {
        boundary(async {
            let root = self.user_root(user_id);
            let prefix = root.directory_key(path);
            path::ensure_valid(&prefix)?;

            if !self.index.exists(&prefix).await? {
                return Err(Error::NotFound("Directory is empty or doesn't exist.".to_string()));
            }

            self.index.list_children(&root, &prefix).await
        })
        .await
    }

    /// Create an empty directory; its parent must exist
    pub async fn create_directory(&self, user_id: UserId, path: &str) -> Result<ListingEntry> {
        boundary(async {
            let root = self.user_root(user_id);
            let relative = non_empty(path)?;
            let prefix = path::as_directory(&root.key(relative));
            self.index.create_empty(&root, &prefix).await
        })
        .await
    }

    /// Projection of a file or directory
    pub async fn get_resource_info(&self, user_id: UserId, path: &str) -> Result<ListingEntry> {
        boundary(async {
            let root = self.user_root(user_id);
            let key = root.key(non_empty(path)?);
            self.index.require(&key).await?;
            self.index.project(&root, &key).await
        })
        .await
    }

    /// Store a new file named `file_name` inside directory `path`
    pub async fn upload_resource(
        &self,
        user_id: UserId,
        path: &str,
        file_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<ListingEntry> {
        boundary(async {
            if data.is_empty() {
                return Err(Error::InvalidFile("Invalid file.".to_string()));
            }

            let root = self.user_root(user_id);
            let key = root.upload_key(path, file_name);
            path::ensure_valid(&key)?;
            if path::is_directory(&key) || root.is_root(&key) {
                return Err(Error::invalid_path());
            }

            if !self.index.exists(path::parent_of(&key)).await? {
                return Err(Error::NotFound("Parent folder doesn't exist.".to_string()));
            }

            if self.index.resource_exists(&key).await? {
                return Err(Error::AlreadyExists("Object already exists.".to_string()));
            }

            let size = data.len();
            self.store.put(&key, data, content_type).await?;
            info!("Uploaded {} ({} bytes)", key, size);

            self.index.project(&root, &key).await
        })
        .await
    }

    /// Delete a file, or a directory with everything below it
    pub async fn delete_resource(&self, user_id: UserId, path: &str) -> Result<()> {
        boundary(async {
            let root = self.user_root(user_id);
            let key = root.key(non_empty(path)?);
            self.index.require(&key).await?;
            self.ops.remove(&key).await?;
            Ok(())
        })
        .await
    }

    /// Content and metadata of a single file
    pub async fn download_file(&self, user_id: UserId, path: &str) -> Result<(ObjectStat, Bytes)> {
        boundary(async {
            let root = self.user_root(user_id);
            let key = root.key(non_empty(path)?);
            if path::is_directory(&key) {
                return Err(Error::InvalidPath(
                    "Directories are downloaded as archives.".to_string(),
                ));
            }
            self.index.require(&key).await?;

            let stat = self.store.stat(&key).await?;
            let data = self.store.get(&key).await?;
            Ok((stat, data))
        })
        .await
    }

    /// Zip archive of a directory, entries rooted at the directory's name
    pub async fn download_directory_as_zip(&self, user_id: UserId, path: &str) -> Result<Bytes> {
        boundary(async {
            let root = self.user_root(user_id);
            let prefix = root.directory_key(non_empty(path)?);
            self.bundler.export_zip(&prefix).await
        })
        .await
    }

    /// Move or rename; see [`CompoundOps::move_or_rename`] for destination rules
    pub async fn move_or_rename(&self, user_id: UserId, from: &str, to: &str) -> Result<ListingEntry> {
        boundary(async {
            let root = self.user_root(user_id);
            let source = root.key(non_empty(from)?);
            let destination = root.key(to);
            self.ops.move_or_rename(&root, &source, &destination).await
        })
        .await
    }

    /// Entries whose root-relative key contains `query`
    pub async fn search(&self, user_id: UserId, query: &str) -> Result<Vec<ListingEntry>> {
        boundary(async {
            let root = self.user_root(user_id);
            self.search.search(&root, query).await
        })
        .await
    }
}

/// Run one exposed operation, masking internal failures on the way out
async fn boundary<T>(op: impl Future<Output = Result<T>>) -> Result<T> {
    op.await.map_err(Error::into_public)
}

/// Caller path with one leading separator removed; empty paths are refused
fn non_empty(path: &str) -> Result<&str> {
    let relative = path.strip_prefix(path::SEPARATOR).unwrap_or(path);
    if relative.is_empty() {
        return Err(Error::invalid_path());
    }
    Ok(relative)
}
