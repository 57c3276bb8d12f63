//! Compound operations: move/rename and recursive delete
//!
//! The store has no rename and no multi-key transaction, so a move is
//! copy-everything-then-delete-everything. Neither operation is atomic. A
//! failure part way leaves whatever was already applied in place and is
//! reported as `Unidentified`; the log line names the key that failed and
//! how far the operation got.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::entry::ListingEntry;
use super::index::DirectoryIndex;
use crate::error::{Error, Result, GENERIC_FAILURE};
use crate::path::{self, UserRoot};
use crate::store::{ObjectStore, StoreError};

/// Progress of a multi-key operation that stopped on a failing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    /// Operation name, for logging
    pub operation: &'static str,
    /// Key whose store call failed
    pub failed_key: String,
    /// Keys already processed before the failure
    pub applied: usize,
    /// Total keys the operation planned to process
    pub planned: usize,
    /// Store error text
    pub cause: String,
}

impl PartialFailure {
    fn new(operation: &'static str, failed_key: &str, applied: usize, planned: usize, cause: StoreError) -> Self {
        Self {
            operation,
            failed_key: failed_key.to_string(),
            applied,
            planned,
            cause: cause.to_string(),
        }
    }
}

impl From<PartialFailure> for Error {
    fn from(failure: PartialFailure) -> Self {
        warn!(
            "{} stopped at {} after {}/{} keys: {}",
            failure.operation, failure.failed_key, failure.applied, failure.planned, failure.cause
        );
        Error::Unidentified(GENERIC_FAILURE.to_string())
    }
}

/// Move/rename and recursive delete over prefix listings
#[derive(Clone)]
pub struct CompoundOps {
    store: Arc<dyn ObjectStore>,
    index: DirectoryIndex,
}

impl CompoundOps {
    pub fn new(store: Arc<dyn ObjectStore>, index: DirectoryIndex) -> Self {
        Self { store, index }
    }

    /// Work out the final destination key of a move.
    ///
    /// A file moved onto a directory key lands inside it. A directory moved
    /// onto an existing directory lands inside it too; onto a directory that
    /// does not exist yet it is renamed. A directory source always yields a
    /// directory key.
    pub async fn resolve_destination(&self, source: &str, destination: &str) -> Result<String> {
        let name = path::name_of(source);

        if !path::is_directory(source) {
            if path::is_directory(destination) {
                return Ok(format!("{}{}", destination, name));
            }
            return Ok(destination.to_string());
        }

        let destination = path::as_directory(destination);
        if self.index.exists(&destination).await? {
            Ok(format!("{}{}/", destination, name))
        } else {
            Ok(destination)
        }
    }

    /// Move or rename a file or directory subtree.
    ///
    /// `source` and `destination` are absolute keys under `root`. The final
    /// destination must be free in both its file and directory form; a
    /// directory moved onto itself is `AlreadyExists`, into its own subtree
    /// `InvalidPath`.
    pub async fn move_or_rename(&self, root: &UserRoot, source: &str, destination: &str) -> Result<ListingEntry> {
        path::ensure_valid(source)?;
        path::ensure_valid(destination)?;
        if root.is_root(source) || !root.contains(destination) {
            return Err(Error::invalid_path());
        }

        self.index.require(source).await?;
        if path::is_directory(source) && path::as_directory(destination) == source {
            return Err(Error::AlreadyExists("Object already exists.".to_string()));
        }

        let destination = self.resolve_destination(source, destination).await?;
        path::ensure_valid(&destination)?;

        if path::is_directory(source) && destination.starts_with(source) {
            return Err(Error::InvalidPath(
                "Cannot move a directory into itself.".to_string(),
            ));
        }

        if !self.index.exists(path::parent_of(&destination)).await? {
            return Err(Error::NotFound("Destination folder doesn't exist.".to_string()));
        }

        if self.index.occupied(&destination).await? {
            return Err(Error::AlreadyExists("Object already exists.".to_string()));
        }

        if path::is_directory(source) {
            let keys = self.store.list(source, true).await?;
            let planned = keys.len();
            for (applied, key) in keys.iter().enumerate() {
                let target = format!("{}{}", destination, &key[source.len()..]);
                debug!("move copy {} -> {}", key, target);
                if let Err(e) = self.store.copy(key, &target).await {
                    return Err(PartialFailure::new("move", key, applied, planned, e).into());
                }
            }
        } else if let Err(e) = self.store.copy(source, &destination).await {
            return Err(PartialFailure::new("move", source, 0, 1, e).into());
        }

        self.remove(source).await?;
        info!("Moved {} -> {}", source, destination);

        self.index.project(root, &destination).await
    }

    /// Delete a file, or every key under a directory prefix
    pub async fn remove(&self, key: &str) -> Result<usize> {
        if !path::is_directory(key) {
            if let Err(e) = self.store.delete(key).await {
                return Err(PartialFailure::new("delete", key, 0, 1, e).into());
            }
            info!("Deleted {}", key);
            return Ok(1);
        }

        let keys = self.store.list(key, true).await?;
        let planned = keys.len();
        for (applied, descendant) in keys.iter().enumerate() {
            if let Err(e) = self.store.delete(descendant).await {
                return Err(PartialFailure::new("delete", descendant, applied, planned, e).into());
            }
        }

        info!("Deleted {} ({} objects)", key, planned);
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use crate::store::{MemoryStore, ObjectStat, StoreResult};

    /// Memory store whose copy and delete fail on one chosen key
    struct FaultyStore {
        inner: MemoryStore,
        fail_copy: Option<String>,
        fail_delete: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for FaultyStore {
        async fn stat(&self, key: &str) -> StoreResult<ObjectStat> {
            self.inner.stat(key).await
        }
        async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StoreResult<()> {
            self.inner.put(key, data, content_type).await
        }
        async fn get(&self, key: &str) -> StoreResult<Bytes> {
            self.inner.get(key).await
        }
        async fn delete(&self, key: &str) -> StoreResult<()> {
            if self.fail_delete.as_deref() == Some(key) {
                return Err(StoreError::Backend("injected delete failure".into()));
            }
            self.inner.delete(key).await
        }
        async fn list(&self, prefix: &str, recursive: bool) -> StoreResult<Vec<String>> {
            self.inner.list(prefix, recursive).await
        }
        async fn copy(&self, source: &str, destination: &str) -> StoreResult<()> {
            if self.fail_copy.as_deref() == Some(source) {
                return Err(StoreError::Backend("injected copy failure".into()));
            }
            self.inner.copy(source, destination).await
        }
        async fn bucket_exists(&self) -> StoreResult<bool> {
            self.inner.bucket_exists().await
        }
        async fn create_bucket(&self) -> StoreResult<()> {
            self.inner.create_bucket().await
        }
    }

    const SEED: [&str; 6] = [
        "root/7/",
        "root/7/a/",
        "root/7/a/1.txt",
        "root/7/a/sub/2.txt",
        "root/7/b/",
        "root/7/c.txt",
    ];

    async fn faulty(fail_copy: Option<&str>, fail_delete: Option<&str>) -> (Arc<FaultyStore>, CompoundOps, UserRoot) {
        let store = Arc::new(FaultyStore {
            inner: MemoryStore::new(),
            fail_copy: fail_copy.map(String::from),
            fail_delete: fail_delete.map(String::from),
        });
        for key in SEED {
            store.put(key, Bytes::from(key.to_string()), None).await.unwrap();
        }
        let index = DirectoryIndex::new(store.clone());
        let ops = CompoundOps::new(store.clone(), index);
        (store, ops, UserRoot::new("root/{id}/", 7))
    }

    async fn healthy() -> (Arc<FaultyStore>, CompoundOps, UserRoot) {
        faulty(None, None).await
    }

    #[tokio::test]
    async fn test_move_file_into_directory() {
        let (store, ops, root) = healthy().await;
        let entry = ops.move_or_rename(&root, "root/7/c.txt", "root/7/b/").await.unwrap();

        assert_eq!(entry.path, "b/c.txt");
        assert_eq!(entry.name, "c.txt");
        assert!(store.exists("root/7/b/c.txt").await.unwrap());
        assert!(!store.exists("root/7/c.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_file() {
        let (store, ops, root) = healthy().await;
        ops.move_or_rename(&root, "root/7/c.txt", "root/7/d.txt").await.unwrap();
        assert_eq!(
            store.get("root/7/d.txt").await.unwrap(),
            Bytes::from_static(b"root/7/c.txt")
        );
    }

    #[tokio::test]
    async fn test_rename_directory_moves_subtree() {
        let (store, ops, root) = healthy().await;
        let entry = ops.move_or_rename(&root, "root/7/a/", "root/7/z/").await.unwrap();

        assert_eq!(entry.path, "z/");
        let keys = store.inner.keys().await;
        assert!(keys.contains(&"root/7/z/".to_string()));
        assert!(keys.contains(&"root/7/z/1.txt".to_string()));
        assert!(keys.contains(&"root/7/z/sub/2.txt".to_string()));
        assert!(!keys.iter().any(|k| k.starts_with("root/7/a/")));
    }

    #[tokio::test]
    async fn test_move_directory_into_existing_directory() {
        let (store, ops, root) = healthy().await;
        let entry = ops.move_or_rename(&root, "root/7/a/", "root/7/b/").await.unwrap();

        assert_eq!(entry.path, "b/a/");
        assert!(store.exists("root/7/b/a/sub/2.txt").await.unwrap());
        assert!(!store.exists("root/7/a/1.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_move_is_destination_exclusive() {
        let (store, ops, root) = healthy().await;
        store.put("root/7/b/c.txt", Bytes::from_static(b"other"), None).await.unwrap();

        let err = ops.move_or_rename(&root, "root/7/c.txt", "root/7/b/").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(store.exists("root/7/c.txt").await.unwrap());
        assert_eq!(store.get("root/7/b/c.txt").await.unwrap(), Bytes::from_static(b"other"));
    }

    #[tokio::test]
    async fn test_file_cannot_take_a_directory_name() {
        let (store, ops, root) = healthy().await;

        let err = ops.move_or_rename(&root, "root/7/c.txt", "root/7/b").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(!store.exists("root/7/b").await.unwrap());
        assert!(store.exists("root/7/c.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_cannot_take_a_file_name() {
        let (store, ops, root) = healthy().await;

        let err = ops.move_or_rename(&root, "root/7/a/", "root/7/c.txt/").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(store.list("root/7/c.txt/", false).await.unwrap().is_empty());
        assert!(store.exists("root/7/a/1.txt").await.unwrap());

        let err = ops.move_or_rename(&root, "root/7/a/", "root/7/c.txt").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_rename_directory_to_missing_name() {
        let (store, ops, root) = healthy().await;
        let entry = ops.move_or_rename(&root, "root/7/b/", "root/7/renamed/").await.unwrap();

        assert_eq!(entry.path, "renamed/");
        assert!(store.exists("root/7/renamed/").await.unwrap());
        assert!(!store.exists("root/7/b/").await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_onto_itself() {
        let (store, ops, root) = healthy().await;

        let err = ops.move_or_rename(&root, "root/7/b/", "root/7/b/").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        let err = ops.move_or_rename(&root, "root/7/b/", "root/7/b").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(store.exists("root/7/b/").await.unwrap());

        let err = ops.move_or_rename(&root, "root/7/c.txt", "root/7/c.txt").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_move_validation() {
        let (_store, ops, root) = healthy().await;

        let err = ops.move_or_rename(&root, "root/7/missing.txt", "root/7/x.txt").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = ops.move_or_rename(&root, "root/7/c.txt", "root/7/nowhere/c.txt").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = ops.move_or_rename(&root, "root/7/c.txt", "root/7/bad|name").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));

        let err = ops.move_or_rename(&root, "root/7/a/", "root/7/a/sub/inner/").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_source_and_partial_destination() {
        let (store, ops, root) = faulty(Some("root/7/a/sub/2.txt"), None).await;

        let err = ops.move_or_rename(&root, "root/7/a/", "root/7/z/").await.unwrap_err();
        assert!(matches!(err, Error::Unidentified(ref m) if m == GENERIC_FAILURE));

        let keys = store.inner.keys().await;
        // Source untouched
        assert!(keys.contains(&"root/7/a/1.txt".to_string()));
        assert!(keys.contains(&"root/7/a/sub/2.txt".to_string()));
        // Keys copied before the failure remain
        assert!(keys.contains(&"root/7/z/1.txt".to_string()));
        assert!(!keys.contains(&"root/7/z/sub/2.txt".to_string()));
    }

    #[tokio::test]
    async fn test_remove_directory() {
        let (store, ops, _root) = healthy().await;
        let removed = ops.remove("root/7/a/").await.unwrap();

        assert_eq!(removed, 3);
        assert!(store.list("root/7/a/", false).await.unwrap().is_empty());
        assert!(store.exists("root/7/c.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_file() {
        let (store, ops, _root) = healthy().await;
        assert_eq!(ops.remove("root/7/c.txt").await.unwrap(), 1);
        assert!(!store.exists("root/7/c.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_applied_deletes() {
        let (store, ops, _root) = faulty(None, Some("root/7/a/1.txt")).await;

        let err = ops.remove("root/7/a/").await.unwrap_err();
        assert!(matches!(err, Error::Unidentified(_)));

        // Marker sorts first and is already gone
        assert!(!store.exists("root/7/a/").await.unwrap());
        assert!(store.exists("root/7/a/1.txt").await.unwrap());
        assert!(store.exists("root/7/a/sub/2.txt").await.unwrap());
    }
}
