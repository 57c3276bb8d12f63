//! Substring search over a user's namespace

use std::sync::Arc;

use tracing::debug;

use super::entry::ListingEntry;
use super::index::DirectoryIndex;
use crate::error::{Error, Result};
use crate::path::UserRoot;
use crate::store::ObjectStore;

/// Literal, case-sensitive match against root-relative keys
#[derive(Clone)]
pub struct SearchIndex {
    store: Arc<dyn ObjectStore>,
    index: DirectoryIndex,
}

impl SearchIndex {
    pub fn new(store: Arc<dyn ObjectStore>, index: DirectoryIndex) -> Self {
        Self { store, index }
    }

    /// Every entry whose root-relative key contains `query`, in listing order
    pub async fn search(&self, root: &UserRoot, query: &str) -> Result<Vec<ListingEntry>> {
        if query.is_empty() {
            return Err(Error::InvalidQuery("Invalid query.".to_string()));
        }

        let keys = self.store.list(root.as_str(), true).await?;
        let mut results = Vec::new();

        for key in &keys {
            if root.is_root(key) || !root.relative(key).contains(query) {
                continue;
            }
            results.push(self.index.project(root, key).await?);
        }

        debug!("Search '{}' under {} matched {}/{}", query, root, results.len(), keys.len());
        Ok(results)
    }
}
