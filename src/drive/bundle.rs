//! Recursive directory export as a zip archive

use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::index::DirectoryIndex;
use crate::error::{Error, Result};
use crate::path;
use crate::store::ObjectStore;

/// Builds zip archives of directory subtrees
#[derive(Clone)]
pub struct Bundler {
    store: Arc<dyn ObjectStore>,
    index: DirectoryIndex,
}

impl Bundler {
    pub fn new(store: Arc<dyn ObjectStore>, index: DirectoryIndex) -> Self {
        Self { store, index }
    }

    /// Archive everything under a directory key.
    ///
    /// Entry names are re-rooted at the directory's parent, so exporting
    /// `root/7/a/` yields `a/1.txt`, `a/sub/2.txt` and so on. Marker objects
    /// become directory entries.
    pub async fn export_zip(&self, directory: &str) -> Result<Bytes> {
        path::ensure_valid(directory)?;
        if !path::is_directory(directory) {
            return Err(Error::invalid_path());
        }
        if !self.index.exists(directory).await? {
            return Err(Error::NotFound("Object doesn't exist.".to_string()));
        }

        let parent = path::parent_of(directory);
        let keys = self.store.list(directory, true).await?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for key in &keys {
            let name = &key[parent.len()..];
            if path::is_directory(key) {
                writer.add_directory(name, options)?;
                continue;
            }

            let data = self.store.get(key).await?;
            debug!("zip add {} ({} bytes)", name, data.len());
            writer.start_file(name, options)?;
            writer.write_all(&data)?;
        }

        let archive = writer.finish()?.into_inner();
        info!("Exported {} ({} objects, {} bytes)", directory, keys.len(), archive.len());
        Ok(Bytes::from(archive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use crate::store::MemoryStore;

    async fn bundler_with(keys: &[(&str, &str)]) -> Bundler {
        let store = Arc::new(MemoryStore::new());
        for (key, body) in keys {
            store.put(key, Bytes::from(body.to_string()), None).await.unwrap();
        }
        let index = DirectoryIndex::new(store.clone());
        Bundler::new(store, index)
    }

    #[tokio::test]
    async fn test_entries_rooted_at_directory_name() {
        let bundler = bundler_with(&[
            ("root/7/", ""),
            ("root/7/a/1.txt", "one"),
            ("root/7/a/sub/2.txt", "two"),
            ("root/7/other.txt", "nope"),
        ])
        .await;

        let bytes = bundler.export_zip("root/7/a/").await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();

        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["a/1.txt", "a/sub/2.txt"]);

        let mut content = String::new();
        archive.by_name("a/sub/2.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "two");
    }

    #[tokio::test]
    async fn test_markers_become_directory_entries() {
        let bundler = bundler_with(&[("root/7/a/b/", ""), ("root/7/a/b/empty/", "")]).await;

        let bytes = bundler.export_zip("root/7/a/b/").await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 2);

        let entry = archive.by_name("b/empty/").unwrap();
        assert!(entry.is_dir());
        assert_eq!(entry.size(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let bundler = bundler_with(&[("root/7/", "")]).await;
        let err = bundler.export_zip("root/7/none/").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = bundler.export_zip("root/7/file.txt").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }
}
