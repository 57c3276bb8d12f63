//! WolfDrive - Per-User File Storage over an Object Store
//!
//! WolfDrive presents a hierarchical, per-user filesystem on top of a flat
//! S3-compatible bucket. Directories are emulated with key prefixes and
//! empty marker objects; every user is confined to a root prefix derived
//! from their account id.
//!
//! # Architecture
//!
//! Requests enter through the HTTP API, which resolves the caller's user id
//! and hands off to [`Drive`]. The drive validates keys, consults the
//! directory index, and runs compound operations (move, recursive delete,
//! zip export, search) as sequences of single-object store calls. Nothing
//! is cached; the bucket is the only state.
//!
//! # Features
//!
//! - Directory listing, creation and recursive deletion
//! - File upload, metadata and download
//! - Move and rename of files and whole directories
//! - Zip export of a directory subtree
//! - Substring search across a user's namespace
//! - S3-compatible backend (MinIO, AWS, WolfDisk) or in-memory store

pub mod api;
pub mod config;
pub mod drive;
pub mod error;
pub mod path;
pub mod store;

pub use config::DriveConfig;
pub use drive::Drive;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::DriveConfig;
    pub use crate::drive::{Drive, EntryType, ListingEntry, UserId};
    pub use crate::error::{Error, Result};
    pub use crate::path::UserRoot;
    pub use crate::store::{MemoryStore, ObjectStat, ObjectStore, S3Store};
}
