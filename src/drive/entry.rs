//! Listing entries returned to callers

use serde::{Deserialize, Serialize};

use crate::path::{self, UserRoot};
use crate::store::ObjectStat;

/// Kind of a listed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    File,
    Directory,
}

/// Read-only projection of a file or directory, computed on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Key relative to the user root, e.g. `a/` or `a/x.txt`
    pub path: String,
    /// Last path component
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Size in bytes, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ListingEntry {
    /// Project a directory key. Directories carry no stored metadata.
    pub fn directory(root: &UserRoot, key: &str) -> Self {
        Self {
            path: root.relative(key).to_string(),
            name: path::name_of(key).to_string(),
            entry_type: EntryType::Directory,
            size: None,
        }
    }

    /// Project a file from its stat response
    pub fn file(root: &UserRoot, stat: &ObjectStat) -> Self {
        Self {
            path: root.relative(&stat.key).to_string(),
            name: path::name_of(&stat.key).to_string(),
            entry_type: EntryType::File,
            size: Some(stat.size),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Format a byte count with SI units, e.g. `1.5 kB`
pub fn format_size_si(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    const UNITS: [char; 6] = ['k', 'M', 'G', 'T', 'P', 'E'];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 999_950 && unit < UNITS.len() - 1 {
        value /= 1000;
        unit += 1;
    }
    format!("{:.1} {}B", value as f64 / 1000.0, UNITS[unit])
}
