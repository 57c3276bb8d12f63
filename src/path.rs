//! Path and Key Handling
//!
//! Translates caller-relative paths into object keys under a user's root
//! prefix and back. Directories are plain key prefixes: a key ending in `/`
//! names a directory, anything else names a file. All helpers here are pure
//! string arithmetic.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Path separator used in object keys
pub const SEPARATOR: char = '/';

/// Grammar for a full object key.
///
/// Segments may contain letters, digits, `._-()` and space. Each segment is
/// followed by `/` except an optional trailing file name. Characters such as
/// `< > : " \ | ? *` never match.
pub const KEY_PATTERN: &str = r"^(?:[A-Za-z0-9._\- ()]+/)*(?:[A-Za-z0-9._\- ()]+)?$";

static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(KEY_PATTERN).expect("key pattern is a valid regex"));

/// Check a full object key against the key grammar.
///
/// Besides the pattern, the empty key and `.`/`..` segments are refused.
pub fn validate(key: &str) -> bool {
    if key.is_empty() || !KEY_REGEX.is_match(key) {
        return false;
    }
    !key.split(SEPARATOR).any(|segment| segment == "." || segment == "..")
}

/// Validate a key, failing with `InvalidPath`
pub fn ensure_valid(key: &str) -> Result<()> {
    if validate(key) {
        Ok(())
    } else {
        Err(Error::invalid_path())
    }
}

/// Join a root prefix and a caller path, dropping one leading separator
pub fn build_key(root: &str, relative: &str) -> String {
    let relative = relative.strip_prefix(SEPARATOR).unwrap_or(relative);
    format!("{}{}", root, relative)
}

/// Build the key of an uploaded file inside a directory.
///
/// Exactly one separator ends up between the directory part and the file
/// name, whatever separators the caller put on either side.
pub fn build_upload_key(root: &str, directory: &str, file_name: &str) -> String {
    let directory = directory.trim_start_matches(SEPARATOR).trim_end_matches(SEPARATOR);
    let file_name = file_name.trim_start_matches(SEPARATOR);

    if directory.is_empty() {
        format!("{}{}", root, file_name)
    } else {
        format!("{}{}{}{}", root, directory, SEPARATOR, file_name)
    }
}

/// A key names a directory iff it ends with the separator
pub fn is_directory(key: &str) -> bool {
    key.ends_with(SEPARATOR)
}

/// Force the directory form of a key
pub fn as_directory(key: &str) -> String {
    if is_directory(key) {
        key.to_string()
    } else {
        format!("{}{}", key, SEPARATOR)
    }
}

/// Key of the parent directory, including its trailing separator.
///
/// Returns `/` when the key has no parent component.
pub fn parent_of(key: &str) -> &str {
    let trimmed = key.strip_suffix(SEPARATOR).unwrap_or(key);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &key[..=idx],
        None => "/",
    }
}

/// Last path component: the file name, or the directory name without separators
pub fn name_of(key: &str) -> &str {
    let trimmed = key.strip_suffix(SEPARATOR).unwrap_or(key);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// The reserved key prefix isolating one account's namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoot {
    prefix: String,
}

impl UserRoot {
    /// Expand a root template such as `root/{id}/` for a user
    pub fn new(template: &str, user_id: u64) -> Self {
        Self {
            prefix: template.replace("{id}", &user_id.to_string()),
        }
    }

    /// The root marker key, e.g. `root/7/`
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Absolute key for a caller-relative path
    pub fn key(&self, relative: &str) -> String {
        build_key(&self.prefix, relative)
    }

    /// Absolute directory key for a caller-relative path.
    ///
    /// An empty path or `/` resolves to the root itself.
    pub fn directory_key(&self, relative: &str) -> String {
        let relative = relative.strip_prefix(SEPARATOR).unwrap_or(relative);
        if relative.is_empty() {
            return self.prefix.clone();
        }
        as_directory(&self.key(relative))
    }

    /// Absolute key for an upload into a caller-relative directory
    pub fn upload_key(&self, directory: &str, file_name: &str) -> String {
        build_upload_key(&self.prefix, directory, file_name)
    }

    /// Path of a key relative to this root
    pub fn relative<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }

    /// Check whether a key is the root marker itself
    pub fn is_root(&self, key: &str) -> bool {
        key == self.prefix
    }

    /// Check whether a key lives inside this root
    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(self.prefix.as_str())
    }
}

impl std::fmt::Display for UserRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_grammar() {
        assert!(validate("root/7/"));
        assert!(validate("root/7/a/"));
        assert!(validate("root/7/my docs/report (final).pdf"));
        assert!(validate("root/7/a-b_c.d/e"));
    }

    #[test]
    fn test_validate_rejects_bad_keys() {
        assert!(!validate(""));
        assert!(!validate("root/7//a"));
        assert!(!validate("/root/7/"));
        assert!(!validate("root/7/a<b"));
        assert!(!validate("root/7/a:b"));
        assert!(!validate("root/7/a\\b"));
        assert!(!validate("root/7/what?"));
        assert!(!validate("root/7/*"));
        assert!(!validate("root/7/\"q\""));
        assert!(!validate("root/7/../8/"));
        assert!(!validate("root/7/./a"));
        assert!(ensure_valid("root/7/a|b").is_err());
    }

    #[test]
    fn test_build_key_strips_one_leading_separator() {
        assert_eq!(build_key("root/7/", "/a/b"), "root/7/a/b");
        assert_eq!(build_key("root/7/", "a/"), "root/7/a/");
        assert_eq!(build_key("root/7/", "//a"), "root/7//a");
    }

    #[test]
    fn test_build_upload_key_single_separator() {
        assert_eq!(build_upload_key("root/7/", "a", "x.txt"), "root/7/a/x.txt");
        assert_eq!(build_upload_key("root/7/", "a/", "x.txt"), "root/7/a/x.txt");
        assert_eq!(build_upload_key("root/7/", "/a/", "/x.txt"), "root/7/a/x.txt");
        assert_eq!(build_upload_key("root/7/", "", "x.txt"), "root/7/x.txt");
        assert_eq!(build_upload_key("root/7/", "/", "x.txt"), "root/7/x.txt");
    }

    #[test]
    fn test_is_directory() {
        assert!(is_directory("root/7/"));
        assert!(is_directory("root/7/a/"));
        assert!(!is_directory("root/7/a"));
        assert_eq!(as_directory("root/7/a"), "root/7/a/");
        assert_eq!(as_directory("root/7/a/"), "root/7/a/");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("root/7/a/x.txt"), "root/7/a/");
        assert_eq!(parent_of("root/7/a/"), "root/7/");
        assert_eq!(parent_of("root/7/a/b/"), "root/7/a/");
        assert_eq!(parent_of("root/"), "/");
        assert_eq!(parent_of("file"), "/");
    }

    #[test]
    fn test_name_of() {
        assert_eq!(name_of("root/7/a/x.txt"), "x.txt");
        assert_eq!(name_of("root/7/a/"), "a");
        assert_eq!(name_of("root/7/a/my dir/"), "my dir");
        assert_eq!(name_of("plain"), "plain");
    }

    #[test]
    fn test_user_root() {
        let root = UserRoot::new("root/{id}/", 7);
        assert_eq!(root.as_str(), "root/7/");
        assert_eq!(root.key("/a/x.txt"), "root/7/a/x.txt");
        assert_eq!(root.directory_key("a"), "root/7/a/");
        assert_eq!(root.directory_key("/"), "root/7/");
        assert_eq!(root.directory_key(""), "root/7/");
        assert_eq!(root.upload_key("a", "x.txt"), "root/7/a/x.txt");
        assert_eq!(root.relative("root/7/a/x.txt"), "a/x.txt");
        assert!(root.is_root("root/7/"));
        assert!(root.contains("root/7/a"));
        assert!(!root.contains("root/70/a"));
        assert_eq!(root.to_string(), "root/7/");
    }

    #[test]
    fn test_parent_of_built_key_is_prefix() {
        let root = UserRoot::new("root/{id}/", 3);
        for rel in ["a", "a/b/", "a/b/c.txt", "x (1).txt"] {
            let key = root.key(rel);
            assert!(key.starts_with(parent_of(&key)));
            assert!(root.contains(parent_of(&key)));
        }
    }
}
