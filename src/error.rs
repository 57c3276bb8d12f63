//! WolfDrive Error Types

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for WolfDrive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to callers in place of any internal failure
pub const GENERIC_FAILURE: &str = "Unknown error, please try again.";

/// WolfDrive error types
#[derive(Error, Debug)]
pub enum Error {
    // Caller errors
    #[error("{0}")]
    InvalidPath(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    InvalidFile(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Anything else, including half-applied compound operations
    #[error("{0}")]
    Unidentified(String),

    // Internal errors, never surfaced past the drive facade
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Check if this error is one of the named kinds callers are expected to handle
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_)
                | Error::InvalidQuery(_)
                | Error::InvalidFile(_)
                | Error::NotFound(_)
                | Error::AlreadyExists(_)
                | Error::Unauthorized(_)
        )
    }

    /// Check if this error was caused by malformed caller input
    pub fn is_client_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidPath(_) | Error::InvalidQuery(_) | Error::InvalidFile(_)
        )
    }

    /// Collapse internal failures into `Unidentified` with a generic message,
    /// logging the real cause.
    pub fn into_public(self) -> Self {
        match self {
            e if e.is_expected() => e,
            Error::Unidentified(msg) => Error::Unidentified(msg),
            other => {
                tracing::error!("Internal failure: {}", other);
                Error::Unidentified(GENERIC_FAILURE.to_string())
            }
        }
    }

    pub(crate) fn invalid_path() -> Self {
        Error::InvalidPath("Invalid path.".to_string())
    }
}
