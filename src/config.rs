//! WolfDrive Configuration
//!
//! This module provides configuration structures for the WolfDrive
//! per-user file service.

use serde::{Deserialize, Serialize};

/// Main WolfDrive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Object store connection
    pub store: StoreConfig,

    /// Namespace and upload settings
    #[serde(default)]
    pub drive: DriveSection,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which object store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// S3-compatible endpoint (MinIO, AWS, WolfDisk)
    #[default]
    S3,
    /// In-process store, contents lost on exit
    Memory,
}

/// Object store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend implementation
    #[serde(default)]
    pub backend: StoreBackend,

    /// Endpoint URL, e.g. http://127.0.0.1:9000
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket holding every user's files
    pub bucket: String,

    /// Access key
    #[serde(default)]
    pub access_key: Option<String>,

    /// Secret key
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Address the bucket in the path rather than the host name
    #[serde(default = "default_true")]
    pub path_style: bool,
}

/// Namespace and upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSection {
    /// Root prefix template; `{id}` is replaced by the user id
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,

    /// Largest accepted upload in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Enable HTTP API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP API bind address
    #[serde(default = "default_api_address")]
    pub bind_address: String,

    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,

    /// Header carrying the authenticated user id
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_root_prefix() -> String {
    crate::drive::DEFAULT_ROOT_TEMPLATE.to_string()
}

fn default_max_upload_mb() -> u64 {
    512
}

fn default_true() -> bool {
    true
}

fn default_api_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_user_header() -> String {
    "x-user-id".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            root_prefix: default_root_prefix(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_api_address(),
            cors_enabled: false,
            user_header: default_user_header(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl DriveConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DriveConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: DriveConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.store.bucket.is_empty() {
            return Err(crate::Error::Config("store.bucket cannot be empty".into()));
        }

        if self.store.backend == StoreBackend::S3 && self.store.endpoint.is_none() {
            return Err(crate::Error::Config(
                "store.endpoint is required for the s3 backend".into(),
            ));
        }

        let template = &self.drive.root_prefix;
        if !template.contains("{id}") {
            return Err(crate::Error::Config("drive.root_prefix must contain {id}".into()));
        }
        if !template.ends_with('/') {
            return Err(crate::Error::Config("drive.root_prefix must end with '/'".into()));
        }
        let sample = crate::path::UserRoot::new(template, 0);
        if !crate::path::validate(sample.as_str()) {
            return Err(crate::Error::Config(format!(
                "drive.root_prefix expands to an invalid key: {}",
                sample
            )));
        }

        if self.drive.max_upload_mb == 0 {
            return Err(crate::Error::Config("drive.max_upload_mb must be positive".into()));
        }

        if self.api.user_header.is_empty() {
            return Err(crate::Error::Config("api.user_header cannot be empty".into()));
        }

        Ok(())
    }

    /// Upload limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        (self.drive.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}
