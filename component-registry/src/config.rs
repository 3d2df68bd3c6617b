//! # Configuration Management
//!
//! Configuration for the component registry server:
//!
//! - [`ServerConfig`]: bind address
//! - [`StorageConfig`]: which backend to use and where it keeps its data
//! - [`LimitsConfig`]: upload, request body and archive limits
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use component_registry::config::Config;
//!
//! // Load from file with fallback to defaults
//! let config = Config::load_or_default("config.json")?;
//!
//! // Load from file (fails if file doesn't exist)
//! let config = Config::load("config.json")?;
//!
//! // Use built-in defaults
//! let config = Config::default();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{AppError, AppResult};
use crate::ingest::IngestLimits;
use crate::storage::{LocalStorage, MemoryStorage, StorageBackend};
use crate::validation::{MAX_ARCHIVE_ENTRIES, MAX_REQUEST_BODY_SIZE, MAX_UNPACKED_SIZE, MAX_UPLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const MB: u64 = 1024 * 1024;

/// Main configuration structure for the registry server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration (host, port)
    pub server: ServerConfig,
    /// Storage backend selection and location
    pub storage: StorageConfig,
    /// Upload and archive limits (defaults applied if not specified)
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Default host/IP address to bind to (e.g., "0.0.0.0" or "localhost")
    pub default_host: String,
    /// Default port number to listen on
    pub default_port: u16,
}

/// Which storage adapter serves the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Files under `data_dir`
    #[default]
    Local,
    /// Process memory, lost on exit
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "memory" => Ok(BackendKind::Memory),
            other => Err(AppError::BadRequest(format!(
                "Unknown storage backend '{other}' (expected 'local' or 'memory')"
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Root directory for the local backend
    pub data_dir: PathBuf,
    /// File name of the index document inside `data_dir`
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

fn default_index_file() -> String {
    "index.json".to_string()
}

impl StorageConfig {
    /// Instantiate the configured backend.
    pub fn build_backend(&self) -> Arc<dyn StorageBackend> {
        match self.backend {
            BackendKind::Local => Arc::new(LocalStorage::new(&self.data_dir, &self.index_file)),
            BackendKind::Memory => Arc::new(MemoryStorage::new()),
        }
    }
}

/// Upload and archive limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_size_mb: u64,
    pub max_request_body_size_mb: u64,
    pub max_unpacked_size_mb: u64,
    pub max_archive_entries: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_upload_size_mb: MAX_UPLOAD_SIZE / MB,
            max_request_body_size_mb: MAX_REQUEST_BODY_SIZE as u64 / MB,
            max_unpacked_size_mb: MAX_UNPACKED_SIZE / MB,
            max_archive_entries: MAX_ARCHIVE_ENTRIES,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not match the configuration format.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Load configuration from file, or the defaults if the file doesn't exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.limits.max_upload_size_mb * MB
    }

    /// Get the maximum request body size in bytes.
    pub fn max_request_body_size_bytes(&self) -> usize {
        (self.limits.max_request_body_size_mb * MB) as usize
    }

    /// Archive limits handed to the ingestion pipeline.
    pub fn ingest_limits(&self) -> IngestLimits {
        IngestLimits {
            max_archive_size: self.max_upload_size_bytes(),
            max_unpacked_size: self.limits.max_unpacked_size_mb * MB,
            max_entries: self.limits.max_archive_entries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        serde_json::from_str(include_str!("../config.json"))
            .expect("Failed to parse embedded config.json")
    }
}
