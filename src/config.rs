//! Configuration for BytesDB
//!
//! Centralized configuration with sensible defaults. Loading it from files or
//! the environment is left to the embedding process; this module only holds
//! the resolved values the storage core consumes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BytesDbError, Result};

/// Default maximum size of an active segment (1 MiB)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 1024 * 1024;

/// Main configuration for the storage core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all table data
    /// Internal structure:
    ///   {root_path}/
    ///     └── {schema}/
    ///         └── {table}/
    ///             ├── 0000000000.data
    ///             └── 0000000001.data   (active)
    pub root_path: PathBuf,

    /// Storage backend identifier, resolved by `StorageType::resolve`
    pub storage_type: String,

    /// Size threshold (bytes) at which the active segment is rotated
    pub max_segment_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./bytesdb_data"),
            storage_type: StorageType::LocalFile.as_str().to_string(),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory for table data
    pub fn root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_path = path.into();
        self
    }

    /// Set the storage backend identifier
    pub fn storage_type(mut self, typ: impl Into<String>) -> Self {
        self.config.storage_type = typ.into();
        self
    }

    /// Set the segment rotation threshold (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    /// Segmented append-only files on the local filesystem
    LocalFile,
}

impl StorageType {
    /// Resolve a configured backend identifier.
    ///
    /// An empty identifier selects the default backend.
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "" | "local_file" => Ok(StorageType::LocalFile),
            other => Err(BytesDbError::Config(format!(
                "unknown storage type: {:?}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::LocalFile => "local_file",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
