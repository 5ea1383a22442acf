//! Storage configuration.

use std::path::{Path, PathBuf};

use logstore_core::Module;

use crate::error::{Result, StorageError};

/// Default directory holding the environment.
pub const DEFAULT_DB_PATH: &str = "/tmp";

/// Default maximum environment size in bytes (100 000 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 100_000 * 1024 * 1024;

/// Default maximum number of namespaces.
pub const DEFAULT_MAX_NAMESPACES: u32 = 256;

/// Settings for the storage environment and catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Existing directory holding the engine's backing file.
    pub db_path: PathBuf,
    /// Maximum environment size in bytes.
    pub max_size: u64,
    /// Maximum number of namespaces the environment may hold.
    pub max_namespaces: u32,
    /// Defer flushing commits until an explicit [`sync`](crate::Environment::sync).
    pub deferred_sync: bool,
    /// Modules left out of the catalog. Their accessors report "not found".
    pub ignored_modules: Vec<Module>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_size: DEFAULT_MAX_SIZE,
            max_namespaces: DEFAULT_MAX_NAMESPACES,
            deferred_sync: true,
            ignored_modules: Vec::new(),
        }
    }
}

impl StorageConfig {
    /// Creates a default config rooted at `db_path`.
    #[must_use]
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Modules that get namespaces, in ordinal order.
    #[must_use]
    pub fn enabled_modules(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|m| !self.ignored_modules.contains(m))
            .collect()
    }

    /// Checks that `db_path` is an accessible directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the path cannot be accessed or
    /// is not a directory.
    pub fn validate_path(&self) -> Result<&Path> {
        let meta = std::fs::metadata(&self.db_path).map_err(|e| StorageError::InvalidPath {
            path: self.db_path.clone(),
            reason: format!("unable to access database path: {e}"),
        })?;
        if !meta.is_dir() {
            return Err(StorageError::InvalidPath {
                path: self.db_path.clone(),
                reason: "database path is not a directory".to_string(),
            });
        }
        Ok(&self.db_path)
    }
}
