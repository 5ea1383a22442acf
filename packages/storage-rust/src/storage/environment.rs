//! The storage environment: one handle to the backing engine per process.
//!
//! Lifecycle is `open` -> catalog init -> serving. There is no close state;
//! dropping the environment releases the engine.

use std::sync::Arc;

use tracing::debug;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::engine::StorageEngine;
use crate::storage::engines::MemoryEngine;
use crate::storage::txn::{ReadTxn, WriteTxn};

/// Shared handle to the engine plus the settings it was opened with.
///
/// Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct Environment {
    engine: Arc<dyn StorageEngine>,
    config: Arc<StorageConfig>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Environment {
    /// Opens the on-disk environment described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`](crate::StorageError::InvalidPath)
    /// if `db_path` is missing or not a directory, and
    /// [`StorageError::OpenEnvironment`](crate::StorageError::OpenEnvironment)
    /// if the engine cannot create its backing file.
    #[cfg(feature = "redb")]
    pub fn open(config: StorageConfig) -> Result<Self> {
        let dir = config.validate_path()?;
        let engine = crate::storage::engines::RedbEngine::open(
            dir,
            config.max_size,
            config.deferred_sync,
        )?;
        tracing::info!(path = %engine.path().display(), "storage environment opened");
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// Opens the on-disk environment described by `config`.
    ///
    /// # Errors
    ///
    /// Always fails: this build has no on-disk engine.
    #[cfg(not(feature = "redb"))]
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.validate_path()?;
        Err(crate::error::StorageError::EngineUnavailable("redb"))
    }

    /// Creates a process-local environment. `db_path` is not touched.
    #[must_use]
    pub fn in_memory(config: StorageConfig) -> Self {
        let engine = MemoryEngine::new(config.max_size);
        Self::with_engine(config, Arc::new(engine))
    }

    /// Wraps an already constructed engine.
    #[must_use]
    pub fn with_engine(config: StorageConfig, engine: Arc<dyn StorageEngine>) -> Self {
        debug!(engine = engine.name(), "storage environment ready");
        Self {
            engine,
            config: Arc::new(config),
        }
    }

    /// Settings the environment was opened with.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Name of the backing engine.
    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Flushes deferred commits. Reporting calls this with `force == true`
    /// before exporting.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the flush fails.
    pub fn sync(&self, force: bool) -> Result<()> {
        self.engine.sync(force)
    }

    /// Starts a read transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the transaction cannot begin.
    pub fn begin_read(&self) -> Result<ReadTxn<'_>> {
        Ok(ReadTxn::new(self.engine.begin_read()?))
    }

    /// Starts the writer transaction, waiting for any active writer.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the transaction cannot begin, or
    /// [`StorageError::StorageFull`](crate::StorageError::StorageFull) once the
    /// environment reached its maximum size.
    pub fn begin_write(&self) -> Result<WriteTxn<'_>> {
        Ok(WriteTxn::new(self.engine.begin_write()?))
    }

    /// Runs `op` inside one read transaction.
    ///
    /// # Errors
    ///
    /// Returns the first error from beginning, running, or closing the
    /// transaction.
    pub fn read<T>(&self, op: impl FnOnce(&ReadTxn<'_>) -> Result<T>) -> Result<T> {
        let txn = self.begin_read()?;
        let out = op(&txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Runs `op` inside one write transaction and commits it. If `op` fails
    /// the transaction is aborted.
    ///
    /// # Errors
    ///
    /// Returns the first error from beginning, running, or committing the
    /// transaction.
    pub fn write<T>(&self, op: impl FnOnce(&mut WriteTxn<'_>) -> Result<T>) -> Result<T> {
        let mut txn = self.begin_write()?;
        let out = op(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }
}
