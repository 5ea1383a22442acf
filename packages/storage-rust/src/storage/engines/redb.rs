//! On-disk [`StorageEngine`] backed by a single redb database file.
//!
//! Each namespace is a redb table with raw byte keys and values, so the
//! record layouts of [`logstore_core::codec`] are stored verbatim. With
//! deferred sync, ordinary commits use [`Durability::None`] and become
//! durable on the next [`StorageEngine::sync`].
//!
//! redb creates a table on first open inside a write transaction. Only
//! [`WriteScope::create_namespace`] may do that; every other call checks the
//! engine's set of known namespaces first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use redb::{
    Database, Durability, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition,
    TableError, TableHandle, WriteTransaction,
};
use tracing::debug;

use crate::error::{EngineOp, Result, StorageError};
use crate::storage::engine::{ReadScope, ScanVisitor, StorageEngine, WriteScope};

/// File name of the database inside the configured directory.
pub const ENV_FILE_NAME: &str = "logstore.redb";

type RawTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

fn table(namespace: &str) -> RawTable<'_> {
    TableDefinition::new(namespace)
}

fn table_error(op: EngineOp, err: TableError) -> StorageError {
    match err {
        TableError::TableDoesNotExist(name) => StorageError::UnknownNamespace(name),
        other => StorageError::engine(op, other),
    }
}

/// redb-backed engine. One file per environment.
pub struct RedbEngine {
    db: Database,
    path: PathBuf,
    max_size: u64,
    deferred_sync: bool,
    pending_sync: AtomicBool,
    namespaces: RwLock<HashSet<String>>,
}

impl RedbEngine {
    /// Opens (or creates) the database file inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OpenEnvironment`] if redb cannot create, lock,
    /// or map the file.
    pub fn open(dir: &Path, max_size: u64, deferred_sync: bool) -> Result<Self> {
        let path = dir.join(ENV_FILE_NAME);
        let db = Database::create(&path).map_err(|e| StorageError::OpenEnvironment {
            path: path.clone(),
            source: Box::new(e),
        })?;
        let namespaces = existing_tables(&db).map_err(|source| StorageError::OpenEnvironment {
            path: path.clone(),
            source,
        })?;
        debug!(
            path = %path.display(),
            max_size,
            deferred_sync,
            namespaces = namespaces.len(),
            "opened redb environment"
        );
        Ok(Self {
            db,
            path,
            max_size,
            deferred_sync,
            pending_sync: AtomicBool::new(false),
            namespaces: RwLock::new(namespaces),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_size(&self) -> Result<u64> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| StorageError::engine(EngineOp::Begin, e))
    }
}

fn existing_tables(db: &Database) -> std::result::Result<HashSet<String>, crate::error::BoxError> {
    let txn = db.begin_read()?;
    let names = txn
        .list_tables()?
        .map(|handle| handle.name().to_string())
        .collect();
    Ok(names)
}

fn get_in<T: ReadableTable<&'static [u8], &'static [u8]>>(
    table: &T,
    key: &[u8],
) -> Result<Option<Vec<u8>>> {
    let value = table
        .get(key)
        .map_err(|e| StorageError::engine(EngineOp::Read, e))?
        .map(|guard| guard.value().to_vec());
    Ok(value)
}

fn scan_in<T: ReadableTable<&'static [u8], &'static [u8]>>(
    table: &T,
    visit: &mut ScanVisitor<'_>,
) -> Result<()> {
    let iter = table
        .iter()
        .map_err(|e| StorageError::engine(EngineOp::Scan, e))?;
    for entry in iter {
        let (key, value) = entry.map_err(|e| StorageError::engine(EngineOp::Scan, e))?;
        visit(key.value(), value.value())?;
    }
    Ok(())
}

struct RedbRead {
    txn: ReadTransaction,
}

impl ReadScope for RedbRead {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Read, e))?;
        get_in(&t, key)
    }

    fn count(&self, namespace: &str) -> Result<u64> {
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Stat, e))?;
        t.len().map_err(|e| StorageError::engine(EngineOp::Stat, e))
    }

    fn for_each(&self, namespace: &str, visit: &mut ScanVisitor<'_>) -> Result<()> {
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Scan, e))?;
        scan_in(&t, visit)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct RedbWrite<'a> {
    engine: &'a RedbEngine,
    txn: WriteTransaction,
    created: Vec<String>,
}

impl RedbWrite<'_> {
    fn ensure_exists(&self, namespace: &str) -> Result<()> {
        if self.engine.namespaces.read().contains(namespace)
            || self.created.iter().any(|n| n == namespace)
        {
            Ok(())
        } else {
            Err(StorageError::UnknownNamespace(namespace.to_string()))
        }
    }
}

impl ReadScope for RedbWrite<'_> {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_exists(namespace)?;
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Read, e))?;
        get_in(&t, key)
    }

    fn count(&self, namespace: &str) -> Result<u64> {
        self.ensure_exists(namespace)?;
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Stat, e))?;
        t.len().map_err(|e| StorageError::engine(EngineOp::Stat, e))
    }

    fn for_each(&self, namespace: &str, visit: &mut ScanVisitor<'_>) -> Result<()> {
        self.ensure_exists(namespace)?;
        let t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Scan, e))?;
        scan_in(&t, visit)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let RedbWrite {
            engine,
            txn,
            created,
        } = *self;
        txn.commit()
            .map_err(|e| StorageError::engine(EngineOp::Commit, e))?;
        if !created.is_empty() {
            engine.namespaces.write().extend(created);
        }
        if engine.deferred_sync {
            engine.pending_sync.store(true, Ordering::Release);
        }
        Ok(())
    }
}

impl WriteScope for RedbWrite<'_> {
    fn create_namespace(&mut self, namespace: &str) -> Result<()> {
        self.txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::CreateNamespace, e))?;
        if self.ensure_exists(namespace).is_err() {
            self.created.push(namespace.to_string());
        }
        Ok(())
    }

    fn put(&mut self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_exists(namespace)?;
        let mut t = self
            .txn
            .open_table(table(namespace))
            .map_err(|e| table_error(EngineOp::Write, e))?;
        t.insert(key, value)
            .map_err(|e| StorageError::engine(EngineOp::Write, e))?;
        Ok(())
    }
}

impl StorageEngine for RedbEngine {
    fn name(&self) -> &'static str {
        "redb"
    }

    fn begin_read(&self) -> Result<Box<dyn ReadScope + '_>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::engine(EngineOp::Begin, e))?;
        Ok(Box::new(RedbRead { txn }))
    }

    fn begin_write(&self) -> Result<Box<dyn WriteScope + '_>> {
        let size = self.file_size()?;
        if size >= self.max_size {
            return Err(StorageError::StorageFull {
                size,
                max: self.max_size,
            });
        }
        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::engine(EngineOp::Begin, e))?;
        if self.deferred_sync {
            txn.set_durability(Durability::None);
        }
        Ok(Box::new(RedbWrite {
            engine: self,
            txn,
            created: Vec::new(),
        }))
    }

    fn sync(&self, force: bool) -> Result<()> {
        if !force && !self.pending_sync.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::engine(EngineOp::Sync, e))?;
        txn.set_durability(Durability::Immediate);
        txn.commit()
            .map_err(|e| StorageError::engine(EngineOp::Sync, e))?;
        self.pending_sync.store(false, Ordering::Release);
        debug!(path = %self.path.display(), force, "synced redb environment");
        Ok(())
    }
}
