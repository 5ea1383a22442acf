//! In-memory [`StorageEngine`] implementation.
//!
//! Committed state is an immutable snapshot swapped atomically with
//! [`ArcSwap`]: readers pin the snapshot current at `begin_read`, the single
//! writer stages its puts and publishes a new snapshot on commit. Tables
//! untouched by a commit are shared between snapshots.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::error::{Result, StorageError};
use crate::storage::engine::{ReadScope, ScanVisitor, StorageEngine, WriteScope};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;
type Tables = HashMap<String, Arc<Table>>;

/// Process-local engine with the same transactional semantics as the on-disk
/// engine. Nothing survives the process.
pub struct MemoryEngine {
    tables: ArcSwap<Tables>,
    writer: Mutex<()>,
    max_size: u64,
    size: AtomicU64,
    lookups: Mutex<HashMap<String, u64>>,
}

impl MemoryEngine {
    /// Creates an empty engine holding at most `max_size` bytes of records.
    #[must_use]
    pub fn new(max_size: u64) -> Self {
        Self {
            tables: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
            max_size,
            size: AtomicU64::new(0),
            lookups: Mutex::new(HashMap::new()),
        }
    }

    /// Estimated bytes of committed keys and values. Replaced values are
    /// counted again, so this never shrinks.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Number of point lookups served for `namespace` since creation.
    #[must_use]
    pub fn lookup_count(&self, namespace: &str) -> u64 {
        self.lookups.lock().get(namespace).copied().unwrap_or(0)
    }

    fn record_lookup(&self, namespace: &str) {
        *self.lookups.lock().entry(namespace.to_string()).or_insert(0) += 1;
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

fn committed<'t>(tables: &'t Tables, namespace: &str) -> Result<&'t Table> {
    tables
        .get(namespace)
        .map(|t| &**t)
        .ok_or_else(|| StorageError::UnknownNamespace(namespace.to_string()))
}

struct MemoryRead<'a> {
    engine: &'a MemoryEngine,
    snapshot: Arc<Tables>,
}

impl ReadScope for MemoryRead<'_> {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = committed(&self.snapshot, namespace)?;
        self.engine.record_lookup(namespace);
        Ok(table.get(key).cloned())
    }

    fn count(&self, namespace: &str) -> Result<u64> {
        Ok(committed(&self.snapshot, namespace)?.len() as u64)
    }

    fn for_each(&self, namespace: &str, visit: &mut ScanVisitor<'_>) -> Result<()> {
        for (key, value) in committed(&self.snapshot, namespace)? {
            visit(key.as_slice(), value.as_slice())?;
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct MemoryWrite<'a> {
    engine: &'a MemoryEngine,
    _writer: MutexGuard<'a, ()>,
    base: Arc<Tables>,
    created: Vec<String>,
    staged: HashMap<String, Table>,
    added_bytes: u64,
}

impl MemoryWrite<'_> {
    fn ensure_exists(&self, namespace: &str) -> Result<()> {
        if self.base.contains_key(namespace) || self.created.iter().any(|n| n == namespace) {
            Ok(())
        } else {
            Err(StorageError::UnknownNamespace(namespace.to_string()))
        }
    }

    fn base_table(&self, namespace: &str) -> Option<&Table> {
        self.base.get(namespace).map(|t| &**t)
    }
}

impl ReadScope for MemoryWrite<'_> {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_exists(namespace)?;
        self.engine.record_lookup(namespace);
        let staged = self.staged.get(namespace).and_then(|t| t.get(key));
        let value = staged.or_else(|| self.base_table(namespace).and_then(|t| t.get(key)));
        Ok(value.cloned())
    }

    fn count(&self, namespace: &str) -> Result<u64> {
        self.ensure_exists(namespace)?;
        let base = self.base_table(namespace);
        let base_len = base.map_or(0, BTreeMap::len);
        let new_keys = self.staged.get(namespace).map_or(0, |staged| {
            staged
                .keys()
                .filter(|k| !base.is_some_and(|t| t.contains_key(*k)))
                .count()
        });
        Ok((base_len + new_keys) as u64)
    }

    fn for_each(&self, namespace: &str, visit: &mut ScanVisitor<'_>) -> Result<()> {
        self.ensure_exists(namespace)?;
        let mut merged: BTreeMap<&[u8], &[u8]> = BTreeMap::new();
        if let Some(table) = self.base_table(namespace) {
            merged.extend(table.iter().map(|(k, v)| (k.as_slice(), v.as_slice())));
        }
        if let Some(staged) = self.staged.get(namespace) {
            merged.extend(staged.iter().map(|(k, v)| (k.as_slice(), v.as_slice())));
        }
        for (key, value) in merged {
            visit(key, value)?;
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        if this.created.is_empty() && this.staged.is_empty() {
            return Ok(());
        }
        let mut tables: Tables = (*this.base).clone();
        for name in this.created {
            tables.entry(name).or_default();
        }
        for (name, puts) in this.staged {
            let table = tables.entry(name).or_default();
            Arc::make_mut(table).extend(puts);
        }
        this.engine.tables.store(Arc::new(tables));
        this.engine.size.fetch_add(this.added_bytes, Ordering::AcqRel);
        Ok(())
    }
}

impl WriteScope for MemoryWrite<'_> {
    fn create_namespace(&mut self, namespace: &str) -> Result<()> {
        if self.ensure_exists(namespace).is_err() {
            self.created.push(namespace.to_string());
        }
        Ok(())
    }

    fn put(&mut self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_exists(namespace)?;
        let record_bytes = (key.len() + value.len()) as u64;
        let used = self.engine.estimated_size() + self.added_bytes;
        if used.saturating_add(record_bytes) > self.engine.max_size {
            return Err(StorageError::StorageFull {
                size: used,
                max: self.engine.max_size,
            });
        }
        self.staged
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        self.added_bytes += record_bytes;
        Ok(())
    }
}

impl StorageEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn begin_read(&self) -> Result<Box<dyn ReadScope + '_>> {
        Ok(Box::new(MemoryRead {
            engine: self,
            snapshot: self.tables.load_full(),
        }))
    }

    fn begin_write(&self) -> Result<Box<dyn WriteScope + '_>> {
        let writer = self.writer.lock();
        Ok(Box::new(MemoryWrite {
            engine: self,
            _writer: writer,
            base: self.tables.load_full(),
            created: Vec::new(),
            staged: HashMap::new(),
            added_bytes: 0,
        }))
    }

    fn sync(&self, force: bool) -> Result<()> {
        trace!(force, "memory engine sync is a no-op");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(namespaces: &[&str]) -> MemoryEngine {
        let engine = MemoryEngine::default();
        let mut txn = engine.begin_write().unwrap();
        for ns in namespaces {
            txn.create_namespace(ns).unwrap();
        }
        txn.commit().unwrap();
        engine
    }

    fn put(engine: &MemoryEngine, ns: &str, key: &[u8], value: &[u8]) {
        let mut txn = engine.begin_write().unwrap();
        txn.put(ns, key, value).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn put_get_round_trip() {
        let engine = engine_with(&["t"]);
        put(&engine, "t", b"k", b"v");

        let txn = engine.begin_read().unwrap();
        assert_eq!(txn.get("t", b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(txn.get("t", b"missing").unwrap(), None);
    }

    #[test]
    fn unknown_namespace_is_misuse() {
        let engine = MemoryEngine::default();
        let txn = engine.begin_read().unwrap();
        let err = txn.get("nope", b"k").unwrap_err();
        assert!(matches!(err, StorageError::UnknownNamespace(ref n) if n == "nope"));
    }

    #[test]
    fn dropped_writer_is_aborted() {
        let engine = engine_with(&["t"]);
        {
            let mut txn = engine.begin_write().unwrap();
            txn.put("t", b"k", b"v").unwrap();
        }
        let txn = engine.begin_read().unwrap();
        assert_eq!(txn.get("t", b"k").unwrap(), None);
        assert_eq!(txn.count("t").unwrap(), 0);
    }

    #[test]
    fn writer_sees_its_own_staged_puts() {
        let engine = engine_with(&["t"]);
        put(&engine, "t", b"a", b"1");

        let mut txn = engine.begin_write().unwrap();
        txn.put("t", b"a", b"2").unwrap();
        txn.put("t", b"b", b"3").unwrap();
        assert_eq!(txn.get("t", b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(txn.count("t").unwrap(), 2);

        let mut seen = Vec::new();
        txn.for_each("t", &mut |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![(b"a".to_vec(), b"2".to_vec()), (b"b".to_vec(), b"3".to_vec())]
        );
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let engine = engine_with(&["t"]);
        put(&engine, "t", b"a", b"1");

        let reader = engine.begin_read().unwrap();
        put(&engine, "t", b"b", b"2");

        assert_eq!(reader.count("t").unwrap(), 1);
        assert_eq!(engine.begin_read().unwrap().count("t").unwrap(), 2);
    }

    #[test]
    fn scan_is_in_key_order() {
        let engine = engine_with(&["t"]);
        for key in [b"c", b"a", b"b"] {
            put(&engine, "t", key, b"x");
        }
        let mut keys = Vec::new();
        let txn = engine.begin_read().unwrap();
        txn.for_each("t", &mut |k, _| {
            keys.push(k.to_vec());
            Ok(())
        })
        .unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn max_size_is_enforced() {
        let engine = MemoryEngine::new(8);
        let mut txn = engine.begin_write().unwrap();
        txn.create_namespace("t").unwrap();
        txn.put("t", b"abc", b"def").unwrap();
        let err = txn.put("t", b"ghi", b"jkl").unwrap_err();
        assert!(err.is_resource_exhausted());
        txn.commit().unwrap();
        assert_eq!(engine.estimated_size(), 6);
    }

    #[test]
    fn lookups_are_counted_per_namespace() {
        let engine = engine_with(&["a", "b"]);
        let txn = engine.begin_read().unwrap();
        txn.get("a", b"k").unwrap();
        txn.get("a", b"k").unwrap();
        assert_eq!(engine.lookup_count("a"), 2);
        assert_eq!(engine.lookup_count("b"), 0);
    }
}
