//! Transactional key-value engine boundary.
//!
//! Defines [`StorageEngine`], the innermost layer under the schema catalog.
//! An engine offers named namespaces, one writer transaction at a time,
//! concurrent readers, a per-namespace cardinality query, forward cursor
//! scans, and an explicit durability flush. Keys and values are raw bytes;
//! layouts are fixed by [`logstore_core::codec`].
//!
//! Scopes that are dropped without [`ReadScope::commit`] are aborted.

use crate::error::Result;

/// Visitor called for each `(key, value)` pair of a scan, in key order.
pub type ScanVisitor<'a> = dyn FnMut(&[u8], &[u8]) -> Result<()> + 'a;

/// Operations available inside any transaction.
pub trait ReadScope {
    /// Retrieve the value stored under `key`, or `None` if absent.
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Number of records in the namespace.
    fn count(&self, namespace: &str) -> Result<u64>;

    /// Visit every record of the namespace with a forward cursor. Stops at the
    /// first error returned by `visit`.
    fn for_each(&self, namespace: &str, visit: &mut ScanVisitor<'_>) -> Result<()>;

    /// End the transaction, publishing any writes.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Operations available inside a writer transaction.
pub trait WriteScope: ReadScope {
    /// Create the namespace if it does not exist yet.
    fn create_namespace(&mut self, namespace: &str) -> Result<()>;

    /// Insert or replace the record stored under `key`.
    fn put(&mut self, namespace: &str, key: &[u8], value: &[u8]) -> Result<()>;
}

/// A transactional, namespaced key-value engine.
///
/// Wrapped in `Arc<dyn StorageEngine>` by [`Environment`](crate::Environment).
pub trait StorageEngine: Send + Sync + 'static {
    /// Short engine name for diagnostics.
    fn name(&self) -> &'static str;

    /// Start a read transaction over a consistent snapshot.
    fn begin_read(&self) -> Result<Box<dyn ReadScope + '_>>;

    /// Start the writer transaction. Blocks while another writer is active.
    fn begin_write(&self) -> Result<Box<dyn WriteScope + '_>>;

    /// Flush deferred commits to durable storage. With `force == false` the
    /// engine may skip the flush when nothing is pending.
    fn sync(&self, force: bool) -> Result<()>;
}
