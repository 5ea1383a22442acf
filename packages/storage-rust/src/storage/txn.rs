//! Transaction scopes over catalog namespaces.
//!
//! A scope wraps one engine transaction. [`ReadTxn::commit`] and
//! [`WriteTxn::commit`] end it explicitly; dropping a scope aborts it, so an
//! error propagated with `?` never publishes a partial write.

use crate::error::Result;
use crate::storage::catalog::Namespace;
use crate::storage::engine::{ReadScope, ScanVisitor, WriteScope};

/// Read operations shared by both scope kinds.
pub trait Lookup {
    /// Raw value stored under `key`, or `None`.
    fn get_raw(&self, ns: &Namespace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Number of records in the namespace.
    fn count(&self, ns: &Namespace) -> Result<u64>;

    /// Forward scan over every record, in key order.
    fn for_each(&self, ns: &Namespace, visit: &mut ScanVisitor<'_>) -> Result<()>;
}

/// A read transaction.
pub struct ReadTxn<'env> {
    scope: Box<dyn ReadScope + 'env>,
}

impl<'env> ReadTxn<'env> {
    pub(crate) fn new(scope: Box<dyn ReadScope + 'env>) -> Self {
        Self { scope }
    }

    /// Ends the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the transaction cannot be closed.
    pub fn commit(self) -> Result<()> {
        self.scope.commit()
    }
}

impl Lookup for ReadTxn<'_> {
    fn get_raw(&self, ns: &Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.scope.get(ns.name(), key)
    }

    fn count(&self, ns: &Namespace) -> Result<u64> {
        self.scope.count(ns.name())
    }

    fn for_each(&self, ns: &Namespace, visit: &mut ScanVisitor<'_>) -> Result<()> {
        self.scope.for_each(ns.name(), visit)
    }
}

/// The writer transaction. At most one is active per environment.
pub struct WriteTxn<'env> {
    scope: Box<dyn WriteScope + 'env>,
}

impl<'env> WriteTxn<'env> {
    pub(crate) fn new(scope: Box<dyn WriteScope + 'env>) -> Self {
        Self { scope }
    }

    /// Creates the namespace if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the namespace cannot be created.
    pub fn create_namespace(&mut self, ns: &Namespace) -> Result<()> {
        self.scope.create_namespace(ns.name())
    }

    /// Inserts or replaces the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the write fails or the environment is
    /// full.
    pub fn put(&mut self, ns: &Namespace, key: &[u8], value: &[u8]) -> Result<()> {
        self.scope.put(ns.name(), key, value)
    }

    /// Publishes every write of the transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the commit fails; nothing is published.
    pub fn commit(self) -> Result<()> {
        self.scope.commit()
    }
}

impl Lookup for WriteTxn<'_> {
    fn get_raw(&self, ns: &Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.scope.get(ns.name(), key)
    }

    fn count(&self, ns: &Namespace) -> Result<u64> {
        self.scope.count(ns.name())
    }

    fn for_each(&self, ns: &Namespace, visit: &mut ScanVisitor<'_>) -> Result<()> {
        self.scope.for_each(ns.name(), visit)
    }
}
