//! Schema catalog: the fixed mapping from `(Module, Metric)` pairs and global
//! tables to namespace handles.
//!
//! The catalog is built once, inside a single write transaction, right after
//! the environment opens. Lookups on a catalog that was never initialized, or
//! for a module left out of it, return `None`; callers treat that as
//! "operation unavailable".

use std::collections::BTreeMap;
use std::sync::Arc;

use logstore_core::{catalog_namespaces, GlobalTable, Metric, Module, NamespaceId};
use tracing::info;

use crate::error::{Result, StorageError};
use crate::storage::environment::Environment;

/// Handle to one namespace created by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: NamespaceId,
    name: Arc<str>,
}

impl Namespace {
    pub(crate) fn new(id: NamespaceId) -> Self {
        Self {
            id,
            name: Arc::from(id.name()),
        }
    }

    /// Catalog entry this handle belongs to.
    #[must_use]
    pub fn id(&self) -> NamespaceId {
        self.id
    }

    /// Persisted namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Namespace handles for the global tables and every cataloged module.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    globals: BTreeMap<GlobalTable, Namespace>,
    modules: BTreeMap<Module, BTreeMap<Metric, Namespace>>,
}

impl Catalog {
    /// A catalog with no namespaces. Every lookup misses.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Creates the global tables, then every metric table of each module in
    /// `modules`, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NamespaceLimit`] if the environment's
    /// namespace limit is too small, or the engine's error if creation or the
    /// commit fails. Nothing is created on error.
    pub fn init(env: &Environment, modules: &[Module]) -> Result<Self> {
        let ids = catalog_namespaces(modules);
        let max = env.config().max_namespaces;
        if ids.len() > max as usize {
            return Err(StorageError::NamespaceLimit {
                requested: ids.len(),
                max,
            });
        }

        let handles: Vec<Namespace> = ids.into_iter().map(Namespace::new).collect();
        env.write(|txn| {
            for ns in &handles {
                txn.create_namespace(ns)?;
            }
            Ok(())
        })?;

        let mut catalog = Self::default();
        for ns in handles {
            match ns.id() {
                NamespaceId::Global(table) => {
                    catalog.globals.insert(table, ns);
                }
                NamespaceId::Module(module, metric) => {
                    catalog.modules.entry(module).or_default().insert(metric, ns);
                }
            }
        }
        info!(
            namespaces = catalog.len(),
            modules = catalog.modules.len(),
            "storage catalog initialized"
        );
        Ok(catalog)
    }

    /// Handle for a module's metric table, or `None` if the module is not
    /// cataloged.
    #[must_use]
    pub fn resolve(&self, module: Module, metric: Metric) -> Option<&Namespace> {
        self.modules.get(&module)?.get(&metric)
    }

    /// Handle for a global table, or `None` before initialization.
    #[must_use]
    pub fn global(&self, table: GlobalTable) -> Option<&Namespace> {
        self.globals.get(&table)
    }

    /// Like [`resolve`](Self::resolve), but a miss is an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownNamespace`] if the module is not
    /// cataloged.
    pub fn require(&self, module: Module, metric: Metric) -> Result<&Namespace> {
        self.resolve(module, metric).ok_or_else(|| {
            StorageError::UnknownNamespace(NamespaceId::Module(module, metric).name())
        })
    }

    /// `true` once [`init`](Self::init) has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.globals.is_empty()
    }

    /// Cataloged modules, in ordinal order.
    pub fn modules(&self) -> impl Iterator<Item = Module> + '_ {
        self.modules.keys().copied()
    }

    /// Total number of namespace handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.globals.len() + self.modules.values().map(BTreeMap::len).sum::<usize>()
    }

    /// `true` if the catalog holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
