//! `LogStore`: the per-module storage surface used by the parser and the
//! report renderer.
//!
//! Each call resolves one namespace through the [`Catalog`] and runs one
//! typed accessor. A module left out of the catalog (ignored by
//! configuration, or a store built before initialization) makes every call
//! for it return the not-found value: `None`, `false`, or `0`.

use logstore_core::{GlobalTable, Metric, Module, RawData};
use tracing::trace;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::accessors;
use crate::storage::autoincrement::insert_autoincrement;
use crate::storage::catalog::{Catalog, Namespace};
use crate::storage::environment::Environment;
use crate::storage::export;

/// Environment plus catalog, built once at startup and passed to callers.
#[derive(Debug, Clone)]
pub struct LogStore {
    env: Environment,
    catalog: Catalog,
}

impl LogStore {
    /// Opens the on-disk environment and creates the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unusable, the engine cannot open, or
    /// the catalog does not fit the namespace limit.
    pub fn open(config: StorageConfig) -> Result<Self> {
        let modules = config.enabled_modules();
        let env = Environment::open(config)?;
        let catalog = Catalog::init(&env, &modules)?;
        Ok(Self { env, catalog })
    }

    /// Builds a store on a process-local engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog does not fit the namespace limit.
    pub fn in_memory(config: StorageConfig) -> Result<Self> {
        let modules = config.enabled_modules();
        let env = Environment::in_memory(config);
        let catalog = Catalog::init(&env, &modules)?;
        Ok(Self { env, catalog })
    }

    /// Assembles a store from an environment and a catalog built on it.
    #[must_use]
    pub fn from_parts(env: Environment, catalog: Catalog) -> Self {
        Self { env, catalog }
    }

    /// The environment every call runs against.
    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Namespace handles resolved at startup.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Settings the environment was opened with.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        self.env.config()
    }

    fn module_ns(&self, module: Module, metric: Metric) -> Option<&Namespace> {
        let ns = self.catalog.resolve(module, metric);
        if ns.is_none() {
            trace!(%module, metric = metric.db_name(), "namespace unavailable");
        }
        ns
    }

    fn global_ns(&self, table: GlobalTable) -> Option<&Namespace> {
        let ns = self.catalog.global(table);
        if ns.is_none() {
            trace!(table = table.db_name(), "global namespace unavailable");
        }
        ns
    }

    fn on_module<T>(
        &self,
        module: Module,
        metric: Metric,
        missing: T,
        op: impl FnOnce(&Environment, &Namespace) -> Result<T>,
    ) -> Result<T> {
        match self.module_ns(module, metric) {
            Some(ns) => op(&self.env, ns),
            None => Ok(missing),
        }
    }

    fn on_global<T>(
        &self,
        table: GlobalTable,
        missing: T,
        op: impl FnOnce(&Environment, &Namespace) -> Result<T>,
    ) -> Result<T> {
        match self.global_ns(table) {
            Some(ns) => op(&self.env, ns),
            None => Ok(missing),
        }
    }

    // -- keys and maps ------------------------------------------------------

    /// Id of `key` in the module's key map, allocated on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_keymap(&self, module: Module, key: &str) -> Result<Option<i32>> {
        self.on_module(module, Metric::KeyMap, None, |env, ns| {
            insert_autoincrement(env, ns, key).map(|a| Some(a.id()))
        })
    }

    /// Id of `key` in the module's key map, without allocating.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_keymap(&self, module: Module, key: &str) -> Result<Option<i32>> {
        self.on_module(module, Metric::KeyMap, None, |env, ns| {
            accessors::get_int_by_string(env, ns, key)
        })
    }

    /// Records a unique visitor key for the module. `true` only the first
    /// time the key is seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_uniqmap(&self, module: Module, key: &str) -> Result<bool> {
        self.on_module(module, Metric::UniqMap, false, |env, ns| {
            insert_autoincrement(env, ns, key).map(|a| a.is_new())
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_datamap(&self, module: Module, key: i32, value: &str) -> Result<()> {
        self.on_module(module, Metric::DataMap, (), |env, ns| {
            accessors::insert_int_keyed_string(env, ns, key, value)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_rootmap(&self, module: Module, key: i32, value: &str) -> Result<()> {
        self.on_module(module, Metric::RootMap, (), |env, ns| {
            accessors::insert_int_keyed_string(env, ns, key, value)
        })
    }

    /// Links item `key` to root `root_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_root(&self, module: Module, key: i32, root_id: i32) -> Result<()> {
        self.on_module(module, Metric::Root, (), |env, ns| {
            accessors::insert_int_keyed_int(env, ns, key, root_id)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_method(&self, module: Module, key: i32, method: &str) -> Result<()> {
        self.on_module(module, Metric::Methods, (), |env, ns| {
            accessors::insert_int_keyed_string(env, ns, key, method)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_protocol(&self, module: Module, key: i32, protocol: &str) -> Result<()> {
        self.on_module(module, Metric::Protocols, (), |env, ns| {
            accessors::insert_int_keyed_string(env, ns, key, protocol)
        })
    }

    // -- counters -----------------------------------------------------------

    /// Adds `inc` hits to item `key`; returns the new count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_hits(&self, module: Module, key: i32, inc: i32) -> Result<i32> {
        self.on_module(module, Metric::Hits, 0, |env, ns| {
            accessors::increment_int_keyed_int(env, ns, key, inc)
        })
    }

    /// Adds `inc` visitors to item `key`; returns the new count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_visitor(&self, module: Module, key: i32, inc: i32) -> Result<i32> {
        self.on_module(module, Metric::Visitors, 0, |env, ns| {
            accessors::increment_int_keyed_int(env, ns, key, inc)
        })
    }

    /// Adds `bytes` to item `key`'s bandwidth; returns the new total.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_bw(&self, module: Module, key: i32, bytes: u64) -> Result<u64> {
        self.on_module(module, Metric::Bandwidth, 0, |env, ns| {
            accessors::increment_int_keyed_u64(env, ns, key, bytes)
        })
    }

    /// Adds `time` to item `key`'s cumulative time served.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_cumts(&self, module: Module, key: i32, time: u64) -> Result<u64> {
        self.on_module(module, Metric::CumulativeTime, 0, |env, ns| {
            accessors::increment_int_keyed_u64(env, ns, key, time)
        })
    }

    /// Raises item `key`'s maximum time served to `time` if larger. `true`
    /// if the stored maximum changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_maxts(&self, module: Module, key: i32, time: u64) -> Result<bool> {
        self.on_module(module, Metric::MaxTime, false, |env, ns| {
            accessors::insert_max(env, ns, key, time)
        })
    }

    /// Adds `value` to the module's metadata entry `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_meta_data(&self, module: Module, key: &str, value: u64) -> Result<u64> {
        self.on_module(module, Metric::Metadata, 0, |env, ns| {
            accessors::increment_string_keyed_u64(env, ns, key, value)
        })
    }

    // -- globals ------------------------------------------------------------

    /// Id of a unique visitor key, allocated on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_unique_key(&self, key: &str) -> Result<Option<i32>> {
        self.on_global(GlobalTable::UniqueKeys, None, |env, ns| {
            insert_autoincrement(env, ns, key).map(|a| Some(a.id()))
        })
    }

    /// Id of a user agent string, allocated on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_agent_key(&self, agent: &str) -> Result<Option<i32>> {
        self.on_global(GlobalTable::AgentKeys, None, |env, ns| {
            insert_autoincrement(env, ns, agent).map(|a| Some(a.id()))
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_agent_value(&self, id: i32, agent: &str) -> Result<()> {
        self.on_global(GlobalTable::AgentValues, (), |env, ns| {
            accessors::insert_int_keyed_string(env, ns, id, agent)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_agent_value(&self, id: i32) -> Result<Option<String>> {
        self.on_global(GlobalTable::AgentValues, None, |env, ns| {
            accessors::get_string_by_int(env, ns, id)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn insert_hostname(&self, ip: &str, hostname: &str) -> Result<()> {
        self.on_global(GlobalTable::Hostnames, (), |env, ns| {
            accessors::insert_string_keyed_string(env, ns, ip, hostname)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_hostname(&self, ip: &str) -> Result<Option<String>> {
        self.on_global(GlobalTable::Hostnames, None, |env, ns| {
            accessors::get_string_by_string(env, ns, ip)
        })
    }

    /// Adds `delta` to a run-wide counter such as `total_requests`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn increment_general_stat(&self, name: &str, delta: u64) -> Result<u64> {
        self.on_global(GlobalTable::GeneralStats, 0, |env, ns| {
            accessors::increment_string_keyed_u64(env, ns, name, delta)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_general_stat(&self, name: &str) -> Result<u64> {
        self.on_global(GlobalTable::GeneralStats, 0, |env, ns| {
            accessors::get_u64_by_string(env, ns, name)
        })
    }

    // -- getters ------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_datamap(&self, module: Module, key: i32) -> Result<Option<String>> {
        self.on_module(module, Metric::DataMap, None, |env, ns| {
            accessors::get_string_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_hits(&self, module: Module, key: i32) -> Result<i32> {
        self.on_module(module, Metric::Hits, 0, |env, ns| {
            accessors::get_int_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_visitors(&self, module: Module, key: i32) -> Result<i32> {
        self.on_module(module, Metric::Visitors, 0, |env, ns| {
            accessors::get_int_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_bw(&self, module: Module, key: i32) -> Result<u64> {
        self.on_module(module, Metric::Bandwidth, 0, |env, ns| {
            accessors::get_u64_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_cumts(&self, module: Module, key: i32) -> Result<u64> {
        self.on_module(module, Metric::CumulativeTime, 0, |env, ns| {
            accessors::get_u64_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_maxts(&self, module: Module, key: i32) -> Result<u64> {
        self.on_module(module, Metric::MaxTime, 0, |env, ns| {
            accessors::get_u64_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_method(&self, module: Module, key: i32) -> Result<Option<String>> {
        self.on_module(module, Metric::Methods, None, |env, ns| {
            accessors::get_string_by_int(env, ns, key)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_protocol(&self, module: Module, key: i32) -> Result<Option<String>> {
        self.on_module(module, Metric::Protocols, None, |env, ns| {
            accessors::get_string_by_int(env, ns, key)
        })
    }

    /// Display string of item `key`'s root; see [`export::get_root`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_root(&self, module: Module, key: i32) -> Result<Option<String>> {
        export::get_root(&self.env, &self.catalog, module, key)
    }

    // -- sizes and reporting ------------------------------------------------

    /// Number of distinct items of the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_size_datamap(&self, module: Module) -> Result<u64> {
        self.on_module(module, Metric::DataMap, 0, accessors::cardinality)
    }

    /// Number of distinct unique-visitor keys of the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage call fails.
    pub fn get_size_uniqmap(&self, module: Module) -> Result<u64> {
        self.on_module(module, Metric::UniqMap, 0, accessors::cardinality)
    }

    /// Sorted dump of the module's primary table; see [`export::export`].
    ///
    /// # Errors
    ///
    /// Returns an error if the sync or the scan fails.
    pub fn parse_raw_data(&self, module: Module) -> Result<Option<RawData>> {
        export::export(&self.env, &self.catalog, module)
    }

    /// Flushes deferred commits.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the flush fails.
    pub fn sync(&self, force: bool) -> Result<()> {
        self.env.sync(force)
    }
}
