//! Deterministic namespace naming.
//!
//! Per-module tables are named `"<metric-name>-m<module-ordinal>"`
//! (e.g. `db_hits-m4`); global tables use their fixed literal names. Both are
//! persisted, so the format is part of the on-disk contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::{GlobalTable, Metric};
use crate::module::Module;

/// Identifies one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamespaceId {
    /// A table shared by the whole run.
    Global(GlobalTable),
    /// A table scoped to one module.
    Module(Module, Metric),
}

impl NamespaceId {
    /// The persisted namespace name.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            NamespaceId::Global(table) => table.db_name().to_string(),
            NamespaceId::Module(module, metric) => module_namespace_name(module, metric),
        }
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Builds the namespace name for a `(module, metric)` pair.
///
/// # Examples
///
/// ```
/// use logstore_core::{module_namespace_name, Metric, Module};
///
/// assert_eq!(module_namespace_name(Module::Hosts, Metric::Hits), "db_hits-m4");
/// assert_eq!(module_namespace_name(Module::Visitors, Metric::DataMap), "db_datamap-m0");
/// ```
#[must_use]
pub fn module_namespace_name(module: Module, metric: Metric) -> String {
    format!("{}-m{}", metric.db_name(), module.ordinal())
}

/// Every namespace the catalog creates for the given module set: the global
/// tables first, then each module's tables in metric order.
#[must_use]
pub fn catalog_namespaces(modules: &[Module]) -> Vec<NamespaceId> {
    let mut ids: Vec<NamespaceId> = GlobalTable::ALL.into_iter().map(NamespaceId::Global).collect();
    for &module in modules {
        ids.extend(
            Metric::ALL
                .into_iter()
                .map(|metric| NamespaceId::Module(module, metric)),
        );
    }
    ids
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn global_names_are_literal() {
        assert_eq!(NamespaceId::Global(GlobalTable::Hostnames).name(), "db_hostnames");
    }

    #[test]
    fn module_names_embed_ordinal() {
        let id = NamespaceId::Module(Module::StatusCodes, Metric::MaxTime);
        assert_eq!(id.name(), "db_maxts-m13");
        assert_eq!(id.to_string(), "db_maxts-m13");
    }

    #[test]
    fn full_catalog_has_no_collisions() {
        let ids = catalog_namespaces(&Module::ALL);
        assert_eq!(ids.len(), GlobalTable::ALL.len() + Module::ALL.len() * Metric::ALL.len());

        let names: HashSet<String> = ids.iter().map(|id| id.name()).collect();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn catalog_lists_globals_first() {
        let ids = catalog_namespaces(&[Module::Os]);
        assert_eq!(ids[0], NamespaceId::Global(GlobalTable::AgentKeys));
        assert_eq!(ids[5], NamespaceId::Module(Module::Os, Metric::KeyMap));
        assert_eq!(ids.len(), 5 + Metric::ALL.len());
    }
}
