//! Table kinds stored per module, plus the tables shared by the whole run.

use serde::{Deserialize, Serialize};

/// A table kind scoped to a [`Module`](crate::Module).
///
/// The canonical name is persisted as part of the namespace name and must not
/// change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// String key -> auto-increment id.
    KeyMap,
    /// Root id -> root display string.
    RootMap,
    /// Item id -> display string.
    DataMap,
    /// Unique visitor key -> auto-increment id.
    UniqMap,
    /// Item id -> root id.
    Root,
    /// Item id -> hit count.
    Hits,
    /// Item id -> visitor count.
    Visitors,
    /// Item id -> bytes served.
    Bandwidth,
    /// Item id -> cumulative time served.
    CumulativeTime,
    /// Item id -> maximum time served.
    MaxTime,
    /// Item id -> request method.
    Methods,
    /// Item id -> request protocol.
    Protocols,
    /// Item id -> agent list.
    Agents,
    /// Metadata key -> aggregated value.
    Metadata,
}

impl Metric {
    /// Every metric, in catalog order.
    pub const ALL: [Metric; 14] = [
        Metric::KeyMap,
        Metric::RootMap,
        Metric::DataMap,
        Metric::UniqMap,
        Metric::Root,
        Metric::Hits,
        Metric::Visitors,
        Metric::Bandwidth,
        Metric::CumulativeTime,
        Metric::MaxTime,
        Metric::Methods,
        Metric::Protocols,
        Metric::Agents,
        Metric::Metadata,
    ];

    /// Canonical table name; prefix of every per-module namespace name.
    #[must_use]
    pub fn db_name(self) -> &'static str {
        match self {
            Metric::KeyMap => "db_keymap",
            Metric::RootMap => "db_rootmap",
            Metric::DataMap => "db_datamap",
            Metric::UniqMap => "db_uniqmap",
            Metric::Root => "db_root",
            Metric::Hits => "db_hits",
            Metric::Visitors => "db_visitors",
            Metric::Bandwidth => "db_bw",
            Metric::CumulativeTime => "db_cumts",
            Metric::MaxTime => "db_maxts",
            Metric::Methods => "db_methods",
            Metric::Protocols => "db_protocols",
            Metric::Agents => "db_agents",
            Metric::Metadata => "db_metadata",
        }
    }
}

/// Tables that are not scoped by module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalTable {
    /// User agent string -> auto-increment id.
    AgentKeys,
    /// Agent id -> user agent string.
    AgentValues,
    /// General statistic name -> counter.
    GeneralStats,
    /// IP address -> resolved hostname.
    Hostnames,
    /// Unique visitor key -> auto-increment id.
    UniqueKeys,
}

impl GlobalTable {
    /// Every global table, in creation order.
    pub const ALL: [GlobalTable; 5] = [
        GlobalTable::AgentKeys,
        GlobalTable::AgentValues,
        GlobalTable::GeneralStats,
        GlobalTable::Hostnames,
        GlobalTable::UniqueKeys,
    ];

    /// Fixed literal namespace name.
    #[must_use]
    pub fn db_name(self) -> &'static str {
        match self {
            GlobalTable::AgentKeys => "db_agent_keys",
            GlobalTable::AgentValues => "db_agent_vals",
            GlobalTable::GeneralStats => "db_gen_stats",
            GlobalTable::Hostnames => "db_hostnames",
            GlobalTable::UniqueKeys => "db_unique_keys",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn metric_names_are_distinct() {
        let names: HashSet<_> = Metric::ALL.iter().map(|m| m.db_name()).collect();
        assert_eq!(names.len(), Metric::ALL.len());
    }

    #[test]
    fn global_names_do_not_clash_with_metric_prefixes() {
        for table in GlobalTable::ALL {
            for metric in Metric::ALL {
                assert_ne!(table.db_name(), metric.db_name());
            }
        }
    }

    #[test]
    fn abbreviated_metric_names() {
        assert_eq!(Metric::Bandwidth.db_name(), "db_bw");
        assert_eq!(Metric::CumulativeTime.db_name(), "db_cumts");
        assert_eq!(Metric::MaxTime.db_name(), "db_maxts");
        assert_eq!(GlobalTable::AgentValues.db_name(), "db_agent_vals");
    }
}
