//! Transient, sorted dumps of one namespace, produced for report rendering.
//!
//! A [`RawData`] is never persisted. The exporter fills it in cursor order and
//! then applies the module's [`ExportPolicy`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::module::Module;

/// How the values of the exported table are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// 32-bit integer values.
    Integer,
    /// NUL-terminated string values.
    String,
}

/// Order applied to the exported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Largest numeric value first.
    NumericDescending,
    /// Byte-wise lexicographic, smallest first.
    LexicographicAscending,
}

/// One exported value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Value of an integer table.
    Int(i32),
    /// Value of a string table.
    Str(String),
}

/// One exported `(key, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataItem {
    /// Integer item id.
    pub key: i32,
    /// Decoded value.
    pub value: RawValue,
}

/// The table a module exports, and how its values are decoded and sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPolicy {
    /// Table holding the module's primary values.
    pub metric: Metric,
    /// Value layout of that table.
    pub kind: ValueKind,
    /// Order of the exported items.
    pub order: SortOrder,
}

impl ExportPolicy {
    /// Visitors export their date strings in lexicographic order; every other
    /// module exports hit counts, largest first.
    #[must_use]
    pub fn for_module(module: Module) -> Self {
        match module {
            Module::Visitors => Self {
                metric: Metric::DataMap,
                kind: ValueKind::String,
                order: SortOrder::LexicographicAscending,
            },
            _ => Self {
                metric: Metric::Hits,
                kind: ValueKind::Integer,
                order: SortOrder::NumericDescending,
            },
        }
    }
}

/// A sorted, in-memory dump of one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawData {
    /// Module the data was exported from.
    pub module: Module,
    /// Value layout of every item.
    pub kind: ValueKind,
    /// Exported items.
    pub items: Vec<RawDataItem>,
}

impl RawData {
    /// Creates an empty dump with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(module: Module, kind: ValueKind, capacity: usize) -> Self {
        Self {
            module,
            kind,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Number of exported items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the namespace was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sorts the items in place. The sort is stable, so items with equal
    /// values keep their cursor order.
    pub fn sort(&mut self, order: SortOrder) {
        self.items.sort_by(|a, b| compare(&a.value, &b.value, order));
    }
}

fn compare(a: &RawValue, b: &RawValue, order: SortOrder) -> Ordering {
    match (order, a, b) {
        (SortOrder::NumericDescending, RawValue::Int(x), RawValue::Int(y)) => y.cmp(x),
        (SortOrder::LexicographicAscending, RawValue::Str(x), RawValue::Str(y)) => {
            x.as_bytes().cmp(y.as_bytes())
        }
        // A dump holds a single value kind; mismatches keep their position.
        _ => Ordering::Equal,
    }
}
