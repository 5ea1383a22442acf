//! Raw-data export for report rendering, and the two-level root lookup.

use logstore_core::codec::{decode_i32, decode_str_value, encode_i32};
use logstore_core::{
    ExportPolicy, Metric, Module, RawData, RawDataItem, RawValue, SortOrder, ValueKind,
};
use tracing::{debug, trace};

use crate::error::Result;
use crate::storage::accessors::{read_i32, read_string};
use crate::storage::catalog::{Catalog, Namespace};
use crate::storage::environment::Environment;
use crate::storage::txn::Lookup;

/// Flushes the environment, then dumps the module's primary table as chosen
/// by [`ExportPolicy::for_module`]. Returns `None` if the module is not
/// cataloged.
///
/// # Errors
///
/// Returns the engine's error if the sync or scan fails, or a codec error if
/// a record does not match the table's layout.
pub fn export(env: &Environment, catalog: &Catalog, module: Module) -> Result<Option<RawData>> {
    let policy = ExportPolicy::for_module(module);
    let Some(ns) = catalog.resolve(module, policy.metric) else {
        trace!(%module, "export skipped, module not cataloged");
        return Ok(None);
    };
    env.sync(true)?;
    let data = export_namespace(env, ns, module, policy.kind, policy.order)?;
    debug!(%module, namespace = ns.name(), items = data.len(), "exported raw data");
    Ok(Some(data))
}

/// Dumps every `(int key, value)` record of `ns` in one read transaction and
/// sorts the result. Does not sync.
///
/// # Errors
///
/// Returns the engine's error if the scan fails, or a codec error if a record
/// does not match `kind`.
pub fn export_namespace(
    env: &Environment,
    ns: &Namespace,
    module: Module,
    kind: ValueKind,
    order: SortOrder,
) -> Result<RawData> {
    let mut data = env.read(|txn| {
        let capacity = usize::try_from(txn.count(ns)?).unwrap_or(0);
        let mut data = RawData::with_capacity(module, kind, capacity);
        txn.for_each(ns, &mut |key, value| {
            let key = decode_i32(key)?;
            let value = match kind {
                ValueKind::Integer => RawValue::Int(decode_i32(value)?),
                ValueKind::String => RawValue::Str(decode_str_value(value)?.to_string()),
            };
            data.items.push(RawDataItem { key, value });
            Ok(())
        })?;
        Ok(data)
    })?;
    data.sort(order);
    Ok(data)
}

/// Display string of the root an item belongs to.
///
/// Reads the item's root id from the root table; an absent id (or id `0`)
/// returns `None` without touching the root-map table.
///
/// # Errors
///
/// Returns the engine's error if a lookup fails, or a codec error if a record
/// does not match its table's layout.
pub fn get_root(
    env: &Environment,
    catalog: &Catalog,
    module: Module,
    key: i32,
) -> Result<Option<String>> {
    let (Some(root), Some(rootmap)) = (
        catalog.resolve(module, Metric::Root),
        catalog.resolve(module, Metric::RootMap),
    ) else {
        trace!(%module, "root lookup skipped, module not cataloged");
        return Ok(None);
    };
    env.read(|txn| match read_i32(txn, root, &encode_i32(key))? {
        Some(root_id) if root_id != 0 => read_string(txn, rootmap, &encode_i32(root_id)),
        _ => Ok(None),
    })
}
