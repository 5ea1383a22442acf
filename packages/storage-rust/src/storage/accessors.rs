//! Typed accessors over a single namespace.
//!
//! Every public function runs in its own transaction: one logical operation,
//! one scope. Two calls are never atomic together. Read-modify-write helpers
//! (increments, [`insert_max`]) are safe because the engine admits a single
//! writer transaction at a time.
//!
//! Missing keys are not errors. String lookups return `None`; integer
//! lookups used by the aggregation paths default to `0`, which cannot be told
//! apart from a stored zero.
//!
//! Single-value inserts overwrite an existing value unconditionally.

use logstore_core::codec::{
    decode_i32, decode_str_value, decode_u64, encode_i32, encode_str_key, encode_str_value,
    encode_u64,
};

use crate::error::Result;
use crate::storage::catalog::Namespace;
use crate::storage::environment::Environment;
use crate::storage::txn::{Lookup, WriteTxn};

// ---------------------------------------------------------------------------
// In-transaction helpers
// ---------------------------------------------------------------------------

pub(crate) fn read_i32<L: Lookup>(txn: &L, ns: &Namespace, key: &[u8]) -> Result<Option<i32>> {
    txn.get_raw(ns, key)?
        .map(|raw| decode_i32(&raw))
        .transpose()
        .map_err(Into::into)
}

pub(crate) fn read_u64<L: Lookup>(txn: &L, ns: &Namespace, key: &[u8]) -> Result<Option<u64>> {
    txn.get_raw(ns, key)?
        .map(|raw| decode_u64(&raw))
        .transpose()
        .map_err(Into::into)
}

pub(crate) fn read_string<L: Lookup>(
    txn: &L,
    ns: &Namespace,
    key: &[u8],
) -> Result<Option<String>> {
    match txn.get_raw(ns, key)? {
        Some(raw) => Ok(Some(decode_str_value(&raw)?.to_string())),
        None => Ok(None),
    }
}

fn add_u64(txn: &mut WriteTxn<'_>, ns: &Namespace, key: &[u8], delta: u64) -> Result<u64> {
    let value = read_u64(&*txn, ns, key)?.unwrap_or(0).saturating_add(delta);
    txn.put(ns, key, &encode_u64(value))?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Getters
// ---------------------------------------------------------------------------

/// Integer stored under a string key, or `None` if the key is absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 4 bytes.
pub fn get_int_by_string(env: &Environment, ns: &Namespace, key: &str) -> Result<Option<i32>> {
    env.read(|txn| read_i32(txn, ns, encode_str_key(key)))
}

/// Integer stored under an integer key, `0` if absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 4 bytes.
pub fn get_int_by_int(env: &Environment, ns: &Namespace, key: i32) -> Result<i32> {
    env.read(|txn| read_i32(txn, ns, &encode_i32(key)))
        .map(Option::unwrap_or_default)
}

/// Unsigned value stored under an integer key, `0` if absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 8 bytes.
pub fn get_u64_by_int(env: &Environment, ns: &Namespace, key: i32) -> Result<u64> {
    env.read(|txn| read_u64(txn, ns, &encode_i32(key)))
        .map(Option::unwrap_or_default)
}

/// Unsigned value stored under a string key, `0` if absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 8 bytes.
pub fn get_u64_by_string(env: &Environment, ns: &Namespace, key: &str) -> Result<u64> {
    env.read(|txn| read_u64(txn, ns, encode_str_key(key)))
        .map(Option::unwrap_or_default)
}

/// String stored under a string key, or `None` if absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not a
/// NUL-terminated UTF-8 string.
pub fn get_string_by_string(
    env: &Environment,
    ns: &Namespace,
    key: &str,
) -> Result<Option<String>> {
    env.read(|txn| read_string(txn, ns, encode_str_key(key)))
}

/// String stored under an integer key, or `None` if absent.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not a
/// NUL-terminated UTF-8 string.
pub fn get_string_by_int(env: &Environment, ns: &Namespace, key: i32) -> Result<Option<String>> {
    env.read(|txn| read_string(txn, ns, &encode_i32(key)))
}

/// Number of records in the namespace.
///
/// # Errors
///
/// Returns an error if the engine's stat call fails.
pub fn cardinality(env: &Environment, ns: &Namespace) -> Result<u64> {
    env.read(|txn| txn.count(ns))
}

// ---------------------------------------------------------------------------
// Inserts (overwrite)
// ---------------------------------------------------------------------------

/// Stores `value` under a string key, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the write or commit fails.
pub fn insert_string_keyed_int(
    env: &Environment,
    ns: &Namespace,
    key: &str,
    value: i32,
) -> Result<()> {
    env.write(|txn| txn.put(ns, encode_str_key(key), &encode_i32(value)))
}

/// Stores a string under an integer key, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the write or commit fails.
pub fn insert_int_keyed_string(
    env: &Environment,
    ns: &Namespace,
    key: i32,
    value: &str,
) -> Result<()> {
    env.write(|txn| txn.put(ns, &encode_i32(key), &encode_str_value(value)))
}

/// Stores a string under a string key, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the write or commit fails.
pub fn insert_string_keyed_string(
    env: &Environment,
    ns: &Namespace,
    key: &str,
    value: &str,
) -> Result<()> {
    env.write(|txn| txn.put(ns, encode_str_key(key), &encode_str_value(value)))
}

/// Stores an integer under an integer key, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the write or commit fails.
pub fn insert_int_keyed_int(env: &Environment, ns: &Namespace, key: i32, value: i32) -> Result<()> {
    env.write(|txn| txn.put(ns, &encode_i32(key), &encode_i32(value)))
}

/// Stores an unsigned value under an integer key, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the write or commit fails.
pub fn insert_int_keyed_u64(env: &Environment, ns: &Namespace, key: i32, value: u64) -> Result<()> {
    env.write(|txn| txn.put(ns, &encode_i32(key), &encode_u64(value)))
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Adds `delta` to the integer under `key` (absent counts as 0) and returns
/// the new value. Saturates at the `i32` bounds.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 4 bytes.
pub fn increment_int_keyed_int(
    env: &Environment,
    ns: &Namespace,
    key: i32,
    delta: i32,
) -> Result<i32> {
    let key = encode_i32(key);
    env.write(|txn| {
        let value = read_i32(&*txn, ns, &key)?.unwrap_or(0).saturating_add(delta);
        txn.put(ns, &key, &encode_i32(value))?;
        Ok(value)
    })
}

/// Adds `delta` to the unsigned value under a string key and returns the new
/// value. Saturates at `u64::MAX`.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 8 bytes.
pub fn increment_string_keyed_u64(
    env: &Environment,
    ns: &Namespace,
    key: &str,
    delta: u64,
) -> Result<u64> {
    env.write(|txn| add_u64(txn, ns, encode_str_key(key), delta))
}

/// Adds `delta` to the unsigned value under an integer key and returns the
/// new value. Saturates at `u64::MAX`.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 8 bytes.
pub fn increment_int_keyed_u64(
    env: &Environment,
    ns: &Namespace,
    key: i32,
    delta: u64,
) -> Result<u64> {
    env.write(|txn| add_u64(txn, ns, &encode_i32(key), delta))
}

/// Stores `candidate` only if it is larger than the current value (absent
/// counts as 0). Returns `true` if a write happened.
///
/// # Errors
///
/// Returns an error if the engine fails or the stored value is not 8 bytes.
pub fn insert_max(env: &Environment, ns: &Namespace, key: i32, candidate: u64) -> Result<bool> {
    let key = encode_i32(key);
    env.write(|txn| {
        let current = read_u64(&*txn, ns, &key)?.unwrap_or(0);
        if candidate > current {
            txn.put(ns, &key, &encode_u64(candidate))?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

#[cfg(test)]
mod tests {
    use logstore_core::{GlobalTable, Metric, Module, NamespaceId};
    use proptest::prelude::*;

    use super::*;
    use tempfile::TempDir;

    use crate::storage::catalog::Catalog;
    use crate::storage::test_support::{all_engines, all_engines_uninitialized, TestEnv};

    struct Fixture {
        env: Environment,
        catalog: Catalog,
        _dir: Option<TempDir>,
    }

    impl From<TestEnv> for Fixture {
        fn from(t: TestEnv) -> Self {
            Self {
                env: t.env,
                catalog: t.catalog,
                _dir: t.dir,
            }
        }
    }

    impl Fixture {
        fn new() -> Self {
            TestEnv::memory().into()
        }

        /// One fixture per compiled-in engine.
        fn all() -> Vec<Self> {
            all_engines().into_iter().map(Into::into).collect()
        }

        fn ns(&self, metric: Metric) -> Namespace {
            self.catalog.resolve(Module::Requests, metric).unwrap().clone()
        }

        fn global(&self, table: GlobalTable) -> Namespace {
            self.catalog.global(table).unwrap().clone()
        }
    }

    #[test]
    fn string_keyed_int_round_trip() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::KeyMap);
            assert_eq!(get_int_by_string(&fx.env, &ns, "/index.html").unwrap(), None);

            insert_string_keyed_int(&fx.env, &ns, "/index.html", 7).unwrap();
            assert_eq!(get_int_by_string(&fx.env, &ns, "/index.html").unwrap(), Some(7));
        }
    }

    #[test]
    fn inserts_overwrite_existing_values() {
        for fx in Fixture::all() {
            let keymap = fx.ns(Metric::KeyMap);
            insert_string_keyed_int(&fx.env, &keymap, "k", 1).unwrap();
            insert_string_keyed_int(&fx.env, &keymap, "k", 2).unwrap();
            assert_eq!(get_int_by_string(&fx.env, &keymap, "k").unwrap(), Some(2));

            let datamap = fx.ns(Metric::DataMap);
            insert_int_keyed_string(&fx.env, &datamap, 1, "first").unwrap();
            insert_int_keyed_string(&fx.env, &datamap, 1, "second").unwrap();
            assert_eq!(get_string_by_int(&fx.env, &datamap, 1).unwrap().as_deref(), Some("second"));
            assert_eq!(cardinality(&fx.env, &datamap).unwrap(), 1);
        }
    }

    #[test]
    fn int_keyed_string_round_trip() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::Methods);
            assert_eq!(get_string_by_int(&fx.env, &ns, 3).unwrap(), None);
            insert_int_keyed_string(&fx.env, &ns, 3, "GET").unwrap();
            assert_eq!(get_string_by_int(&fx.env, &ns, 3).unwrap().as_deref(), Some("GET"));
        }
    }

    #[test]
    fn string_keyed_string_round_trip() {
        for fx in Fixture::all() {
            let ns = fx.global(GlobalTable::Hostnames);
            assert_eq!(get_string_by_string(&fx.env, &ns, "8.8.8.8").unwrap(), None);
            insert_string_keyed_string(&fx.env, &ns, "8.8.8.8", "dns.google").unwrap();
            assert_eq!(
                get_string_by_string(&fx.env, &ns, "8.8.8.8").unwrap().as_deref(),
                Some("dns.google")
            );
        }
    }

    #[test]
    fn int_keyed_int_defaults_to_zero() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::Root);
            assert_eq!(get_int_by_int(&fx.env, &ns, 9).unwrap(), 0);
            insert_int_keyed_int(&fx.env, &ns, 9, 4).unwrap();
            insert_int_keyed_int(&fx.env, &ns, 9, 5).unwrap();
            assert_eq!(get_int_by_int(&fx.env, &ns, 9).unwrap(), 5);
        }
    }

    #[test]
    fn u64_values_round_trip() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::Bandwidth);
            assert_eq!(get_u64_by_int(&fx.env, &ns, 1).unwrap(), 0);
            insert_int_keyed_u64(&fx.env, &ns, 1, u64::from(u32::MAX) + 10).unwrap();
            assert_eq!(get_u64_by_int(&fx.env, &ns, 1).unwrap(), 4_294_967_305);
        }
    }

    #[test]
    fn increments_return_new_value() {
        for fx in Fixture::all() {
            let hits = fx.ns(Metric::Hits);
            assert_eq!(increment_int_keyed_int(&fx.env, &hits, 1, 3).unwrap(), 3);
            assert_eq!(increment_int_keyed_int(&fx.env, &hits, 1, 4).unwrap(), 7);
            assert_eq!(get_int_by_int(&fx.env, &hits, 1).unwrap(), 7);

            let bw = fx.ns(Metric::Bandwidth);
            assert_eq!(increment_int_keyed_u64(&fx.env, &bw, 1, 1024).unwrap(), 1024);
            assert_eq!(increment_int_keyed_u64(&fx.env, &bw, 1, 512).unwrap(), 1536);

            let meta = fx.ns(Metric::Metadata);
            assert_eq!(increment_string_keyed_u64(&fx.env, &meta, "bytes", 10).unwrap(), 10);
            assert_eq!(increment_string_keyed_u64(&fx.env, &meta, "bytes", 5).unwrap(), 15);
            assert_eq!(get_u64_by_string(&fx.env, &meta, "bytes").unwrap(), 15);
        }
    }

    #[test]
    fn increments_saturate() {
        for fx in Fixture::all() {
            let hits = fx.ns(Metric::Hits);
            insert_int_keyed_int(&fx.env, &hits, 1, i32::MAX - 1).unwrap();
            assert_eq!(increment_int_keyed_int(&fx.env, &hits, 1, 5).unwrap(), i32::MAX);

            let bw = fx.ns(Metric::Bandwidth);
            insert_int_keyed_u64(&fx.env, &bw, 1, u64::MAX).unwrap();
            assert_eq!(increment_int_keyed_u64(&fx.env, &bw, 1, 1).unwrap(), u64::MAX);
        }
    }

    #[test]
    fn insert_max_only_writes_larger_values() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::MaxTime);
            assert!(insert_max(&fx.env, &ns, 1, 300).unwrap());
            assert!(!insert_max(&fx.env, &ns, 1, 200).unwrap());
            assert!(!insert_max(&fx.env, &ns, 1, 300).unwrap());
            assert_eq!(get_u64_by_int(&fx.env, &ns, 1).unwrap(), 300);

            // Absent counts as 0, so a zero candidate writes nothing.
            assert!(!insert_max(&fx.env, &ns, 2, 0).unwrap());
            assert_eq!(cardinality(&fx.env, &ns).unwrap(), 1);
        }
    }

    #[test]
    fn mismatched_layout_is_a_codec_error() {
        let fx = Fixture::new();
        let ns = fx.ns(Metric::Hits);
        insert_int_keyed_int(&fx.env, &ns, 1, 5).unwrap();
        let err = get_u64_by_int(&fx.env, &ns, 1).unwrap_err();
        assert!(matches!(err, crate::StorageError::Codec(_)));
    }

    #[test]
    fn cardinality_counts_distinct_keys() {
        for fx in Fixture::all() {
            let ns = fx.ns(Metric::Hits);
            for key in [1, 2, 3, 2, 1] {
                increment_int_keyed_int(&fx.env, &ns, key, 1).unwrap();
            }
            assert_eq!(cardinality(&fx.env, &ns).unwrap(), 3);
        }
    }

    #[test]
    fn namespaces_are_isolated() {
        for fx in Fixture::all() {
            let requests = fx.ns(Metric::Hits);
            let hosts = fx.catalog.resolve(Module::Hosts, Metric::Hits).unwrap().clone();
            increment_int_keyed_int(&fx.env, &requests, 1, 1).unwrap();
            assert_eq!(get_int_by_int(&fx.env, &hosts, 1).unwrap(), 0);
            assert_eq!(hosts.id(), NamespaceId::Module(Module::Hosts, Metric::Hits));
        }
    }

    #[test]
    fn writes_to_uncreated_namespace_are_misuse() {
        let ns = Fixture::new().ns(Metric::Hits);
        for bare in all_engines_uninitialized() {
            let env = &bare.env;
            let err = increment_int_keyed_int(env, &ns, 1, 1).unwrap_err();
            assert!(
                matches!(err, crate::StorageError::UnknownNamespace(ref n) if n == ns.name()),
                "{}: {err}",
                env.engine_name()
            );
            assert!(insert_int_keyed_string(env, &ns, 1, "x").unwrap_err().is_misuse());
            assert!(insert_max(env, &ns, 1, 5).unwrap_err().is_misuse());
            assert!(cardinality(env, &ns).unwrap_err().is_misuse());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn repeated_increments_accumulate(delta in 1i32..1000, n in 1usize..40) {
            let fx = Fixture::new();
            let ns = fx.ns(Metric::Hits);
            for _ in 0..n {
                increment_int_keyed_int(&fx.env, &ns, 42, delta).unwrap();
            }
            let expected = delta * i32::try_from(n).unwrap();
            prop_assert_eq!(get_int_by_int(&fx.env, &ns, 42).unwrap(), expected);
        }

        #[test]
        fn max_aggregation_is_order_independent(a in any::<u64>(), b in any::<u64>()) {
            let fx = Fixture::new();
            let ns = fx.ns(Metric::MaxTime);
            insert_max(&fx.env, &ns, 1, a).unwrap();
            insert_max(&fx.env, &ns, 1, b).unwrap();
            insert_max(&fx.env, &ns, 2, b).unwrap();
            insert_max(&fx.env, &ns, 2, a).unwrap();
            prop_assert_eq!(get_u64_by_int(&fx.env, &ns, 1).unwrap(), a.max(b));
            prop_assert_eq!(get_u64_by_int(&fx.env, &ns, 2).unwrap(), a.max(b));
        }
    }
}
