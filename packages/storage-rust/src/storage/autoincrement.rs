//! Auto-increment ids for string keys.
//!
//! The next id is the namespace's cardinality plus one. This holds only while
//! keys are never removed from the namespace: a deletion would let a later
//! allocation reuse an id that was already issued. Nothing in this crate
//! deletes records.

use logstore_core::codec::{encode_i32, encode_str_key};
use tracing::trace;

use crate::error::{Result, StorageError};
use crate::storage::accessors::read_i32;
use crate::storage::catalog::Namespace;
use crate::storage::environment::Environment;
use crate::storage::txn::Lookup;

/// Outcome of [`insert_autoincrement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// The key already had this id.
    Existing(i32),
    /// The key was new and got this id.
    Inserted(i32),
}

impl Allocation {
    /// The key's id, new or not.
    #[must_use]
    pub fn id(self) -> i32 {
        match self {
            Allocation::Existing(id) | Allocation::Inserted(id) => id,
        }
    }

    /// `true` if this call stored the key.
    #[must_use]
    pub fn is_new(self) -> bool {
        matches!(self, Allocation::Inserted(_))
    }
}

/// Returns the id stored under `key`, allocating `cardinality + 1` if the key
/// is new. Lookup, count and insert share one write transaction.
///
/// # Errors
///
/// Returns [`StorageError::IdSpaceExhausted`] once the namespace holds
/// `i32::MAX` keys, or the engine's error if the transaction fails.
pub fn insert_autoincrement(env: &Environment, ns: &Namespace, key: &str) -> Result<Allocation> {
    let raw_key = encode_str_key(key);
    env.write(|txn| {
        if let Some(id) = read_i32(&*txn, ns, raw_key)? {
            return Ok(Allocation::Existing(id));
        }
        let id = txn
            .count(ns)?
            .checked_add(1)
            .and_then(|next| i32::try_from(next).ok())
            .ok_or_else(|| StorageError::IdSpaceExhausted(ns.name().to_string()))?;
        txn.put(ns, raw_key, &encode_i32(id))?;
        trace!(namespace = ns.name(), id, "allocated id");
        Ok(Allocation::Inserted(id))
    })
}
