//! Layered key-value storage for per-module log statistics.
//!
//! From the bottom up:
//!
//! - **Engine** ([`StorageEngine`]): transactional byte-level namespaces
//! - **Environment** ([`Environment`]): the process-wide engine handle plus
//!   read/write transaction scopes ([`ReadTxn`], [`WriteTxn`])
//! - **Catalog** ([`Catalog`]): fixed namespace handles per module and metric
//! - **Accessors**: typed get/insert/increment helpers, the auto-increment
//!   allocator, and raw-data export for reporting

pub mod accessors;
pub mod autoincrement;
pub mod catalog;
pub mod engine;
pub mod engines;
pub mod environment;
pub mod export;
pub mod txn;

#[cfg(test)]
pub(crate) mod test_support;

pub use autoincrement::{insert_autoincrement, Allocation};
pub use catalog::{Catalog, Namespace};
pub use engine::{ReadScope, ScanVisitor, StorageEngine, WriteScope};
pub use engines::MemoryEngine;
#[cfg(feature = "redb")]
pub use engines::{RedbEngine, ENV_FILE_NAME};
pub use environment::Environment;
pub use export::{export, export_namespace, get_root};
pub use txn::{Lookup, ReadTxn, WriteTxn};
