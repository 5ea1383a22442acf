//! logstore storage: transactional per-module key-value tables for log
//! analytics, with typed accessors, auto-increment ids and sorted raw-data
//! export.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod store;

pub use config::StorageConfig;
pub use error::{EngineOp, Result, StorageError};
pub use logging::{init_tracing, LogFormat};
pub use storage::{Allocation, Catalog, Environment, MemoryEngine, Namespace, StorageEngine};
#[cfg(feature = "redb")]
pub use storage::RedbEngine;
pub use store::LogStore;
