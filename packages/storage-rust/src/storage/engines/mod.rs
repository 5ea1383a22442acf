//! [`StorageEngine`](super::engine::StorageEngine) implementations.

mod memory;
#[cfg(feature = "redb")]
mod redb;

pub use memory::MemoryEngine;
#[cfg(feature = "redb")]
pub use redb::{RedbEngine, ENV_FILE_NAME};
