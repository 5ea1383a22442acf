//! Error type shared by every storage operation.
//!
//! "Key not found" is not an error: accessors report it as `None` or as a
//! documented zero default. Everything here is a real failure, and the caller
//! decides whether it aborts the run or propagates.

use std::fmt;
use std::path::PathBuf;

use logstore_core::CodecError;
use thiserror::Error;

/// Boxed engine-specific error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The engine step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOp {
    /// Starting a read or write transaction.
    Begin,
    /// Committing a transaction.
    Commit,
    /// Creating or opening a namespace.
    CreateNamespace,
    /// Point lookup.
    Read,
    /// Insert or replace.
    Write,
    /// Cardinality query.
    Stat,
    /// Cursor scan.
    Scan,
    /// Durability flush.
    Sync,
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineOp::Begin => "begin transaction",
            EngineOp::Commit => "commit transaction",
            EngineOp::CreateNamespace => "create namespace",
            EngineOp::Read => "read record",
            EngineOp::Write => "write record",
            EngineOp::Stat => "stat namespace",
            EngineOp::Scan => "scan namespace",
            EngineOp::Sync => "sync environment",
        };
        f.write_str(s)
    }
}

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured database path cannot be used.
    #[error("invalid database path {}: {reason}", path.display())]
    InvalidPath {
        /// Configured path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The engine could not create or map the environment.
    #[error("unable to open environment at {}: {source}", path.display())]
    OpenEnvironment {
        /// Backing file or directory.
        path: PathBuf,
        /// Engine error.
        #[source]
        source: BoxError,
    },

    /// An engine call failed.
    #[error("unable to {op}: {source}")]
    Engine {
        /// Failed step.
        op: EngineOp,
        /// Engine error.
        #[source]
        source: BoxError,
    },

    /// The catalog needs more namespaces than the environment allows.
    #[error("{requested} namespaces requested, environment allows {max}")]
    NamespaceLimit {
        /// Namespaces the catalog needs.
        requested: usize,
        /// Configured maximum.
        max: u32,
    },

    /// The environment reached its configured maximum size.
    #[error("environment is full: {size} bytes used, limit {max}")]
    StorageFull {
        /// Current size in bytes.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// An auto-increment namespace ran out of positive `i32` ids.
    #[error("namespace {0} has no ids left")]
    IdSpaceExhausted(String),

    /// A namespace was used before being created.
    #[error("namespace {0} does not exist")]
    UnknownNamespace(String),

    /// A stored record does not match the accessor's layout.
    #[error("corrupt record: {0}")]
    Codec(#[from] CodecError),

    /// The requested engine is not compiled in.
    #[error("storage engine {0} is not available in this build")]
    EngineUnavailable(&'static str),
}

impl StorageError {
    /// Wraps an engine error for the given step.
    pub fn engine(op: EngineOp, source: impl Into<BoxError>) -> Self {
        Self::Engine {
            op,
            source: source.into(),
        }
    }

    /// `true` when a configured limit was hit; retrying with a larger limit
    /// could succeed.
    #[must_use]
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(
            self,
            Self::NamespaceLimit { .. } | Self::StorageFull { .. } | Self::IdSpaceExhausted(_)
        )
    }

    /// `true` when the caller used the layer incorrectly rather than the
    /// engine failing.
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. } | Self::UnknownNamespace(_) | Self::EngineUnavailable(_)
        )
    }
}
