//! # Varstore - durable variable storage for scripting runtimes
//!
//! Namespaced key-value storage backed by SQLite.
//!
//! Varstore provides:
//! - Deterministic storage keys built from a variable name and its scope
//! - A pooled connection with health probes and table-name validation
//! - Idempotent creation of `(var, key, value)` tables
//! - CRUD and prefix queries with a silent-degradation compatibility layer
//! - A one-shot migration from the legacy JSON file store

pub mod key;
pub mod value;
pub mod config;
pub mod connection;
pub mod storage;
pub mod registry;
pub mod migrate;
pub mod database;
pub mod ui;

// Re-exports for convenient access
pub use key::StorageKey;
pub use value::Value;
pub use connection::{ConnectionManager, ConnectionOptions};
pub use storage::{KvStore, Record, SortOrder, VariableStore};
pub use registry::{StaticRegistry, VariableDef, VariableRegistry};
pub use migrate::{MigrationOptions, MigrationPipeline, MigrationReport};
pub use database::Database;

/// Result type alias for Varstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Varstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Legacy store error: {0}")]
    Legacy(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Coarse classification of an [`Error`], deciding whether it aborts startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connectivity,
    Operation,
    MigrationRecord,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::ConfigParse(_) => ErrorKind::Configuration,
            Error::Connectivity(_) => ErrorKind::Connectivity,
            Error::Legacy(_) => ErrorKind::MigrationRecord,
            Error::Storage(_)
            | Error::Json(_)
            | Error::Pool(_)
            | Error::UnsupportedValue(_)
            | Error::Task(_)
            | Error::Io(_) => ErrorKind::Operation,
        }
    }

    /// Configuration and connectivity failures abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Connectivity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::Configuration("no tables".into()).is_fatal());
        assert!(Error::Connectivity("refused".into()).is_fatal());
        assert!(!Error::UnsupportedValue("bool".into()).is_fatal());
        assert_eq!(Error::Legacy("missing value".into()).kind(), ErrorKind::MigrationRecord);
    }
}
