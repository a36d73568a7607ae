//! Connection Layer - pooled access to the SQLite backend
//!
//! - `options`: discrete connection parameters and the connection URI grammar
//! - `manager`: pool construction, table validation, health probes

pub mod options;
pub mod manager;

pub use options::{ConnectionOptions, DEFAULT_POOL_SIZE, DEFAULT_PORT};
pub use manager::{ConnectionManager, SqlitePool};
