//! Storage Layer - SQLite-backed persistence
//!
//! Every variable table has the same shape:
//! - `<table>(var, key, value)` with primary key `(var, key)`
//!
//! `__vars__` is always present and holds runtime bookkeeping.

pub mod schema;
pub mod store;

pub use schema::{ensure_table, ensure_tables, validate_table_name, RESERVED_TABLE};
pub use store::{KvStore, Record, SortOrder, VariableStore, sort_by_value};
