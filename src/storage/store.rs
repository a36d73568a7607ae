//! Key-value operations over the variable tables
//!
//! Two layers:
//! - `try_*` methods return `Result` so callers can tell "missing" from "failed"
//! - the [`VariableStore`] methods never fail: errors are logged and degrade to
//!   `None`, an empty list, or a no-op

use super::schema::validate_table_name;
use crate::connection::ConnectionManager;
use crate::key::StorageKey;
use crate::registry::VariableRegistry;
use crate::value::{numeric_key, Value};
use crate::{Error, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Runtime bookkeeping variables, served verbatim without a registry lookup
pub const BOOKKEEPING_VARS: &[&str] = &["cooldown", "setTimeout", "ticketChannel"];

pub const DEFAULT_FIND_LIMIT: usize = 10;
pub const DEFAULT_ALL_LIMIT: usize = 100;

/// A persisted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub var: String,
    pub key: String,
    pub value: String,
}

impl Record {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            var: row.get(0)?,
            key: row.get(1)?,
            value: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        })
    }
}

/// Client-side ordering applied by `all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::Configuration(format!(
                "Invalid order `{}`: must be \"asc\" or \"desc\"",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// Stable sort by numeric value. Non-numeric values are the smallest element.
pub fn sort_by_value(rows: &mut [Record], order: SortOrder) {
    rows.sort_by(|a, b| {
        let ord = numeric_key(&a.value)
            .partial_cmp(&numeric_key(&b.value))
            .unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn like_prefix(prefix: &str) -> String {
    format!("{}%", prefix)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// The operation surface handed to consumers of the store.
///
/// None of these fail; see the `try_*` methods on [`KvStore`] for the
/// error-reporting forms.
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Value of `name` under `scope`, or the registry default
    async fn get(&self, table: &str, name: &str, scope: &[&str]) -> Option<String>;

    /// Upsert a value. Strings and numbers are stored as-is, structured values as JSON.
    async fn set(&self, table: &str, name: &str, scope: &[&str], value: serde_json::Value);

    async fn delete(&self, table: &str, name: &str, scope: &[&str]);

    /// Delete every row whose key starts with `prefix` (SQL `LIKE 'prefix%'`)
    async fn delete_many(&self, table: &str, prefix: &str);

    async fn find_one(&self, table: &str, key: &str) -> Option<Record>;

    async fn find_many(&self, table: &str, prefix: &str, limit: usize) -> Vec<Record>;

    async fn all(&self, table: &str, prefix: &str, limit: usize, order: SortOrder) -> Vec<Record>;

    /// Drop `table`, or the table named by `variable` when given
    async fn drop(&self, table: &str, variable: Option<&str>);
}

/// Variable storage over a pooled connection
#[derive(Clone)]
pub struct KvStore {
    conn: ConnectionManager,
    registry: Arc<dyn VariableRegistry>,
}

impl KvStore {
    pub fn new(conn: ConnectionManager, registry: Arc<dyn VariableRegistry>) -> Self {
        Self { conn, registry }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    pub fn registry(&self) -> &Arc<dyn VariableRegistry> {
        &self.registry
    }

    // ========== Reads ==========

    pub async fn try_get(
        &self,
        table: &str,
        name: &str,
        scope: &[&str],
    ) -> Result<Option<String>> {
        validate_table_name(table)?;
        let bookkeeping = BOOKKEEPING_VARS.contains(&name);
        if !bookkeeping && !self.registry.has(name, table) {
            // Rows left behind by undeclared variables are never served.
            return Ok(None);
        }

        let key = StorageKey::encode(name, scope);
        let stored = self.try_find_one(table, key.as_str()).await?.map(|r| r.value);
        if bookkeeping {
            return Ok(stored);
        }

        Ok(match stored {
            Some(value) if !value.is_empty() => Some(value),
            _ => self
                .registry
                .get(name, table)
                .map(|def| def.default.to_text()),
        })
    }

    /// Row with exactly this key
    pub async fn try_find_one(&self, table: &str, key: &str) -> Result<Option<Record>> {
        validate_table_name(table)?;
        let sql = format!(
            r#"SELECT "var", "key", "value" FROM "{}" WHERE "key" = ?1 LIMIT 1"#,
            table
        );
        let key = key.to_string();
        self.conn
            .run(move |conn| {
                conn.query_row(&sql, [key], Record::from_row)
                    .optional()
                    .map_err(Into::into)
            })
            .await
    }

    /// Up to `limit` rows whose key matches `prefix%`
    pub async fn try_find_many(
        &self,
        table: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        validate_table_name(table)?;
        let sql = format!(
            r#"SELECT "var", "key", "value" FROM "{}" WHERE "key" LIKE ?1 LIMIT ?2"#,
            table
        );
        let pattern = like_prefix(prefix);
        self.conn
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![pattern, sql_limit(limit)], Record::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// Matching rows sorted client-side by numeric value
    pub async fn try_all(
        &self,
        table: &str,
        prefix: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<Record>> {
        let mut rows = self.try_find_many(table, prefix, limit).await?;
        sort_by_value(&mut rows, order);
        Ok(rows)
    }

    // ========== Writes ==========

    pub async fn try_set(
        &self,
        table: &str,
        name: &str,
        scope: &[&str],
        value: &Value,
    ) -> Result<()> {
        let key = StorageKey::encode(name, scope);
        tracing::debug!("set {}.{}", table, key);
        self.upsert(table, name, key.as_str(), &value.to_text()).await
    }

    /// Insert `(var, key, value)` or overwrite the value of an existing `(var, key)`
    pub async fn upsert(&self, table: &str, var: &str, key: &str, value: &str) -> Result<()> {
        validate_table_name(table)?;
        let sql = format!(
            r#"INSERT INTO "{}" ("var", "key", "value") VALUES (?1, ?2, ?3)
               ON CONFLICT ("var", "key") DO UPDATE SET "value" = excluded."value""#,
            table
        );
        let (var, key, value) = (var.to_string(), key.to_string(), value.to_string());
        self.conn
            .run(move |conn| {
                conn.execute(&sql, params![var, key, value])?;
                Ok(())
            })
            .await
    }

    /// Returns the number of rows removed
    pub async fn try_delete(&self, table: &str, name: &str, scope: &[&str]) -> Result<usize> {
        validate_table_name(table)?;
        let sql = format!(r#"DELETE FROM "{}" WHERE "key" = ?1"#, table);
        let key = StorageKey::encode(name, scope).into_string();
        self.conn
            .run(move |conn| conn.execute(&sql, [key]).map_err(Into::into))
            .await
    }

    /// Returns the number of rows removed
    pub async fn try_delete_many(&self, table: &str, prefix: &str) -> Result<usize> {
        validate_table_name(table)?;
        let sql = format!(r#"DELETE FROM "{}" WHERE "key" LIKE ?1"#, table);
        let pattern = like_prefix(prefix);
        self.conn
            .run(move |conn| conn.execute(&sql, [pattern]).map_err(Into::into))
            .await
    }

    pub async fn try_drop(&self, table: &str, variable: Option<&str>) -> Result<()> {
        let target = variable.unwrap_or(table);
        validate_table_name(target)?;
        let sql = format!(r#"DROP TABLE IF EXISTS "{}""#, target);
        self.conn
            .run(move |conn| {
                conn.execute(&sql, [])?;
                Ok(())
            })
            .await?;
        tracing::info!("Dropped table {}", target);
        Ok(())
    }
}

#[async_trait]
impl VariableStore for KvStore {
    async fn get(&self, table: &str, name: &str, scope: &[&str]) -> Option<String> {
        self.try_get(table, name, scope).await.unwrap_or_else(|e| {
            tracing::warn!("get {}.{} failed: {}", table, name, e);
            None
        })
    }

    async fn set(&self, table: &str, name: &str, scope: &[&str], value: serde_json::Value) {
        let value = match Value::from_json(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Refusing to set {}.{}: {}", table, name, e);
                return;
            }
        };
        if let Err(e) = self.try_set(table, name, scope, &value).await {
            tracing::warn!("set {}.{} failed: {}", table, name, e);
        }
    }

    async fn delete(&self, table: &str, name: &str, scope: &[&str]) {
        if let Err(e) = self.try_delete(table, name, scope).await {
            tracing::warn!("delete {}.{} failed: {}", table, name, e);
        }
    }

    async fn delete_many(&self, table: &str, prefix: &str) {
        if let Err(e) = self.try_delete_many(table, prefix).await {
            tracing::warn!("delete_many {} '{}%' failed: {}", table, prefix, e);
        }
    }

    async fn find_one(&self, table: &str, key: &str) -> Option<Record> {
        self.try_find_one(table, key).await.unwrap_or_else(|e| {
            tracing::warn!("find_one {} '{}' failed: {}", table, key, e);
            None
        })
    }

    async fn find_many(&self, table: &str, prefix: &str, limit: usize) -> Vec<Record> {
        self.try_find_many(table, prefix, limit).await.unwrap_or_else(|e| {
            tracing::warn!("find_many {} '{}%' failed: {}", table, prefix, e);
            Vec::new()
        })
    }

    async fn all(&self, table: &str, prefix: &str, limit: usize, order: SortOrder) -> Vec<Record> {
        self.try_all(table, prefix, limit, order).await.unwrap_or_else(|e| {
            tracing::warn!("all {} '{}%' failed: {}", table, prefix, e);
            Vec::new()
        })
    }

    async fn drop(&self, table: &str, variable: Option<&str>) {
        if let Err(e) = self.try_drop(table, variable).await {
            tracing::warn!("drop {} failed: {}", variable.unwrap_or(table), e);
        }
    }
}
