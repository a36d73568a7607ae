//! Database schema definitions
//!
//! Every variable table shares the same shape:
//! `(var TEXT, key TEXT, value TEXT, PRIMARY KEY (var, key))`.

use crate::connection::ConnectionManager;
use crate::{Error, Result};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use std::sync::OnceLock;

/// Table holding runtime bookkeeping (cooldowns, timers, channel bindings)
pub const RESERVED_TABLE: &str = "__vars__";

static TABLE_NAME: OnceLock<Regex> = OnceLock::new();

fn table_name_pattern() -> &'static Regex {
    TABLE_NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid")
    })
}

/// Check that `name` can be interpolated into SQL as a table identifier
pub fn validate_table_name(name: &str) -> Result<()> {
    if table_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Invalid table name `{}`: expected a letter or underscore, then [A-Za-z0-9_]",
            name
        )))
    }
}

/// SQL to create a variable table
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    "var" TEXT NOT NULL,
    "key" TEXT NOT NULL,
    "value" TEXT,
    PRIMARY KEY ("var", "key")
)
"#
    )
}

/// Whether `table` is present in the catalog
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Create `table` with the fixed schema unless it already exists.
///
/// Returns `true` when the table was created by this call.
pub fn ensure_table(conn: &Connection, table: &str) -> Result<bool> {
    validate_table_name(table)?;
    if table_exists(conn, table)? {
        return Ok(false);
    }
    conn.execute(&create_table_sql(table), [])?;
    Ok(true)
}

/// Ensure each table in order, on a pooled connection
pub async fn ensure_tables(conn: &ConnectionManager, tables: &[String]) -> Result<()> {
    for table in tables {
        let name = table.clone();
        let created = conn.run(move |c| ensure_table(c, &name)).await?;
        if created {
            tracing::info!("Created table {}", table);
        }
    }
    Ok(())
}
