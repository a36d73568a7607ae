//! Connection pool management

use super::options::ConnectionOptions;
use crate::storage::schema::{validate_table_name, RESERVED_TABLE};
use crate::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Type alias for the SQLite connection pool.
pub type SqlitePool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the pool and the validated table set. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionManager {
    pool: SqlitePool,
    options: Arc<ConnectionOptions>,
    tables: Arc<Vec<String>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.options.endpoint())
            .field("tables", &self.tables)
            .finish()
    }
}

/// Validate the caller's table list and append the reserved bookkeeping table.
pub fn validate_tables(tables: &[String]) -> Result<Vec<String>> {
    if tables.is_empty() {
        return Err(Error::Configuration(
            "Missing variable tables, please provide at least one table.".to_string(),
        ));
    }
    for table in tables {
        validate_table_name(table)?;
    }
    if tables.iter().any(|t| t == RESERVED_TABLE) {
        return Err(Error::Configuration(format!(
            "'{}' is reserved as a table name.",
            RESERVED_TABLE
        )));
    }

    let mut all = tables.to_vec();
    all.push(RESERVED_TABLE.to_string());
    Ok(all)
}

impl ConnectionManager {
    /// Validate the configuration, then open the pool.
    ///
    /// Nothing touches the database file until validation has passed.
    pub async fn connect(options: ConnectionOptions, tables: &[String]) -> Result<Self> {
        let tables = validate_tables(tables)?;
        let path = options.database_path()?;
        if options.pool_size == 0 {
            return Err(Error::Configuration("pool_size must be at least 1".to_string()));
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool_size = options.pool_size;
        let timeout = Duration::from_secs(options.connect_timeout_secs.max(1));

        let pool = tokio::task::spawn_blocking(move || {
            Pool::builder()
                .max_size(pool_size)
                .connection_timeout(timeout)
                .build(manager)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
        .map_err(|e| Error::Connectivity(format!("failed to open {}: {}", path.display(), e)))?;

        tracing::debug!("Opened pool of {} connections to {}", pool_size, options.endpoint());

        Ok(Self {
            pool,
            options: Arc::new(options),
            tables: Arc::new(tables),
        })
    }

    /// Run a blocking operation on a pooled connection without stalling the runtime
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            op(&conn)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Round-trip probe. Failure comes back as a value, never a panic.
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await?;
        Ok(start.elapsed())
    }

    /// Configured tables followed by the reserved bookkeeping table
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
