//! Startup orchestration and the surface handed to the runtime
//!
//! `open` runs strictly in order: validate and connect, warm-up probe,
//! measured probe, ensure every table (configured order, then `__vars__`).
//! Any failure here is fatal to startup.

use crate::config::VarstoreConfig;
use crate::connection::{ConnectionManager, ConnectionOptions};
use crate::migrate::{MigrationOptions, MigrationPipeline, MigrationReport, ProgressSink};
use crate::registry::VariableRegistry;
use crate::storage::{ensure_tables, KvStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub struct Database {
    store: KvStore,
    ready_at: DateTime<Utc>,
    last_ping: Duration,
}

impl Database {
    pub async fn open(
        options: ConnectionOptions,
        tables: &[String],
        registry: Arc<dyn VariableRegistry>,
    ) -> Result<Self> {
        let endpoint = options.endpoint();
        let conn = ConnectionManager::connect(options, tables).await?;

        // The first round trip warms the pool and is not reported.
        conn.ping().await.ok();
        let last_ping = conn
            .ping()
            .await
            .map_err(|e| {
                Error::Connectivity(format!("health probe against {} failed: {}", endpoint, e))
            })?;

        tracing::info!(
            "Successfully connected to {} (latency {}ms)",
            endpoint,
            last_ping.as_millis()
        );

        ensure_tables(&conn, conn.tables()).await?;

        let ready_at = Utc::now();
        tracing::info!("Ready with tables {:?}", conn.tables());

        Ok(Self {
            store: KvStore::new(conn, registry),
            ready_at,
            last_ping,
        })
    }

    /// Open from a config file's settings and run the migration when enabled.
    ///
    /// The migration is best-effort: a failed run is logged and the handle is
    /// still returned.
    pub async fn from_config(
        config: &VarstoreConfig,
        url_override: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<Self> {
        let options = config.connection_options(url_override)?;
        let registry: Arc<dyn VariableRegistry> = Arc::new(config.registry());
        let db = Self::open(options, &config.tables, registry).await?;

        if config.migration.enabled {
            if let Err(e) = db.transfer(config.migration.clone(), sink).await {
                tracing::warn!("Migration skipped: {}", e);
            }
        }
        Ok(db)
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Configured tables followed by `__vars__`
    pub fn tables(&self) -> &[String] {
        self.store.connection().tables()
    }

    /// Fresh round-trip probe
    pub async fn avg_ping(&self) -> Result<Duration> {
        self.store.connection().ping().await
    }

    /// Latency measured at startup
    pub fn last_ping(&self) -> Duration {
        self.last_ping
    }

    pub fn ready_at(&self) -> DateTime<Utc> {
        self.ready_at
    }

    /// Run the legacy migration once against this database
    pub async fn transfer(
        &self,
        options: MigrationOptions,
        sink: &dyn ProgressSink,
    ) -> Result<MigrationReport> {
        MigrationPipeline::new(self.store.clone(), options).run(sink).await
    }
}
