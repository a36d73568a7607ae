//! Migration from the legacy file store
//!
//! One-shot and best-effort:
//! 1. Counting pass over every shard to size the progress total
//! 2. Transfer pass: each entry is upserted into its destination table
//!
//! A failed record is appended to the failure log and the run moves on.
//! Upserts make re-running safe; there is no resume point, every shard is
//! read again from the start.

pub mod legacy;
pub mod log;
pub mod progress;

pub use legacy::{ShardFile, RESERVED_DIRS};
pub use log::{FailureLog, DEFAULT_LOG_PATH};
pub use progress::{MigrationEvent, NoProgress, ProgressSink, RecordOutcome};

use crate::storage::{ensure_table, KvStore};
use crate::value::stringify;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Where to read the legacy store and where to log failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    /// Run the migration once at startup
    pub enabled: bool,
    pub dir: PathBuf,
    pub log_path: PathBuf,
    /// Report acknowledged writes in per-record progress
    pub acknowledge: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("database"),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            acknowledge: false,
        }
    }
}

/// Totals for one migration run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// Keys found by the counting pass
    pub total: usize,
    pub transferred: usize,
    pub failed: usize,
    pub files: usize,
    /// Shards that could not be read in the transfer pass
    pub skipped_files: usize,
    pub log_entries: usize,
    pub elapsed: Duration,
}

pub struct MigrationPipeline {
    store: KvStore,
    options: MigrationOptions,
}

impl MigrationPipeline {
    pub fn new(store: KvStore, options: MigrationOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    pub async fn run(&self, sink: &dyn ProgressSink) -> Result<MigrationReport> {
        let started = Instant::now();
        let root = &self.options.dir;
        if !root.is_dir() {
            return Err(Error::Configuration(format!(
                "The '{}' folder does not exist.",
                root.display()
            )));
        }

        tracing::info!("Starting conversion of {}", root.display());
        let shards = legacy::scan(root).await?;

        // Counting pass
        let mut total = 0;
        for shard in &shards {
            match legacy::read_shard(&shard.path).await {
                Ok(entries) => total += entries.len(),
                Err(e) => tracing::warn!("Cannot read {}: {}", shard.path.display(), e),
            }
        }
        tracing::info!("Found {} keys to transfer", total);
        sink.emit(MigrationEvent::Started { total });

        let mut log = FailureLog::new(&self.options.log_path);
        let mut report = MigrationReport {
            total,
            ..MigrationReport::default()
        };
        let mut ensured: HashSet<String> = HashSet::new();
        let mut index = 0;

        // Transfer pass
        for shard in &shards {
            sink.emit(MigrationEvent::FileStarted {
                table: shard.table.clone(),
                file: shard.file_name(),
            });

            let entries = match legacy::read_shard(&shard.path).await {
                Ok(entries) => entries,
                Err(e) => {
                    report.skipped_files += 1;
                    let location = shard.path.display().to_string();
                    self.record_failure(&mut log, &e, &location, &serde_json::Value::Null)
                        .await;
                    continue;
                }
            };
            report.files += 1;

            if ensured.insert(shard.table.clone()) {
                let table = shard.table.clone();
                let ensured_table = self
                    .store
                    .connection()
                    .run(move |conn| ensure_table(conn, &table))
                    .await;
                if let Err(e) = ensured_table {
                    // Each record below fails on its own and gets logged.
                    tracing::warn!("Cannot prepare table {}: {}", shard.table, e);
                }
            }

            for (legacy_key, entry) in &entries {
                index += 1;
                let record_started = Instant::now();
                let result = self.transfer_record(&shard.table, legacy_key, entry).await;
                let elapsed = record_started.elapsed();

                let outcome = match result {
                    Ok(()) => {
                        report.transferred += 1;
                        RecordOutcome::Transferred
                    }
                    Err(e) => {
                        report.failed += 1;
                        let value = entry.get("value").unwrap_or(entry);
                        self.record_failure(&mut log, &e, legacy_key, value).await;
                        RecordOutcome::Failed(e.to_string())
                    }
                };

                sink.emit(MigrationEvent::Record {
                    index,
                    total,
                    key: legacy_key.clone(),
                    elapsed,
                    acknowledged: self.options.acknowledge && outcome == RecordOutcome::Transferred,
                    outcome,
                });
            }
        }

        report.log_entries = log.written();
        report.elapsed = started.elapsed();
        tracing::info!(
            "Transfer completed: {} transferred, {} failed in {:?}",
            report.transferred,
            report.failed,
            report.elapsed
        );
        sink.emit(MigrationEvent::Finished {
            report: report.clone(),
        });
        Ok(report)
    }

    async fn transfer_record(
        &self,
        table: &str,
        legacy_key: &str,
        entry: &serde_json::Value,
    ) -> Result<()> {
        let value = legacy::entry_value(legacy_key, entry)?;
        let (var, key) = legacy::destination_key(legacy_key);
        self.store.upsert(table, &var, &key, &stringify(value)).await
    }

    async fn record_failure(
        &self,
        log: &mut FailureLog,
        error: &Error,
        key: &str,
        value: &serde_json::Value,
    ) {
        tracing::warn!("Failed to transfer {}: {}", key, error);
        if let Err(e) = log.append(&error.to_string(), key, value).await {
            tracing::error!("Cannot write {}: {}", log.path().display(), e);
        }
    }
}
