//! Append-only log of records that failed to transfer

use crate::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const DEFAULT_LOG_PATH: &str = "migration-errors.log";

pub struct FailureLog {
    path: PathBuf,
    written: usize,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries appended through this handle
    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one entry: timestamp and error, then the pretty-printed `{key, value}`
    pub async fn append(
        &mut self,
        error: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let record = serde_json::json!({ "key": key, "value": value });
        let entry = format!(
            "[{}] {}\n{}\n\n",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            error,
            serde_json::to_string_pretty(&record)?
        );

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        self.written += 1;
        Ok(())
    }
}
