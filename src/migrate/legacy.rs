//! Legacy file store layout
//!
//! ```text
//! <root>/
//!   main/
//!     main_scheme_1.sql     {"money_42": {"value": 10}, ...}
//!     main_scheme_2.sql
//!   reference/              (skipped)
//! ```

use crate::key::SEPARATOR;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Top-level directories that hold archives rather than tables
pub const RESERVED_DIRS: &[&str] = &["reference", ".backup", "transaction"];

/// Separates the table name from the shard number in a file name
pub const SHARD_MARKER: &str = "_scheme_";

pub type ShardEntries = serde_json::Map<String, serde_json::Value>;

/// One shard file and the table it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFile {
    pub dir: String,
    pub path: PathBuf,
    pub table: String,
}

impl ShardFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Destination table for a shard: the file name up to the shard marker,
/// or the directory name when the file has no marker.
pub fn table_for(file_name: &str, dir: &str) -> String {
    match file_name.split_once(SHARD_MARKER) {
        Some((table, _)) if !table.is_empty() => table.to_string(),
        _ => dir.to_string(),
    }
}

/// Re-derive `(var, key)` from a legacy key.
///
/// `score_123` keeps its key under var `score`; a key with no scope
/// (`timer`, or `timer_`) collapses to the bare variable name.
pub fn destination_key(legacy_key: &str) -> (String, String) {
    let mut parts = legacy_key.split(SEPARATOR);
    let var = parts.next().unwrap_or_default().to_string();
    match parts.next() {
        Some(scope) if !scope.is_empty() => (var, legacy_key.to_string()),
        _ => (var.clone(), var),
    }
}

/// List every shard file under the included directories, sorted by path
pub async fn scan(root: &Path) -> Result<Vec<ShardFile>> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if RESERVED_DIRS.contains(&name.as_str()) {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            dirs.push((name, entry.path()));
        }
    }
    dirs.sort();

    let mut shards = Vec::new();
    for (dir, dir_path) in dirs {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            shards.push(ShardFile {
                table: table_for(&file_name, &dir),
                dir: dir.clone(),
                path,
            });
        }
    }
    Ok(shards)
}

/// Parse a shard as a JSON object of legacy key → entry
pub async fn read_shard(path: &Path) -> Result<ShardEntries> {
    let contents = tokio::fs::read_to_string(path).await?;
    match serde_json::from_str::<serde_json::Value>(&contents)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(Error::Legacy(format!(
            "{} is not a JSON object",
            path.display()
        ))),
    }
}

/// The `value` field of a legacy entry
pub fn entry_value<'a>(key: &str, entry: &'a serde_json::Value) -> Result<&'a serde_json::Value> {
    entry
        .get("value")
        .ok_or_else(|| Error::Legacy(format!("entry `{}` has no value", key)))
}
