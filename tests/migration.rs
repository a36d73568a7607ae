use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use varstore::migrate::{MigrationEvent, NoProgress, RecordOutcome};
use varstore::{
    ConnectionOptions, Database, ErrorKind, MigrationOptions, Record, StaticRegistry, VariableDef,
    VariableStore,
};

struct Fixture {
    dir: TempDir,
    db: Database,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.db");
        let registry = StaticRegistry::new().with(VariableDef::new("money", "main", 0i64));
        let db = Database::open(
            ConnectionOptions::for_database(path.to_string_lossy()),
            &["main".to_string()],
            Arc::new(registry),
        )
        .await
        .unwrap();
        Self { dir, db }
    }

    fn legacy_root(&self) -> std::path::PathBuf {
        self.dir.path().join("database")
    }

    fn shard(&self, dir: &str, file: &str, contents: &str) {
        let path = self.legacy_root().join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(file), contents).unwrap();
    }

    fn options(&self) -> MigrationOptions {
        MigrationOptions {
            enabled: true,
            dir: self.legacy_root(),
            log_path: self.dir.path().join("migration-errors.log"),
            acknowledge: false,
        }
    }

    async fn count(&self, table: &str) -> i64 {
        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, table);
        self.db
            .store()
            .connection()
            .run(move |conn| Ok(conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?))
            .await
            .unwrap()
    }
}

fn row(var: &str, key: &str, value: &str) -> Record {
    Record {
        var: var.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn log_entries(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.matches("\"key\":").count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_transfers_every_shard() {
    let fx = Fixture::new().await;
    fx.shard(
        "points",
        "points_scheme_1.sql",
        &json!({
            "score_1": {"value": 10},
            "score_2": {"value": "high"},
            "bag_1": {"value": {"items": [1, 2]}},
        })
        .to_string(),
    );
    fx.shard(
        "points",
        "points_scheme_2.sql",
        &json!({"score_123": {"value": 5}, "timer": {"value": "x"}}).to_string(),
    );
    fx.shard("main", "main_scheme_1.sql", &json!({"money_7": {"value": 250}}).to_string());

    let report = fx.db.transfer(fx.options(), &NoProgress).await.unwrap();
    assert_eq!(report.total, 6);
    assert_eq!(report.transferred, 6);
    assert_eq!(report.failed, 0);
    assert_eq!(report.files, 3);
    assert_eq!(report.log_entries, 0);

    let store = fx.db.store();
    let score = store.find_one("points", "score_1").await.unwrap();
    assert_eq!((score.var.as_str(), score.value.as_str()), ("score", "10"));
    assert_eq!(store.find_one("points", "score_2").await.unwrap().value, "high");
    assert_eq!(store.find_one("points", "bag_1").await.unwrap().value, r#"{"items":[1,2]}"#);

    assert_eq!(
        store.find_one("points", "score_123").await,
        Some(row("score", "score_123", "5"))
    );
    assert_eq!(store.find_one("points", "timer").await, Some(row("timer", "timer", "x")));

    assert_eq!(store.get("main", "money", &["7"]).await.as_deref(), Some("250"));
    assert!(!fx.options().log_path.exists());
}

#[tokio::test]
async fn test_reserved_directories_are_skipped() {
    let fx = Fixture::new().await;
    fx.shard("main", "main_scheme_1.sql", &json!({"money_1": {"value": 1}}).to_string());
    let archived = json!({"old_1": {"value": 1}}).to_string();
    fx.shard("reference", "reference_scheme_1.sql", &archived);
    fx.shard(".backup", "main_scheme_1.sql", &archived);
    fx.shard("transaction", "transaction_scheme_1.sql", &archived);
    std::fs::write(fx.legacy_root().join("stray.sql"), "{}").unwrap();

    let report = fx.db.transfer(fx.options(), &NoProgress).await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.files, 1);
    assert_eq!(fx.count("main").await, 1);
    assert!(fx.db.store().try_find_one("reference", "old_1").await.is_err());
}

#[tokio::test]
async fn test_failed_records_do_not_stop_the_run() {
    let fx = Fixture::new().await;
    fx.db
        .store()
        .connection()
        .run(|conn| {
            conn.execute_batch(
                r#"CREATE TRIGGER reject_boom BEFORE INSERT ON "main"
                   WHEN NEW."var" = 'boom'
                   BEGIN SELECT RAISE(ABORT, 'boom rejected'); END;"#,
            )?;
            Ok(())
        })
        .await
        .unwrap();

    fx.shard(
        "main",
        "main_scheme_1.sql",
        &json!({"a_1": {"value": 1}, "boom_2": {"value": 2}, "c_3": {"value": 3}}).to_string(),
    );
    fx.shard(
        "main",
        "main_scheme_2.sql",
        &json!({"boom_5": {"value": 5}, "d_4": {"value": 4}, "e_6": {"missing": true}})
            .to_string(),
    );

    let report = fx.db.transfer(fx.options(), &NoProgress).await.unwrap();
    assert_eq!(report.total, 6);
    assert_eq!(report.transferred, 3);
    assert_eq!(report.failed, 3);
    assert_eq!(report.log_entries, 3);
    assert_eq!(fx.count("main").await, 3);

    let log_path = fx.options().log_path;
    assert_eq!(log_entries(&log_path), 3);
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.matches("boom rejected").count(), 2);
    assert!(log.contains("has no value"));
}

#[tokio::test]
async fn test_unreadable_shard_is_skipped_and_logged() {
    let fx = Fixture::new().await;
    fx.shard("main", "main_scheme_1.sql", "{ not json");
    fx.shard("main", "main_scheme_2.sql", "[1, 2, 3]");
    fx.shard("main", "main_scheme_3.sql", &json!({"money_1": {"value": 9}}).to_string());

    let report = fx.db.transfer(fx.options(), &NoProgress).await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.transferred, 1);
    assert_eq!(report.files, 1);
    assert_eq!(report.skipped_files, 2);
    assert_eq!(report.log_entries, 2);
    assert_eq!(log_entries(&fx.options().log_path), 2);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fx = Fixture::new().await;
    fx.shard(
        "main",
        "main_scheme_1.sql",
        &json!({"money_1": {"value": 1}, "money_2": {"value": 2}}).to_string(),
    );

    fx.db.transfer(fx.options(), &NoProgress).await.unwrap();
    fx.shard(
        "main",
        "main_scheme_1.sql",
        &json!({"money_1": {"value": 100}, "money_2": {"value": 2}}).to_string(),
    );
    let report = fx.db.transfer(fx.options(), &NoProgress).await.unwrap();

    assert_eq!(report.transferred, 2);
    assert_eq!(fx.count("main").await, 2);
    assert_eq!(fx.db.store().get("main", "money", &["1"]).await.as_deref(), Some("100"));
}

#[tokio::test]
async fn test_progress_events() {
    let fx = Fixture::new().await;
    fx.shard(
        "main",
        "main_scheme_1.sql",
        &json!({"money_9": {"value": 9}, "money_1": {"value": 1}}).to_string(),
    );

    let mut options = fx.options();
    options.acknowledge = true;
    let (tx, rx) = crossbeam::channel::unbounded();
    let report = fx.db.transfer(options, &tx).await.unwrap();
    drop(tx);
    let events: Vec<MigrationEvent> = rx.iter().collect();

    assert!(matches!(events.first(), Some(MigrationEvent::Started { total: 2 })));
    assert!(matches!(
        &events[1],
        MigrationEvent::FileStarted { table, file }
            if table == "main" && file == "main_scheme_1.sql"
    ));

    // Records follow the order they appear in the shard.
    let records: Vec<(usize, &str, bool)> = events
        .iter()
        .filter_map(|e| match e {
            MigrationEvent::Record {
                index,
                total: 2,
                key,
                outcome: RecordOutcome::Transferred,
                acknowledged,
                ..
            } => Some((*index, key.as_str(), *acknowledged)),
            _ => None,
        })
        .collect();
    assert_eq!(records, [(1, "money_9", true), (2, "money_1", true)]);

    match events.last() {
        Some(MigrationEvent::Finished { report: finished }) => assert_eq!(finished, &report),
        other => panic!("expected Finished, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_root_is_configuration_error() {
    let fx = Fixture::new().await;
    let err = fx.db.transfer(fx.options(), &NoProgress).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("does not exist"));
}

fn config_for(dir: &TempDir, legacy: &Path) -> varstore::config::VarstoreConfig {
    let toml = format!(
        r#"
url = "sqlite://localhost/{db}"
tables = ["main"]

[migration]
enabled = true
dir = "{legacy}"
log_path = "{log}"

[[variables]]
name = "money"
table = "main"
default = 0
"#,
        db = dir.path().join("vars.db").display(),
        legacy = legacy.display(),
        log = dir.path().join("errors.log").display(),
    );
    toml::from_str(&toml).unwrap()
}

#[tokio::test]
async fn test_from_config_runs_enabled_migration() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    std::fs::create_dir_all(legacy.join("main")).unwrap();
    let shard = json!({"money_3": {"value": 30}}).to_string();
    std::fs::write(legacy.join("main").join("main_scheme_1.sql"), shard).unwrap();

    let config = config_for(&dir, &legacy);
    let db = Database::from_config(&config, None, &NoProgress).await.unwrap();
    assert_eq!(db.store().get("main", "money", &["3"]).await.as_deref(), Some("30"));
    assert_eq!(db.store().get("main", "money", &["4"]).await.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_from_config_survives_failed_migration() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir, &dir.path().join("no-such-dir"));

    let db = Database::from_config(&config, None, &NoProgress).await.unwrap();
    assert!(db.avg_ping().await.is_ok());

    db.store().set("main", "money", &["1"], json!(12)).await;
    assert_eq!(db.store().get("main", "money", &["1"]).await.as_deref(), Some("12"));
}
