//! Varstore CLI - inspect and migrate variable storage

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use varstore::config::{self, VarstoreConfig};
use varstore::migrate::MigrationOptions;
use varstore::registry::VariableRegistry;
use varstore::storage::store::{DEFAULT_ALL_LIMIT, DEFAULT_FIND_LIMIT};
use varstore::ui;
use varstore::{Database, SortOrder, Value};

#[derive(Parser)]
#[command(name = "varstore")]
#[command(version)]
#[command(about = "Durable variable storage on SQLite, with legacy store migration")]
#[command(long_about = r#"
Varstore keeps a scripting runtime's variables in SQLite tables of
(var, key, value) rows, and can import a legacy JSON file store once.

Example usage:
  varstore init
  varstore check
  varstore migrate --dir ./database
  varstore set --table main money 42 -- 100
  varstore all --table main money_ --order desc
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Connection URI, e.g. sqlite://localhost/varstore.db
    #[arg(long, global = true)]
    url: Option<String>,

    /// Comma-separated table list (overrides the config file)
    #[arg(long, global = true, value_delimiter = ',')]
    tables: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Connect, probe, and create missing tables
    Check,

    /// Import the legacy file store
    Migrate {
        /// Root of the legacy store (defaults to the config value)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Failure log path (defaults to the config value)
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Report acknowledged writes per record
        #[arg(long)]
        acknowledge: bool,
    },

    /// Read a variable
    Get {
        #[arg(short, long)]
        table: Option<String>,
        name: String,
        scope: Vec<String>,
    },

    /// Write a variable; the value is parsed as JSON, falling back to plain text
    Set {
        #[arg(short, long)]
        table: Option<String>,
        name: String,
        scope: Vec<String>,
        #[arg(last = true, required = true)]
        value: String,
    },

    /// Delete a variable
    Delete {
        #[arg(short, long)]
        table: Option<String>,
        name: String,
        scope: Vec<String>,
    },

    /// Delete every row whose key starts with a prefix
    DeleteMany {
        #[arg(short, long)]
        table: Option<String>,
        prefix: String,
    },

    /// List rows whose key starts with a prefix
    Find {
        #[arg(short, long)]
        table: Option<String>,
        prefix: String,
        #[arg(short, long, default_value_t = DEFAULT_FIND_LIMIT)]
        limit: usize,
    },

    /// List rows sorted by numeric value
    All {
        #[arg(short, long)]
        table: Option<String>,
        prefix: String,
        #[arg(short, long, default_value_t = DEFAULT_ALL_LIMIT)]
        limit: usize,
        #[arg(short, long, default_value = "asc")]
        order: SortOrder,
    },

    /// Drop a table
    Drop {
        #[arg(short, long)]
        table: Option<String>,
        /// Drop this table instead of --table
        #[arg(long)]
        variable: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Commands::Init { force } = cli.command {
        config::write_config(&config_path, &VarstoreConfig::starter(), force)?;
        ui::success(&format!("Wrote {}", config_path.display()));
        return Ok(());
    }

    let mut cfg = config::load_config(Some(&config_path))?.unwrap_or_default();
    if !cli.tables.is_empty() {
        cfg.tables = cli.tables.clone();
    }

    let db = match open_database(&cfg, cli.url.as_deref()).await {
        Ok(db) => db,
        Err(e) => {
            ui::error("Could not start the variable store");
            return Err(e);
        }
    };
    let default_table = cfg.tables.first().cloned().unwrap_or_default();
    let store = db.store();

    match cli.command {
        Commands::Init { .. } => unreachable!("handled before connecting"),

        Commands::Check => {
            let endpoint = store.connection().options().endpoint();
            ui::ready(&endpoint, db.last_ping(), db.ready_at(), db.tables());
        }

        Commands::Migrate { dir, log, acknowledge } => {
            let options = MigrationOptions {
                enabled: true,
                dir: dir.unwrap_or_else(|| cfg.migration.dir.clone()),
                log_path: log.unwrap_or_else(|| cfg.migration.log_path.clone()),
                acknowledge: acknowledge || cfg.migration.acknowledge,
            };

            ui::header(&format!("Converting {}", options.dir.display()));
            ui::warn("This may take a while depending on the amount of data.");

            let (progress, tx) = ui::MigrationProgress::new();
            let result = db.transfer(options.clone(), &tx).await;
            drop(tx);
            progress.join();

            let report = result?;
            ui::section(" Migration report ");
            println!("{}", ui::report_table(&report));
            if report.failed > 0 || report.skipped_files > 0 {
                ui::warn(&format!("Failures were logged to {}", options.log_path.display()));
            }
            ui::info(
                "Next",
                "disable the migration option and verify the data before deleting the legacy files",
            );
        }

        Commands::Get { table, name, scope } => {
            let table = table.unwrap_or(default_table);
            let scope: Vec<&str> = scope.iter().map(String::as_str).collect();
            match store.try_get(&table, &name, &scope).await? {
                Some(value) => println!("{}", value),
                None => ui::warn(&format!("{} has no value in {}", name, table)),
            }
        }

        Commands::Set { table, name, scope, value } => {
            let table = table.unwrap_or(default_table);
            let scope: Vec<&str> = scope.iter().map(String::as_str).collect();
            let parsed = serde_json::from_str::<serde_json::Value>(&value)
                .unwrap_or(serde_json::Value::String(value));
            store.try_set(&table, &name, &scope, &Value::from_json(parsed)?).await?;
            ui::success(&format!("Set {} in {}", name, table));
        }

        Commands::Delete { table, name, scope } => {
            let table = table.unwrap_or(default_table);
            let scope: Vec<&str> = scope.iter().map(String::as_str).collect();
            let removed = store.try_delete(&table, &name, &scope).await?;
            ui::success(&format!("Deleted {} row(s)", removed));
        }

        Commands::DeleteMany { table, prefix } => {
            let table = table.unwrap_or(default_table);
            let removed = store.try_delete_many(&table, &prefix).await?;
            ui::success(&format!("Deleted {} row(s) matching '{}%'", removed, prefix));
        }

        Commands::Find { table, prefix, limit } => {
            let table = table.unwrap_or(default_table);
            print_records(&store.try_find_many(&table, &prefix, limit).await?);
        }

        Commands::All { table, prefix, limit, order } => {
            let table = table.unwrap_or(default_table);
            print_records(&store.try_all(&table, &prefix, limit, order).await?);
        }

        Commands::Drop { table, variable } => {
            let table = table.unwrap_or(default_table);
            store.try_drop(&table, variable.as_deref()).await?;
            ui::success(&format!("Dropped {}", variable.as_deref().unwrap_or(&table)));
        }
    }

    Ok(())
}

async fn open_database(cfg: &VarstoreConfig, url: Option<&str>) -> anyhow::Result<Database> {
    let options = cfg.connection_options(url)?;
    let registry: Arc<dyn VariableRegistry> = Arc::new(cfg.registry());
    let db = Database::open(options, &cfg.tables, registry).await?;

    if cfg.migration.enabled {
        tracing::info!("Migration is enabled in the config; run `varstore migrate` to import");
    }
    Ok(db)
}

fn print_records(records: &[varstore::Record]) {
    if records.is_empty() {
        ui::warn("No rows found.");
    } else {
        println!("{}", ui::records_table(records));
    }
}
