use crate::connection::ConnectionOptions;
use crate::migrate::MigrationOptions;
use crate::registry::{StaticRegistry, VariableDef};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `varstore.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VarstoreConfig {
    /// Connection URI; takes precedence over `[connection]`
    pub url: Option<String>,
    pub connection: ConnectionOptions,
    pub tables: Vec<String>,
    pub migration: MigrationOptions,
    pub variables: Vec<VariableDef>,
}

impl VarstoreConfig {
    /// Resolve connection options, preferring `url_override`, then `url`, then `[connection]`
    pub fn connection_options(&self, url_override: Option<&str>) -> Result<ConnectionOptions> {
        match url_override.or(self.url.as_deref()) {
            Some(url) if !url.trim().is_empty() => {
                let parsed = ConnectionOptions::parse_url(url)?;
                Ok(ConnectionOptions {
                    pool_size: self.connection.pool_size,
                    connect_timeout_secs: self.connection.connect_timeout_secs,
                    ..parsed
                })
            }
            _ => Ok(self.connection.clone()),
        }
    }

    pub fn registry(&self) -> StaticRegistry {
        self.variables.iter().cloned().collect()
    }

    /// Starter configuration written by `varstore init`
    pub fn starter() -> Self {
        Self {
            url: None,
            connection: ConnectionOptions::for_database("varstore.db"),
            tables: vec!["main".to_string()],
            migration: MigrationOptions::default(),
            variables: vec![VariableDef::new("money", "main", 0i64)],
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("varstore.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<VarstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: VarstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &VarstoreConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Configuration(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Configuration(format!("cannot serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VariableRegistry;

    const SAMPLE: &str = r#"
tables = ["main", "points"]

[connection]
database = "vars.db"
pool_size = 4

[migration]
enabled = true
dir = "legacy"

[[variables]]
name = "money"
table = "main"
default = 0

[[variables]]
name = "inventory"
table = "main"
default = { slots = [] }
"#;

    #[test]
    fn test_parse_sample() {
        let config: VarstoreConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.tables, ["main", "points"]);
        assert_eq!(config.connection.database, "vars.db");
        assert_eq!(config.connection.pool_size, 4);
        assert_eq!(config.connection.port, crate::connection::DEFAULT_PORT);
        assert!(config.migration.enabled);
        assert_eq!(config.migration.log_path, PathBuf::from(crate::migrate::DEFAULT_LOG_PATH));

        let registry = config.registry();
        assert!(registry.has("money", "main"));
        assert_eq!(registry.get("inventory", "main").unwrap().default.to_text(), r#"{"slots":[]}"#);
    }

    #[test]
    fn test_url_takes_precedence() {
        let mut config: VarstoreConfig = toml::from_str(SAMPLE).unwrap();
        config.url = Some("sqlite://localhost/from-url.db".to_string());

        let opts = config.connection_options(None).unwrap();
        assert_eq!(opts.database, "from-url.db");
        assert_eq!(opts.pool_size, 4);

        let opts = config.connection_options(Some("sqlite://localhost/flag.db")).unwrap();
        assert_eq!(opts.database, "flag.db");
    }

    #[test]
    fn test_boolean_default_rejected() {
        let bad = r#"
[[variables]]
name = "flag"
table = "main"
default = true
"#;
        assert!(toml::from_str::<VarstoreConfig>(bad).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("varstore.toml");
        write_config(&path, &VarstoreConfig::starter(), false).unwrap();
        assert!(write_config(&path, &VarstoreConfig::starter(), false).is_err());

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, VarstoreConfig::starter());
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }
}
