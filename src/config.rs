use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATABASE: &str = "session.db";
const DEFAULT_HISTORY_LIMIT: u64 = 10;

/// On-disk layout of `config.toml`. Every section and every field is
/// optional; whatever is present overrides the matching default and nothing
/// else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageSection,
    history: HistorySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct StorageSection {
    data_dir: String,
    database: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct HistorySection {
    limit: u64,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Where the session database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding the database file. Created on open if missing.
    pub data_dir: PathBuf,
    /// File name of the database inside `data_dir`.
    pub database: String,
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    /// Number of records returned by history lookups when the caller gives
    /// no explicit limit.
    pub history_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_config_file(ConfigFile::default())
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config_file: ConfigFile =
            toml::from_str(content).context("Failed to parse config file")?;

        if config_file.storage.database.trim().is_empty() {
            bail!("storage.database must not be empty");
        }

        Ok(Self::from_config_file(config_file))
    }

    /// Loads `path` if it exists, otherwise falls back to the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    fn from_config_file(config_file: ConfigFile) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: config_file.storage.data_dir.into(),
                database: config_file.storage.database,
            },
            history_limit: config_file.history.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.storage.database, "session.db");
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn present_fields_override_only_themselves() {
        let config = Config::from_toml(
            r#"
[storage]
data_dir = "/tmp/sessions"

[history]
limit = 25
"#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/sessions"));
        assert_eq!(config.storage.database, "session.db");
        assert_eq!(config.history_limit, 25);
    }

    #[test]
    fn rejects_empty_database_name() {
        let err = Config::from_toml("[storage]\ndatabase = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("storage.database"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml("[storage\n").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn database_path_joins_dir_and_file() {
        let storage = StorageConfig::new("/var/lib/app");
        assert_eq!(
            storage.database_path(),
            PathBuf::from("/var/lib/app/session.db")
        );
    }
}
