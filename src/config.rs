//! Configuration of the data store.
//!
//! The database location is an explicit value handed to [crate::Database::open]
//! instead of process-wide state. It can be built in code or loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding every database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Name of the current database, a sub-directory of `data_dir`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Extension of table files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("database")
}

fn default_database() -> String {
    "base".to_string()
}

fn default_extension() -> String {
    "csv".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: default_database(),
            extension: default_extension(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Path of the current database directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database, "base");
        assert_eq!(config.extension, "csv");
        assert_eq!(config.database_path(), PathBuf::from("database/base"));
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::default()
            .with_data_dir("/srv/data")
            .with_database("shop")
            .with_extension("tbl");

        assert_eq!(config.database_path(), PathBuf::from("/srv/data/shop"));
        assert_eq!(config.extension, "tbl");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(r#"database = "shop""#).unwrap();

        assert_eq!(config.database, "shop");
        assert_eq!(config.data_dir, PathBuf::from("database"));
        assert_eq!(config.extension, "csv");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flatdb.toml");

        let config = Config::default().with_data_dir(temp_dir.path()).with_database("x");
        config.save(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/flatdb.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
