//! Optional JSON config file plus command-line overrides.
//!
//! The file lives at `<config dir>/quire/config.json` unless `--config`
//! names another one. Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use quire_view::DEFAULT_CONTENT_KEY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::CliArgs;

const APP_DIR: &str = "quire";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no store directory: pass --store-dir or set store_dir in the config")]
    NoStoreDir,
}

/// `<config dir>/quire`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// `<config dir>/quire/config.json`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.json"))
}

/// `<data dir>/quire`
pub fn default_store_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_dir: Option<PathBuf>,
    pub content_key: String,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            content_key: DEFAULT_CONTENT_KEY.to_string(),
            log_level: None,
        }
    }
}

impl Config {
    /// Reads `path`; a missing file is the default config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit` if given, else the default config file if there is one.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit.map(Path::to_path_buf).or_else(config_file) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(dir) = &args.store_dir {
            self.store_dir = Some(dir.clone());
        }
        if let Some(key) = &args.key {
            self.content_key = key.clone();
        }
        if let Some(level) = &args.log_level {
            self.log_level = Some(level.clone());
        }
    }

    pub fn store_dir(&self) -> Result<PathBuf, ConfigError> {
        self.store_dir
            .clone()
            .or_else(default_store_dir)
            .ok_or(ConfigError::NoStoreDir)
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    pub fn default_log_filter() -> &'static str {
        DEFAULT_LOG_FILTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.content_key, "content");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"store_dir":"/data/notes"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store_dir, Some(PathBuf::from("/data/notes")));
        assert_eq!(config.content_key, "content");
        assert_eq!(config.log_filter(), None);
    }

    #[test]
    fn invalid_file_reports_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = Config {
            store_dir: Some(PathBuf::from("/from/file")),
            content_key: "file-key".to_string(),
            log_level: Some("info".to_string()),
        };
        let args = CliArgs::parse_from(["quire", "show", "--key", "flag-key", "--store-dir", "/from/flag"]);

        config.apply_overrides(&args);

        assert_eq!(config.store_dir().unwrap(), PathBuf::from("/from/flag"));
        assert_eq!(config.content_key, "flag-key");
        assert_eq!(config.log_filter(), Some("info"));
    }
}
