//! Store configuration and the persisted settings file

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "paperdb";
const DEFAULT_DB_FILE: &str = "papers.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find a data directory for this platform")]
    NoDataDir,

    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connection settings for the SQLite store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path (`:memory:` for a private in-memory store)
    pub path: PathBuf,
    pub foreign_keys: bool,
    /// WAL journal; has no effect on in-memory stores
    pub wal_mode: bool,
    /// How long a writer waits on another process's lock before failing
    pub busy_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            foreign_keys: true,
            wal_mode: false,
            busy_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            foreign_keys: true,
            wal_mode: false,
            busy_timeout: None,
        }
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// `<data_dir>/paperdb/papers.db`, or `papers.db` in the working directory
/// when the platform has no data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

/// User settings, stored as JSON next to the default database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Write logs to daily files here instead of stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(dir.join(APP_DIR).join("settings.json"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn database_config(&self) -> DatabaseConfig {
        match &self.database_path {
            Some(path) => DatabaseConfig::with_path(path),
            None => DatabaseConfig::default(),
        }
    }
}
