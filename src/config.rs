//! Configuration loading and management
//!
//! Handles parsing of the `config.toml` file found in the user's config
//! directory (or wherever `--config` / `TASKTRACK_CONFIG` points).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{DEFAULT_ID_LEN, MAX_ID_LEN, MIN_ID_LEN};
use crate::store::DEFAULT_BUSY_TIMEOUT_MS;

/// File name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// File name of the task database inside the data directory
pub const DB_FILE: &str = "tasks.db";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Task store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Task creation configuration
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Listing configuration
    #[serde(default)]
    pub list: ListConfig,
}

/// Task store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file; defaults to the user's data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How long a writer waits for another process, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Task creation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Length of generated task ids
    #[serde(default = "default_id_length")]
    pub id_length: usize,
}

fn default_id_length() -> usize {
    DEFAULT_ID_LEN
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            id_length: default_id_length(),
        }
    }
}

/// Listing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Days of completed tasks shown alongside active ones
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,
}

fn default_recent_days() -> i64 {
    1
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Database path: the configured one, else the default data location
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store.busy_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.busy_timeout_ms must be > 0".to_string(),
            ));
        }
        if let Some(path) = &self.store.path {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "store.path cannot be empty".to_string(),
                ));
            }
        }
        if !(MIN_ID_LEN..=MAX_ID_LEN).contains(&self.tasks.id_length) {
            return Err(Error::InvalidConfig(format!(
                "tasks.id_length must be between {MIN_ID_LEN} and {MAX_ID_LEN}"
            )));
        }
        if self.list.recent_days < 0 {
            return Err(Error::InvalidConfig(
                "list.recent_days must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "tasktrack").ok_or_else(|| {
        Error::InvalidConfig("cannot determine home directory".to_string())
    })
}

/// Default configuration file location
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

/// Default database location
pub fn default_db_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(DB_FILE))
}
