//! Workbench configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.workbench/
//!   config.yaml   (optional; every field has a default)
//! ```
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Store path the directory tree is rooted at.
    pub root: String,
    /// Delay before a `saved` indicator reverts to `idle`.
    pub save_revert_ms: u64,
    /// Capacity of the workspace event channel.
    pub event_capacity: usize,
    pub remote: RemoteConfig,
    pub runner: RunnerConfig,
}

/// Where the HTTP backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Where code runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            root: paths::ROOT.to_owned(),
            save_revert_ms: 1200,
            event_capacity: 64,
            remote: RemoteConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://emkc.org/api/v2/piston".to_owned(),
            timeout_secs: 30,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            timeout_secs: 30,
        }
    }
}

impl WorkbenchConfig {
    pub fn save_revert_delay(&self) -> Duration {
        Duration::from_millis(self.save_revert_ms)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `<home>/.workbench/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".workbench").join("config.yaml")
}

/// Load configuration from `<home>/.workbench/config.yaml`.
///
/// A missing file yields [`WorkbenchConfig::default`]; a malformed one
/// yields `ConfigError::Parse` with the path.
pub fn load_at(home: &Path) -> Result<WorkbenchConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(WorkbenchConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(WorkbenchConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<WorkbenchConfig, ConfigError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
