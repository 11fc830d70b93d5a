//! Configuration for the coderev pipeline.
//!
//! Lives in `.coderev/config.yaml`, found by walking up from the working
//! directory (so any subdirectory of a configured project works). The
//! pipeline itself only consumes these as plain values.

use crate::error::{CoderevError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the config file, searched for in parent directories.
pub const CONFIG_DIR: &str = ".coderev";
/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite review ledger
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Root directory to analyze when none is given on the command line
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Glob matched against file names (not full paths)
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Directory names pruned during traversal
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Reviewer service settings
    #[serde(default)]
    pub reviewer: ReviewerConfig,
}

/// Reviewer service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerConfig {
    /// Batch review endpoint
    #[serde(default = "default_reviewer_endpoint")]
    pub endpoint: String,

    /// Request timeout for one batch call
    #[serde(default = "default_reviewer_timeout")]
    pub timeout_secs: u64,
}

fn default_database_path() -> String {
    dirs::home_dir()
        .map(|h| h.join(CONFIG_DIR).join("coderev.sqlite3"))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "coderev.sqlite3".to_string())
}

fn default_source_dir() -> String {
    ".".to_string()
}

fn default_file_pattern() -> String {
    "*.py".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    crate::discovery::DEFAULT_EXCLUDE_DIR_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_reviewer_endpoint() -> String {
    "http://localhost:8700/review".to_string()
}

fn default_reviewer_timeout() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            source_dir: default_source_dir(),
            file_pattern: default_file_pattern(),
            excluded_dirs: default_excluded_dirs(),
            reviewer: ReviewerConfig::default(),
        }
    }
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_reviewer_endpoint(),
            timeout_secs: default_reviewer_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoderevError::from_io(e, path))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Save configuration to a YAML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a configuration value by key, as shown by `coderev config list`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "database_path" => Some(self.database_path.clone()),
            "source_dir" => Some(self.source_dir.clone()),
            "file_pattern" => Some(self.file_pattern.clone()),
            "excluded_dirs" => Some(self.excluded_dirs.join(",")),
            "reviewer.endpoint" => Some(self.reviewer.endpoint.clone()),
            "reviewer.timeout_secs" => Some(self.reviewer.timeout_secs.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key. `excluded_dirs` takes a
    /// comma-separated list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "database_path" => self.database_path = value.to_string(),
            "source_dir" => self.source_dir = value.to_string(),
            "file_pattern" => self.file_pattern = value.to_string(),
            "excluded_dirs" => {
                self.excluded_dirs = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "reviewer.endpoint" => self.reviewer.endpoint = value.to_string(),
            "reviewer.timeout_secs" => {
                self.reviewer.timeout_secs = value
                    .parse()
                    .map_err(|_| CoderevError::Config(format!("not a number: {value}")))?;
            }
            _ => return Err(CoderevError::Config(format!("unknown key: {key}"))),
        }
        Ok(())
    }

    /// All keys and current values, for `coderev config list`.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        [
            "database_path",
            "source_dir",
            "file_pattern",
            "excluded_dirs",
            "reviewer.endpoint",
            "reviewer.timeout_secs",
        ]
        .iter()
        .map(|key| (*key, self.get(key).unwrap_or_default()))
        .collect()
    }
}

/// Find `.coderev/config.yaml` in the given directory or any of its parents.
pub fn find_config_file(start: &Path) -> Result<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        dir = current.parent();
    }
    Err(CoderevError::NotFound(format!(
        "no {CONFIG_DIR}/{CONFIG_FILE} found in {} or any parent directory",
        start.display()
    )))
}
