use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::errors::{ReclaimError, ReclaimResult};
use crate::scanner::types::ScanConfig;

/// Global reclaim configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Entries smaller than this are not reported
    #[serde(default = "default_min_size")]
    pub min_size_bytes: u64,

    /// How deep scanners descend below their roots when looking for candidates
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Paths to exclude from scanning (prefixes, `~` expanded)
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Extra prefixes that must never be deleted, on top of the built-in deny-list
    #[serde(default)]
    pub protected_paths: Vec<String>,

    /// Where the deletion journal lives; defaults to `<data_dir>/history.jsonl`
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

fn default_min_size() -> u64 {
    1024 * 1024
}
fn default_max_depth() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size(),
            max_depth: default_max_depth(),
            exclude_paths: Vec::new(),
            follow_symlinks: false,
            protected_paths: Vec::new(),
            journal_path: None,
        }
    }
}

impl Config {
    /// Default data directory (~/.reclaim)
    pub fn default_data_dir() -> ReclaimResult<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".reclaim"))
            .ok_or(ReclaimError::NoHomeDirectory)
    }

    /// Config file path inside a data directory
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.toml")
    }

    /// Logs directory inside a data directory
    pub fn logs_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("logs")
    }

    /// Journal location, honoring the override
    pub fn journal_path(&self, data_dir: &Path) -> PathBuf {
        self.journal_path
            .clone()
            .unwrap_or_else(|| data_dir.join("history.jsonl"))
    }

    /// Load config from `<data_dir>/config.toml`, or defaults if it does not exist
    pub fn load(data_dir: &Path) -> ReclaimResult<Self> {
        let path = Self::config_path(data_dir);
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|e| ReclaimError::io(&path, e))?;
        toml::from_str(&contents).map_err(|e| ReclaimError::Config {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    /// Save config to `<data_dir>/config.toml`
    pub fn save(&self, data_dir: &Path) -> ReclaimResult<()> {
        let path = Self::config_path(data_dir);
        std::fs::create_dir_all(data_dir).map_err(|e| ReclaimError::io(data_dir, e))?;
        let contents = toml::to_string_pretty(self).map_err(|e| ReclaimError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, contents).map_err(|e| ReclaimError::io(&path, e))
    }

    /// Build the immutable scan parameters shared by every scanner
    pub fn scan_config(&self, home: &Path) -> ScanConfig {
        ScanConfig::new(self.min_size_bytes, self.max_depth)
            .with_excluded(self.exclude_paths.iter().map(|p| expand_home(p, home)))
            .with_follow_symlinks(self.follow_symlinks)
    }

    /// Configured extra protected prefixes, `~` expanded
    pub fn protected_prefixes(&self, home: &Path) -> Vec<PathBuf> {
        self.protected_paths
            .iter()
            .map(|p| expand_home(p, home))
            .collect()
    }
}

/// Expand a leading `~` against the given home directory
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
