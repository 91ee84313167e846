use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use crate::common::safety::SafetyTier;

// ─── Core types ───────────────────────────────────────────────────────────────

/// Scanner grouping used by front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerCategory {
    System,
    Browser,
    Development,
    Apps,
    Trash,
}

impl ScannerCategory {
    pub const ALL: [ScannerCategory; 5] = [
        ScannerCategory::System,
        ScannerCategory::Browser,
        ScannerCategory::Development,
        ScannerCategory::Apps,
        ScannerCategory::Trash,
    ];
}

impl std::fmt::Display for ScannerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerCategory::System => write!(f, "System"),
            ScannerCategory::Browser => write!(f, "Browser"),
            ScannerCategory::Development => write!(f, "Development"),
            ScannerCategory::Apps => write!(f, "Apps"),
            ScannerCategory::Trash => write!(f, "Trash"),
        }
    }
}

impl std::str::FromStr for ScannerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScannerCategory::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scanner category '{}'", s))
    }
}

/// One reclaimable unit found by a scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredEntry {
    /// Stable identifier derived from scanner id and path
    pub id: String,

    /// Display name
    pub name: String,

    /// Absolute path at discovery time
    pub path: PathBuf,

    /// Scanner that produced this entry
    pub scanner_id: String,

    /// Category of the producing scanner
    pub category: ScannerCategory,

    /// Total size in bytes
    pub size: u64,

    /// Files beneath the path (1 for a plain file)
    pub file_count: u64,

    /// Directories beneath the path, not counting the path itself
    pub dir_count: u64,

    /// Best-effort; access times are unreliable under indexing and backups
    pub last_accessed: Option<DateTime<Utc>>,

    pub last_modified: Option<DateTime<Utc>>,

    /// Safety tier assigned at discovery
    pub safety: SafetyTier,

    /// Scanner-specific facts, e.g. `bundle_id`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl DiscoveredEntry {
    pub fn new(
        scanner_id: &str,
        category: ScannerCategory,
        name: impl Into<String>,
        path: PathBuf,
    ) -> Self {
        Self {
            id: entry_id(scanner_id, &path),
            name: name.into(),
            path,
            scanner_id: scanner_id.to_string(),
            category,
            size: 0,
            file_count: 0,
            dir_count: 0,
            last_accessed: None,
            last_modified: None,
            safety: SafetyTier::Safe,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_stats(mut self, stats: &super::walker::DirStats) -> Self {
        self.size = stats.size;
        self.file_count = stats.files;
        self.dir_count = stats.dirs;
        self
    }

    pub fn with_times(
        mut self,
        accessed: Option<DateTime<Utc>>,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        self.last_accessed = accessed;
        self.last_modified = modified;
        self
    }

    pub fn with_safety(mut self, tier: SafetyTier) -> Self {
        self.safety = tier;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Deterministic id: the same scanner finding the same path always yields the same id
pub fn entry_id(scanner_id: &str, path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scanner_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}-{}", scanner_id, &digest[..16])
}

// ─── Scan parameters ──────────────────────────────────────────────────────────

/// Parameters shared read-only by every scanner in a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    min_size: u64,
    max_depth: usize,
    #[serde(default)]
    excluded_paths: Vec<PathBuf>,
    #[serde(default)]
    follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(1024 * 1024, 3)
    }
}

impl ScanConfig {
    pub fn new(min_size: u64, max_depth: usize) -> Self {
        Self {
            min_size,
            max_depth,
            excluded_paths: Vec::new(),
            follow_symlinks: false,
        }
    }

    pub fn with_excluded<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.excluded_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn excluded_paths(&self) -> &[PathBuf] {
        &self.excluded_paths
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Check if a path falls under an excluded prefix
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_paths.iter().any(|ex| path.starts_with(ex))
    }

    pub fn meets_size_floor(&self, size: u64) -> bool {
        size >= self.min_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_is_deterministic() {
        let p = Path::new("/Users/test/Library/Caches/com.example.app");
        assert_eq!(entry_id("system_caches", p), entry_id("system_caches", p));
        assert_ne!(entry_id("system_caches", p), entry_id("system_logs", p));
        assert!(entry_id("trash", p).starts_with("trash-"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("browser".parse::<ScannerCategory>(), Ok(ScannerCategory::Browser));
        assert_eq!("Development".parse::<ScannerCategory>(), Ok(ScannerCategory::Development));
        assert!("music".parse::<ScannerCategory>().is_err());
    }

    #[test]
    fn test_exclusion_is_component_wise() {
        let config = ScanConfig::default().with_excluded(["/a/keep"]);
        assert!(config.is_excluded(Path::new("/a/keep")));
        assert!(config.is_excluded(Path::new("/a/keep/inner")));
        assert!(!config.is_excluded(Path::new("/a/keeper")));
    }

    #[test]
    fn test_entry_serializes_with_stable_names() {
        let entry = DiscoveredEntry::new(
            "trash",
            ScannerCategory::Trash,
            "old.zip",
            PathBuf::from("/Users/test/.Trash/old.zip"),
        )
        .with_safety(SafetyTier::Caution)
        .with_meta("trash_root", "/Users/test/.Trash");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["scanner_id"], "trash");
        assert_eq!(json["category"], "trash");
        assert_eq!(json["safety"], "caution");
        assert_eq!(json["metadata"]["trash_root"], "/Users/test/.Trash");

        let back: DiscoveredEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
