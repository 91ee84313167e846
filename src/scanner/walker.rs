use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::types::ScanConfig;

/// Size and entry counts beneath a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirStats {
    pub size: u64,
    pub files: u64,
    pub dirs: u64,
}

/// Walk a path and total its contents.
///
/// Unreadable entries are skipped; a vanished path yields zero stats.
/// Excluded subtrees are not counted.
pub fn dir_stats(path: &Path, config: &ScanConfig) -> DirStats {
    let mut stats = DirStats::default();

    let walker = WalkDir::new(path)
        .follow_links(config.follow_symlinks())
        .into_iter()
        .filter_entry(|e| !config.is_excluded(e.path()))
        .filter_map(|e| e.ok());

    for entry in walker {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            if entry.depth() > 0 {
                stats.dirs += 1;
            }
        } else {
            stats.files += 1;
            stats.size += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }

    stats
}

/// Reclaimable candidates beneath a root, outermost first.
///
/// A child meeting the size floor is reported whole and not descended into.
/// A child that contains an excluded path is never reported whole; its own
/// children are considered instead, down to `max_depth`. Files are candidates
/// only when `include_files` is set.
pub fn collect_candidates(
    root: &Path,
    config: &ScanConfig,
    include_files: bool,
) -> Vec<(PathBuf, DirStats)> {
    let mut found = Vec::new();
    if !config.is_excluded(root) {
        visit(root, 1, config, include_files, &mut found);
    }
    found
}

fn visit(
    dir: &Path,
    depth: usize,
    config: &ScanConfig,
    include_files: bool,
    found: &mut Vec<(PathBuf, DirStats)>,
) {
    if depth > config.max_depth() {
        return;
    }
    for child in children(dir) {
        if config.is_excluded(&child) {
            continue;
        }
        let Ok(meta) = std::fs::symlink_metadata(&child) else {
            continue;
        };
        let is_dir = meta.is_dir()
            || (config.follow_symlinks() && meta.file_type().is_symlink() && child.is_dir());
        if !is_dir && !include_files {
            continue;
        }
        if is_dir && contains_excluded(&child, config) {
            visit(&child, depth + 1, config, include_files, found);
            continue;
        }
        let stats = dir_stats(&child, config);
        if config.meets_size_floor(stats.size) {
            found.push((child, stats));
        }
    }
}

/// True if an excluded path lies strictly beneath `dir`
pub fn contains_excluded(dir: &Path, config: &ScanConfig) -> bool {
    config
        .excluded_paths()
        .iter()
        .any(|ex| ex.starts_with(dir) && ex.as_path() != dir)
}

/// Direct children of a directory; an unreadable directory yields nothing
pub fn children(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            tracing::debug!(path = %dir.display(), error = %e, "cannot list directory");
            Vec::new()
        }
    }
}

/// Last access time, if the filesystem reports one
pub fn last_accessed(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::symlink_metadata(path)
        .ok()
        .and_then(|m| m.accessed().ok())
        .map(DateTime::<Utc>::from)
}

/// Last modification time
pub fn last_modified(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::symlink_metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
}

/// Display name for a path: its final component
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand glob patterns; plain paths pass through unchanged
pub fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    if !pattern.contains('*') {
        return vec![PathBuf::from(pattern)];
    }
    match glob::glob(pattern) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid glob pattern");
            Vec::new()
        }
    }
}
