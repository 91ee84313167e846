use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use super::{discovered, keep_largest, walker, Scanner};
use crate::common::safety::SafetyPolicy;

const MAX_RESULTS: usize = 100;

/// Per-application cache directories under the user cache roots
pub struct CacheScanner {
    roots: Vec<PathBuf>,
    policy: Arc<SafetyPolicy>,
}

impl CacheScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self::with_roots(
            vec![
                home.join("Library/Caches"),
                home.join("Library/Developer/Xcode/DerivedData"),
                home.join(".cache"),
            ],
            policy,
        )
    }

    pub fn with_roots(roots: Vec<PathBuf>, policy: Arc<SafetyPolicy>) -> Self {
        Self { roots, policy }
    }
}

impl Scanner for CacheScanner {
    fn id(&self) -> &str {
        "system_caches"
    }

    fn name(&self) -> &str {
        "System Caches"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::System
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for root in self.roots.iter().filter(|r| r.is_dir()) {
            tracing::debug!(root = %root.display(), "scanning cache root");
            for (path, stats) in walker::collect_candidates(root, config, false) {
                let name = walker::display_name(&path);
                entries.push(discovered(
                    self.id(),
                    self.category(),
                    &self.policy,
                    name,
                    path,
                    &stats,
                ));
            }
        }

        keep_largest(&mut entries, MAX_RESULTS);
        Ok(entries)
    }
}
