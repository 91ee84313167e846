use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use super::{discovered, keep_largest, walker, Scanner};
use crate::common::safety::SafetyPolicy;

const MAX_RESULTS: usize = 100;

/// Log files and per-application log directories
pub struct LogScanner {
    roots: Vec<PathBuf>,
    policy: Arc<SafetyPolicy>,
}

impl LogScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self::with_roots(
            vec![home.join("Library/Logs"), home.join(".local/state/log")],
            policy,
        )
    }

    pub fn with_roots(roots: Vec<PathBuf>, policy: Arc<SafetyPolicy>) -> Self {
        Self { roots, policy }
    }
}

impl Scanner for LogScanner {
    fn id(&self) -> &str {
        "system_logs"
    }

    fn name(&self) -> &str {
        "System Logs"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::System
    }

    fn estimated_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(2)
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for root in self.roots.iter().filter(|r| r.is_dir()) {
            for (path, stats) in walker::collect_candidates(root, config, true) {
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
