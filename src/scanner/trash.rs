use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use super::{discovered, walker, Scanner};
use crate::common::permissions;
use crate::common::safety::SafetyPolicy;

/// Items sitting in the user trash and in mounted-volume trashes.
///
/// The trash folder itself is never deleted; each item inside it is an
/// entry of its own. Trashed items are reported whatever their size.
/// A volume trash holds one folder per user id, so its items sit one level
/// below the folder the volume pattern matches.
pub struct TrashScanner {
    user_trash: PathBuf,
    volume_pattern: Option<String>,
    policy: Arc<SafetyPolicy>,
}

impl TrashScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self {
            user_trash: home.join(".Trash"),
            volume_pattern: Some("/Volumes/*/.Trashes".to_string()),
            policy,
        }
    }

    /// Scanner over a single trash folder
    pub fn with_root(user_trash: PathBuf, policy: Arc<SafetyPolicy>) -> Self {
        Self {
            user_trash,
            volume_pattern: None,
            policy,
        }
    }

    /// Glob matching the `.Trashes` folder of each mounted volume
    pub fn with_volume_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.volume_pattern = Some(pattern.into());
        self
    }

    fn roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.user_trash.clone()];
        if let Some(pattern) = &self.volume_pattern {
            for volume_trash in walker::expand_glob(pattern) {
                roots.extend(
                    walker::children(&volume_trash)
                        .into_iter()
                        .filter(|user_dir| user_dir.is_dir()),
                );
            }
        }
        roots
    }
}

impl Scanner for TrashScanner {
    fn id(&self) -> &str {
        "trash"
    }

    fn name(&self) -> &str {
        "Trash"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Trash
    }

    /// Listing the user trash needs Full Disk Access on macOS
    fn is_available(&self) -> bool {
        permissions::can_list(&self.user_trash)
    }

    fn estimated_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1)
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for root in self.roots().into_iter().filter(|r| r.is_dir()) {
            let root_label = root.display().to_string();
            for item in walker::children(&root) {
                if config.is_excluded(&item) || walker::contains_excluded(&item, config) {
                    continue;
                }
                // Finder bookkeeping, not something the user trashed
                if item.file_name().is_some_and(|n| n == ".DS_Store") {
                    continue;
                }
                let stats = walker::dir_stats(&item, config);
                let name = walker::display_name(&item);
                entries.push(
                    discovered(self.id(), self.category(), &self.policy, name, item, &stats)
                        .with_meta("trash_root", root_label.as_str()),
                );
            }
        }

        entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }
}
