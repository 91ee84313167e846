use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::journal::{HistoryJournal, JournalEntry};
use crate::apps::resolver::RelatedFile;
use crate::common::permissions;
use crate::common::safety::{normalize, Refusal, SafetyPolicy, SafetyTier};
use crate::scanner::types::DiscoveredEntry;

/// Performs the actual removal of a path
pub trait PathRemover: Send + Sync {
    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Removes directories recursively and everything else as a single file.
/// Symlinks are removed themselves, never followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl PathRemover for FsRemover {
    fn remove(&self, path: &Path) -> std::io::Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }
}

/// One path selected for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionTarget {
    pub path: PathBuf,
    pub size: u64,
    /// Tier assigned at discovery; `Protected` is never deleted
    pub safety: SafetyTier,
    pub label: String,
}

impl DeletionTarget {
    pub fn new(path: impl Into<PathBuf>, size: u64, safety: SafetyTier) -> Self {
        let path = path.into();
        let label = crate::scanner::walker::display_name(&path);
        Self {
            path,
            size,
            safety,
            label,
        }
    }
}

impl From<&DiscoveredEntry> for DeletionTarget {
    fn from(entry: &DiscoveredEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            safety: entry.safety,
            label: entry.name.clone(),
        }
    }
}

impl From<&RelatedFile> for DeletionTarget {
    fn from(file: &RelatedFile) -> Self {
        Self::new(file.path.clone(), file.size, file.safety)
    }
}

/// Why a target was deliberately left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    /// On the protected deny-list
    Protected,
    /// Belongs to a running process
    InUse { executable: PathBuf },
    /// Gone since it was discovered
    NotFound,
    /// An ancestor in the same batch already covers it
    CoveredByParent { parent: PathBuf },
    /// System-wide location left to the administrator
    SystemOwned,
    /// The owning application is running
    AppRunning,
    /// The owning application ships with the OS
    SystemApp,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Protected => write!(f, "protected path"),
            SkipReason::InUse { executable } => {
                write!(f, "in use by {}", executable.display())
            }
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::CoveredByParent { parent } => {
                write!(f, "covered by {}", parent.display())
            }
            SkipReason::SystemOwned => write!(f, "system-owned location"),
            SkipReason::AppRunning => write!(f, "application is running"),
            SkipReason::SystemApp => write!(f, "system application"),
        }
    }
}

impl From<Refusal> for SkipReason {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::Protected => SkipReason::Protected,
            Refusal::InUse { executable } => SkipReason::InUse { executable },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a batch, split into succeeded, skipped and failed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Bytes freed, or that would be freed when simulated
    pub bytes_freed: u64,
    /// Paths removed (or that would be), in processing order
    pub removed: Vec<PathBuf>,
    pub failures: Vec<FailedItem>,
    pub skipped_items: Vec<SkippedItem>,
    pub duration: Duration,
    pub simulated: bool,
}

impl ExecutionResult {
    fn empty(simulate: bool) -> Self {
        Self {
            simulated: simulate,
            ..Self::default()
        }
    }

    fn skip(&mut self, path: &Path, reason: SkipReason) {
        tracing::debug!(path = %path.display(), %reason, "skipped");
        self.skipped += 1;
        self.skipped_items.push(SkippedItem {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn fail(&mut self, path: &Path, reason: String) {
        tracing::warn!(path = %path.display(), %reason, "deletion failed");
        self.failed += 1;
        self.failures.push(FailedItem {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn succeed(&mut self, path: &Path, size: u64) {
        self.succeeded += 1;
        self.bytes_freed += size;
        self.removed.push(path.to_path_buf());
    }

    /// Targets considered, whatever their outcome
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Result for a batch where every target was skipped for one reason
    pub fn all_skipped<'a>(
        targets: impl IntoIterator<Item = &'a DeletionTarget>,
        reason: SkipReason,
        simulate: bool,
    ) -> Self {
        let mut result = Self::empty(simulate);
        for target in targets {
            result.skip(&target.path, reason.clone());
        }
        result
    }
}

/// Deletes selected targets one at a time, re-checking safety for each.
///
/// Targets are processed sequentially, shallowest paths first, so a directory
/// removed earlier in the batch covers anything selected beneath it.
pub struct Executor {
    policy: Arc<SafetyPolicy>,
    journal: Arc<HistoryJournal>,
    remover: Arc<dyn PathRemover>,
}

impl Executor {
    pub fn new(policy: Arc<SafetyPolicy>, journal: Arc<HistoryJournal>) -> Self {
        Self {
            policy,
            journal,
            remover: Arc::new(FsRemover),
        }
    }

    pub fn with_remover(mut self, remover: Arc<dyn PathRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// What `execute` would do, without touching the filesystem
    pub fn preview(&self, targets: &[DeletionTarget]) -> ExecutionResult {
        self.execute(targets, true)
    }

    pub fn execute(&self, targets: &[DeletionTarget], simulate: bool) -> ExecutionResult {
        self.execute_with_skips(targets, Vec::new(), simulate)
    }

    /// `execute`, with items the caller already decided to leave alone
    /// reported ahead of the batch
    pub fn execute_with_skips(
        &self,
        targets: &[DeletionTarget],
        skipped: Vec<SkippedItem>,
        simulate: bool,
    ) -> ExecutionResult {
        let start = Instant::now();
        let mut result = ExecutionResult::empty(simulate);
        for item in skipped {
            result.skip(&item.path, item.reason);
        }

        // Stable: equal depths keep selection order
        let mut order: Vec<&DeletionTarget> = targets.iter().collect();
        order.sort_by_key(|t| normalize(&t.path).components().count());

        let mut done: Vec<PathBuf> = Vec::new();
        for target in order {
            let path = normalize(&target.path);

            if let Some(parent) = done.iter().find(|d| path.starts_with(d)) {
                let parent = parent.clone();
                result.skip(&target.path, SkipReason::CoveredByParent { parent });
                continue;
            }

            if !target.safety.is_deletable() {
                result.skip(&target.path, SkipReason::Protected);
                continue;
            }
            if let Err(refusal) = self.policy.check(&target.path) {
                result.skip(&target.path, refusal.into());
                continue;
            }

            if std::fs::symlink_metadata(&target.path).is_err() {
                result.skip(&target.path, SkipReason::NotFound);
                continue;
            }

            if simulate {
                result.succeed(&target.path, target.size);
                done.push(path);
                continue;
            }

            match self.remover.remove(&target.path) {
                Ok(()) => {
                    tracing::debug!(path = %target.path.display(), bytes = target.size, "deleted");
                    if let Err(e) = self
                        .journal
                        .append(&JournalEntry::deleted(&target.path, target.size))
                    {
                        tracing::error!(error = %e, path = %target.path.display(), "deleted but not journaled");
                    }
                    result.succeed(&target.path, target.size);
                    done.push(path);
                }
                Err(e) => {
                    let reason = permissions::failure_reason(&target.path, &e);
                    result.fail(&target.path, reason);
                }
            }
        }

        result.duration = start.elapsed();
        tracing::info!(
            simulated = simulate,
            succeeded = result.succeeded,
            skipped = result.skipped,
            failed = result.failed,
            bytes = result.bytes_freed,
            "execution finished"
        );
        result
    }
}
