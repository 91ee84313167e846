pub mod apps;
pub mod browser;
pub mod caches;
pub mod dev;
pub mod logs;
pub mod trash;
pub mod types;
pub mod walker;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::common::safety::SafetyPolicy;
use types::{DiscoveredEntry, ScanConfig, ScannerCategory};

pub use apps::InstalledAppScanner;
pub use browser::BrowserCacheScanner;
pub use caches::CacheScanner;
pub use dev::DevJunkScanner;
pub use logs::LogScanner;
pub use trash::TrashScanner;

/// One discovery strategy.
///
/// Implementations never mutate shared state; the registry runs them
/// concurrently against the same read-only [`ScanConfig`].
pub trait Scanner: Send + Sync {
    /// Stable identifier, also the prefix of every entry id this scanner emits
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn category(&self) -> ScannerCategory;

    /// Whether the scanner can run at all (e.g. its locations are readable)
    fn is_available(&self) -> bool {
        true
    }

    /// Advisory only; never enforced as a timeout
    fn estimated_duration(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>>;
}

// ─── Progress ─────────────────────────────────────────────────────────────────

/// Observational scan events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanProgress {
    Started { scanner_id: String },
    Completed { scanner_id: String, count: usize },
    Failed { scanner_id: String, error: String },
}

/// Receives progress events from concurrently running scanners
pub trait ScanObserver: Send + Sync {
    fn notify(&self, event: ScanProgress);
}

impl ScanObserver for mpsc::Sender<ScanProgress> {
    fn notify(&self, event: ScanProgress) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(event);
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// Outcome of one scanner in a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerRun {
    pub scanner_id: String,
    pub name: String,
    pub category: ScannerCategory,
    pub count: usize,
    pub size: u64,
    /// Set when the scanner failed or panicked; its count is then zero
    pub error: Option<String>,
}

/// Merged result of a scan pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub entries: Vec<DiscoveredEntry>,
    pub scanners: Vec<ScannerRun>,
    pub duration: Duration,
}

impl ScanReport {
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries produced by scanners of one category
    pub fn by_category(&self, category: ScannerCategory) -> Vec<&DiscoveredEntry> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Runs that ended in an error
    pub fn failures(&self) -> impl Iterator<Item = &ScannerRun> {
        self.scanners.iter().filter(|r| r.error.is_some())
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Holds every registered scanner and fans scans out across them
#[derive(Default)]
pub struct ScannerRegistry {
    scanners: Vec<Box<dyn Scanner>>,
}

impl std::fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.scanners.iter().map(|s| s.id()))
            .finish()
    }
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in scanner rooted at `home`
    pub fn with_defaults(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CacheScanner::new(home, policy.clone())));
        registry.register(Box::new(LogScanner::new(home, policy.clone())));
        registry.register(Box::new(TrashScanner::new(home, policy.clone())));
        registry.register(Box::new(BrowserCacheScanner::new(home, policy.clone())));
        registry.register(Box::new(DevJunkScanner::new(home, policy.clone())));
        registry.register(Box::new(InstalledAppScanner::new(home, policy)));
        registry
    }

    pub fn register(&mut self, scanner: Box<dyn Scanner>) {
        self.scanners.push(scanner);
    }

    pub fn scanners(&self) -> &[Box<dyn Scanner>] {
        &self.scanners
    }

    pub fn get(&self, id: &str) -> Option<&dyn Scanner> {
        self.scanners
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
    }

    /// Scanners of one category, in registration order
    pub fn scanners_by_category(&self, category: ScannerCategory) -> Vec<&dyn Scanner> {
        self.scanners
            .iter()
            .filter(|s| s.category() == category)
            .map(|s| s.as_ref())
            .collect()
    }

    /// Run every available scanner concurrently and merge the results
    pub fn scan_all(&self, config: &ScanConfig) -> ScanReport {
        self.scan_all_observed(config, None)
    }

    pub fn scan_all_observed(
        &self,
        config: &ScanConfig,
        observer: Option<&dyn ScanObserver>,
    ) -> ScanReport {
        let selected: Vec<&dyn Scanner> = self.scanners.iter().map(|s| s.as_ref()).collect();
        run_scanners(&selected, config, observer)
    }

    /// Run only the scanners of one category
    pub fn scan_category(
        &self,
        category: ScannerCategory,
        config: &ScanConfig,
        observer: Option<&dyn ScanObserver>,
    ) -> ScanReport {
        self.scan_categories(&[category], config, observer)
    }

    /// Run the scanners of any of `categories`; an empty slice selects all
    pub fn scan_categories(
        &self,
        categories: &[ScannerCategory],
        config: &ScanConfig,
        observer: Option<&dyn ScanObserver>,
    ) -> ScanReport {
        let selected: Vec<&dyn Scanner> = self
            .scanners
            .iter()
            .filter(|s| categories.is_empty() || categories.contains(&s.category()))
            .map(|s| s.as_ref())
            .collect();
        run_scanners(&selected, config, observer)
    }
}

fn run_scanners(
    scanners: &[&dyn Scanner],
    config: &ScanConfig,
    observer: Option<&dyn ScanObserver>,
) -> ScanReport {
    let start = Instant::now();

    let available: Vec<&dyn Scanner> = scanners
        .iter()
        .copied()
        .filter(|s| {
            let ok = s.is_available();
            if !ok {
                tracing::info!(scanner = s.id(), "scanner unavailable, skipping");
            }
            ok
        })
        .collect();

    // collect() keeps registration order, so merging below is deterministic
    let outcomes: Vec<(ScannerRun, Vec<DiscoveredEntry>)> = available
        .par_iter()
        .map(|scanner| run_one(*scanner, config, observer))
        .collect();

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut entries = Vec::new();
    let mut runs = Vec::with_capacity(outcomes.len());
    for (run, found) in outcomes {
        for entry in found {
            // Two scanners may find the same path; the first registered keeps it
            if seen.insert(entry.path.clone()) {
                entries.push(entry);
            }
        }
        runs.push(run);
    }

    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.id.cmp(&b.id)));

    let report = ScanReport {
        entries,
        scanners: runs,
        duration: start.elapsed(),
    };
    tracing::info!(
        entries = report.entries.len(),
        bytes = report.total_size(),
        elapsed_ms = report.duration.as_millis() as u64,
        "scan finished"
    );
    report
}

/// Run one scanner, turning errors and panics into an empty result
fn run_one(
    scanner: &dyn Scanner,
    config: &ScanConfig,
    observer: Option<&dyn ScanObserver>,
) -> (ScannerRun, Vec<DiscoveredEntry>) {
    let scanner_id = scanner.id().to_string();
    if let Some(obs) = observer {
        obs.notify(ScanProgress::Started {
            scanner_id: scanner_id.clone(),
        });
    }
    tracing::debug!(scanner = %scanner_id, "scanner started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| scanner.scan(config)));
    let (entries, error) = match outcome {
        Ok(Ok(entries)) => (entries, None),
        Ok(Err(e)) => (Vec::new(), Some(format!("{:#}", e))),
        Err(payload) => (Vec::new(), Some(panic_message(payload.as_ref()))),
    };

    match &error {
        Some(err) => {
            tracing::warn!(scanner = %scanner_id, error = %err, "scanner failed; reporting zero results");
            if let Some(obs) = observer {
                obs.notify(ScanProgress::Failed {
                    scanner_id: scanner_id.clone(),
                    error: err.clone(),
                });
            }
        }
        None => {
            tracing::debug!(scanner = %scanner_id, count = entries.len(), "scanner completed");
            if let Some(obs) = observer {
                obs.notify(ScanProgress::Completed {
                    scanner_id: scanner_id.clone(),
                    count: entries.len(),
                });
            }
        }
    }

    let run = ScannerRun {
        scanner_id,
        name: scanner.name().to_string(),
        category: scanner.category(),
        count: entries.len(),
        size: entries.iter().map(|e| e.size).sum(),
        error,
    };
    (run, entries)
}

/// Build an entry for a discovered path, classified by the policy
pub(crate) fn discovered(
    scanner_id: &str,
    category: ScannerCategory,
    policy: &SafetyPolicy,
    name: impl Into<String>,
    path: PathBuf,
    stats: &walker::DirStats,
) -> DiscoveredEntry {
    let accessed = walker::last_accessed(&path);
    let modified = walker::last_modified(&path);
    let safety = policy.classify(&path);
    DiscoveredEntry::new(scanner_id, category, name, path)
        .with_stats(stats)
        .with_times(accessed, modified)
        .with_safety(safety)
}

/// Sort largest first and keep at most `limit`
pub(crate) fn keep_largest(entries: &mut Vec<DiscoveredEntry>, limit: usize) {
    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    entries.truncate(limit);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
