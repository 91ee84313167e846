use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::apps::{AppBundle, AppResolver, RelatedFile};
use crate::cleaner::{
    self, DeletionTarget, ExecutionResult, Executor, HistoryJournal, JournalEntry, PathRemover,
    UninstallResult,
};
use crate::common::config::Config;
use crate::common::errors::{ReclaimError, ReclaimResult};
use crate::common::safety::{ProcessProbe, SafetyPolicy, SysinfoProbe};
use crate::scanner::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use crate::scanner::{ScanObserver, ScanReport, ScannerRegistry};

/// Owns every component and exposes the operations front ends call.
///
/// Nothing here is global: each engine carries its own registry, policy and
/// journal, built from an explicit [`Config`].
pub struct Engine {
    home: PathBuf,
    scan_config: ScanConfig,
    policy: Arc<SafetyPolicy>,
    registry: ScannerRegistry,
    resolver: AppResolver,
    executor: Executor,
    journal: Arc<HistoryJournal>,
}

impl Engine {
    /// Engine for the current user, checking the live process table.
    ///
    /// Fails only when there is no home directory or the journal cannot be opened.
    pub fn new(config: &Config, data_dir: &Path) -> ReclaimResult<Self> {
        let home = dirs::home_dir().ok_or(ReclaimError::NoHomeDirectory)?;
        Self::with_home(config, data_dir, &home, Arc::new(SysinfoProbe))
    }

    pub fn with_home(
        config: &Config,
        data_dir: &Path,
        home: &Path,
        probe: Arc<dyn ProcessProbe>,
    ) -> ReclaimResult<Self> {
        if !home.is_dir() {
            return Err(ReclaimError::NoHomeDirectory);
        }

        let policy = Arc::new(
            SafetyPolicy::new(home, probe).with_protected(config.protected_prefixes(home)),
        );
        let journal = Arc::new(HistoryJournal::open(config.journal_path(data_dir))?);
        let scan_config = config.scan_config(home);

        tracing::debug!(
            home = %home.display(),
            journal = %journal.path().display(),
            "engine ready"
        );

        Ok(Self {
            home: home.to_path_buf(),
            registry: ScannerRegistry::with_defaults(home, policy.clone()),
            resolver: AppResolver::new(home, policy.clone()).with_config(scan_config.clone()),
            executor: Executor::new(policy.clone(), journal.clone()),
            scan_config,
            policy,
            journal,
        })
    }

    pub fn with_registry(mut self, registry: ScannerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_resolver(mut self, resolver: AppResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_remover(mut self, remover: Arc<dyn PathRemover>) -> Self {
        self.executor = self.executor.with_remover(remover);
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Scan parameters built from the configuration
    pub fn scan_config(&self) -> &ScanConfig {
        &self.scan_config
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &ScannerRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &AppResolver {
        &self.resolver
    }

    // ─── Discovery ────────────────────────────────────────────────────────────

    pub fn scan(&self, config: &ScanConfig) -> Vec<DiscoveredEntry> {
        self.registry.scan_all(config).entries
    }

    /// Full scan with per-scanner outcomes and optional progress events
    pub fn scan_report(
        &self,
        config: &ScanConfig,
        observer: Option<&dyn ScanObserver>,
    ) -> ScanReport {
        self.registry.scan_all_observed(config, observer)
    }

    pub fn scan_category(
        &self,
        category: ScannerCategory,
        config: &ScanConfig,
    ) -> Vec<DiscoveredEntry> {
        self.registry.scan_category(category, config, None).entries
    }

    /// Scan only `categories` (all when empty), reporting progress to `observer`
    pub fn scan_categories(
        &self,
        categories: &[ScannerCategory],
        config: &ScanConfig,
        observer: Option<&dyn ScanObserver>,
    ) -> ScanReport {
        self.registry.scan_categories(categories, config, observer)
    }

    // ─── Applications ─────────────────────────────────────────────────────────

    pub fn resolve_app(&self, name_or_path: &str) -> Option<AppBundle> {
        self.resolver.resolve_app(name_or_path)
    }

    pub fn list_apps(&self) -> Vec<AppBundle> {
        self.resolver.list_apps()
    }

    pub fn find_related(&self, bundle: &AppBundle) -> Vec<RelatedFile> {
        self.resolver.find_related(bundle)
    }

    // ─── Execution ────────────────────────────────────────────────────────────

    pub fn preview(&self, selection: &[DeletionTarget]) -> ExecutionResult {
        self.executor.execute(selection, true)
    }

    pub fn execute(&self, selection: &[DeletionTarget]) -> ExecutionResult {
        self.executor.execute(selection, false)
    }

    pub fn preview_uninstall(&self, bundle: &AppBundle, related: &[RelatedFile]) -> UninstallResult {
        cleaner::uninstall(&self.executor, bundle, related, true)
    }

    pub fn uninstall(&self, bundle: &AppBundle, related: &[RelatedFile]) -> UninstallResult {
        cleaner::uninstall(&self.executor, bundle, related, false)
    }

    /// Executed deletions, oldest first
    pub fn history(&self, limit: Option<usize>) -> ReclaimResult<Vec<JournalEntry>> {
        self.journal.read_all(limit)
    }
}
