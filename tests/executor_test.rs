use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use reclaim::apps::{AppBundle, MatchRule, RelatedFile, RelatedKind};
use reclaim::cleaner::{
    uninstall, DeletionTarget, Executor, FsRemover, HistoryJournal, PathRemover, SkipReason,
    SkippedItem,
};
use reclaim::common::safety::{ProcessProbe, SafetyPolicy, SafetyTier};

struct Running(Vec<PathBuf>);

impl ProcessProbe for Running {
    fn running_executables(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// Refuses to remove one path, removes everything else for real
struct FailOn {
    path: PathBuf,
    attempts: Mutex<Vec<PathBuf>>,
}

impl FailOn {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            attempts: Mutex::new(Vec::new()),
        }
    }
}

impl PathRemover for FailOn {
    fn remove(&self, path: &Path) -> io::Result<()> {
        self.attempts.lock().unwrap().push(path.to_path_buf());
        if path == self.path {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "operation not permitted"));
        }
        FsRemover.remove(path)
    }
}

struct Fixture {
    home: TempDir,
    data: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        }
    }

    fn home(&self) -> &Path {
        self.home.path()
    }

    fn journal(&self) -> Arc<HistoryJournal> {
        Arc::new(HistoryJournal::open(self.data.path().join("history.jsonl")).unwrap())
    }

    fn policy(&self, running: Vec<PathBuf>) -> Arc<SafetyPolicy> {
        Arc::new(SafetyPolicy::new(self.home(), Arc::new(Running(running))))
    }

    fn executor(&self) -> Executor {
        Executor::new(self.policy(Vec::new()), self.journal())
    }

    fn file(&self, rel: &str, len: usize) -> PathBuf {
        let path = self.home().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    fn target(&self, path: &Path, size: u64) -> DeletionTarget {
        let tier = self.policy(Vec::new()).classify(path);
        DeletionTarget::new(path.to_path_buf(), size, tier)
    }
}

// ─── Protection ───────────────────────────────────────────────────────────────

#[test]
fn test_protected_paths_are_never_touched() {
    let fx = Fixture::new();
    let key = fx.file(".ssh/id_ed25519", 64);
    let docs = fx.home().join("Documents");
    std::fs::create_dir_all(&docs).unwrap();

    // Caller claims they are safe; the executor re-checks anyway
    let targets = vec![
        DeletionTarget::new(key.clone(), 64, SafetyTier::Safe),
        DeletionTarget::new(docs.clone(), 0, SafetyTier::Safe),
        DeletionTarget::new(fx.home().to_path_buf(), 0, SafetyTier::Safe),
    ];
    let result = fx.executor().execute(&targets, false);

    assert_eq!(result.succeeded, 0);
    assert_eq!(result.skipped, 3);
    assert!(result
        .skipped_items
        .iter()
        .all(|s| s.reason == SkipReason::Protected));
    assert!(key.exists());
    assert!(docs.exists());
    assert!(fx.journal().read_all(None).unwrap().is_empty());
}

// ─── Simulation ───────────────────────────────────────────────────────────────

#[test]
fn test_preview_does_not_mutate() {
    let fx = Fixture::new();
    let a = fx.file("scratch/a.bin", 100);
    let b = fx.file("scratch/b.bin", 250);
    let gone = fx.home().join("scratch/gone.bin");

    let targets = vec![fx.target(&a, 100), fx.target(&b, 250), fx.target(&gone, 999)];
    let result = fx.executor().preview(&targets);

    assert!(result.simulated);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.bytes_freed, 350);
    assert_eq!(result.skipped_items[0].reason, SkipReason::NotFound);
    assert!(a.exists() && b.exists());
    assert!(fx.journal().read_all(None).unwrap().is_empty());
}

#[test]
fn test_preview_matches_execution() {
    let fx = Fixture::new();
    let dir = fx.home().join("build");
    fx.file("build/out/x.o", 10);
    let stray = fx.file("stray.tmp", 5);

    let targets = vec![
        fx.target(&dir.join("out"), 10),
        fx.target(&dir, 40),
        fx.target(&stray, 5),
    ];
    let executor = fx.executor();
    let preview = executor.preview(&targets);
    let real = executor.execute(&targets, false);

    assert_eq!(preview.succeeded, real.succeeded);
    assert_eq!(preview.skipped, real.skipped);
    assert_eq!(preview.bytes_freed, real.bytes_freed);
    assert_eq!(preview.removed, real.removed);
}

// ─── Partial failure ──────────────────────────────────────────────────────────

#[test]
fn test_failure_mid_batch_keeps_going() {
    let fx = Fixture::new();
    let first = fx.file("junk/one.bin", 10);
    let second = fx.file("junk/two.bin", 20);
    let third = fx.file("junk/three.bin", 30);

    let remover = Arc::new(FailOn::new(second.clone()));
    let journal = fx.journal();
    let executor = Executor::new(fx.policy(Vec::new()), journal.clone()).with_remover(remover.clone());

    let targets = vec![
        fx.target(&first, 10),
        fx.target(&second, 20),
        fx.target(&third, 30),
    ];
    let result = executor.execute(&targets, false);

    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.bytes_freed, 40);
    assert_eq!(result.failures[0].path, second);
    assert!(!first.exists());
    assert!(second.exists());
    assert!(!third.exists());
    assert_eq!(remover.attempts.lock().unwrap().len(), 3);

    let journaled: Vec<PathBuf> = journal
        .read_all(None)
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(journaled, vec![first, third]);
}

#[test]
fn test_missing_target_is_skipped_not_failed() {
    let fx = Fixture::new();
    let gone = fx.home().join("vanished");

    let result = fx.executor().execute(&[fx.target(&gone, 10)], false);
    assert_eq!(result.failed, 0);
    assert_eq!(result.skipped_items[0].reason, SkipReason::NotFound);
}

#[test]
fn test_running_program_blocks_deletion() {
    let fx = Fixture::new();
    let tool = fx.file("tools/bin/serve", 50);
    let dir = fx.home().join("tools");

    let executor = Executor::new(fx.policy(vec![tool.clone()]), fx.journal());
    let result = executor.execute(&[fx.target(&dir, 50)], false);

    assert_eq!(
        result.skipped_items[0].reason,
        SkipReason::InUse { executable: tool.clone() }
    );
    assert!(tool.exists());
}

#[test]
fn test_caller_skips_are_reported_with_the_batch() {
    let fx = Fixture::new();
    let kept = fx.file("shared/daemon.plist", 5);
    let stale = fx.file("scratch/stale.log", 20);

    let skipped = vec![SkippedItem {
        path: kept.clone(),
        reason: SkipReason::SystemOwned,
    }];
    let result = fx
        .executor()
        .execute_with_skips(&[fx.target(&stale, 20)], skipped, false);

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.total(), 2);
    assert_eq!(
        result.skipped_items,
        vec![SkippedItem {
            path: kept.clone(),
            reason: SkipReason::SystemOwned
        }]
    );
    assert!(kept.exists());
    assert!(!stale.exists());
    assert_eq!(fx.journal().read_all(None).unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlinked_parent_into_credentials_is_refused() {
    let fx = Fixture::new();
    let key = fx.file(".ssh/id_ed25519", 64);
    let caches = fx.home().join("Library/Caches");
    std::fs::create_dir_all(&caches).unwrap();
    std::os::unix::fs::symlink(fx.home().join(".ssh"), caches.join("alias")).unwrap();

    let through_link = caches.join("alias/id_ed25519");
    let targets = vec![DeletionTarget::new(through_link, 64, SafetyTier::Safe)];
    let result = fx.executor().execute(&targets, false);

    assert_eq!(result.succeeded, 0);
    assert_eq!(result.skipped_items[0].reason, SkipReason::Protected);
    assert!(key.exists());
    assert!(fx.journal().read_all(None).unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlink_itself_is_removed_not_its_target() {
    let fx = Fixture::new();
    let key = fx.file(".ssh/id_ed25519", 64);
    let caches = fx.home().join("Library/Caches");
    std::fs::create_dir_all(&caches).unwrap();
    let link = caches.join("alias");
    std::os::unix::fs::symlink(fx.home().join(".ssh"), &link).unwrap();

    let result = fx.executor().execute(&[fx.target(&link, 0)], false);

    assert_eq!(result.succeeded, 1);
    assert!(std::fs::symlink_metadata(&link).is_err());
    assert!(key.exists());
}

#[cfg(unix)]
#[test]
fn test_running_app_reached_through_symlink_blocks_deletion() {
    let fx = Fixture::new();
    let exe = fx.file("Applications/Editor.app/Contents/MacOS/editor", 50);
    std::fs::create_dir_all(fx.home().join("Applications/Editor.app/Contents/Resources")).unwrap();
    let links = fx.home().join("links");
    std::fs::create_dir_all(&links).unwrap();
    std::os::unix::fs::symlink(fx.home().join("Applications/Editor.app"), links.join("ed")).unwrap();

    let real_exe = std::fs::canonicalize(&exe).unwrap();
    let executor = Executor::new(fx.policy(vec![real_exe.clone()]), fx.journal());
    let resources = links.join("ed/Contents/Resources");
    let result = executor.execute(&[fx.target(&resources, 0)], false);

    assert_eq!(
        result.skipped_items[0].reason,
        SkipReason::InUse { executable: real_exe }
    );
    assert!(resources.exists());
}

// ─── Uninstall ────────────────────────────────────────────────────────────────

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.example.Notes</string>
    <key>CFBundleName</key>
    <string>Notes Pro</string>
</dict>
</plist>"#;

fn install_app(fx: &Fixture) -> AppBundle {
    let bundle = fx.home().join("Applications/Notes Pro.app");
    fx.file("Applications/Notes Pro.app/Contents/MacOS/notes", 100);
    std::fs::write(bundle.join("Contents/Info.plist"), MANIFEST).unwrap();
    AppBundle::load(&bundle).with_size(100)
}

fn related(path: PathBuf, size: u64, system_owned: bool) -> RelatedFile {
    RelatedFile {
        path,
        size,
        kind: RelatedKind::AppSupport,
        rule: MatchRule::BundleId,
        system_owned,
        safety: SafetyTier::Caution,
    }
}

#[test]
fn test_uninstall_skips_system_owned_files() {
    let fx = Fixture::new();
    let app = install_app(&fx);
    let support = fx.file("Library/Application Support/com.example.Notes/db", 30);
    let daemon = fx.file("system/LaunchDaemons/com.example.Notes.helper.plist", 5);

    let files = vec![
        related(support.parent().unwrap().to_path_buf(), 30, false),
        related(daemon.clone(), 5, true),
    ];
    let result = uninstall(&fx.executor(), &app, &files, false);

    assert_eq!(result.bundle.succeeded, 1);
    assert_eq!(result.related.succeeded, 1);
    assert_eq!(result.related.skipped, 1);
    assert_eq!(result.related.total(), 2);
    assert_eq!(result.related.skipped_items[0].reason, SkipReason::SystemOwned);
    assert_eq!(result.bytes_freed(), 130);
    assert!(!app.path.exists());
    assert!(!support.exists());
    assert!(daemon.exists());
}

#[test]
fn test_running_app_is_not_uninstalled() {
    let fx = Fixture::new();
    let app = install_app(&fx);
    let support = fx.file("Library/Application Support/com.example.Notes/db", 30);
    let exe = app.path.join("Contents/MacOS/notes");

    let executor = Executor::new(fx.policy(vec![exe]), fx.journal());
    let files = vec![related(support.clone(), 30, false)];
    let result = uninstall(&executor, &app, &files, false);

    assert_eq!(result.bundle.skipped_items[0].reason, SkipReason::AppRunning);
    assert_eq!(result.related.skipped_items[0].reason, SkipReason::AppRunning);
    assert!(app.path.exists());
    assert!(support.exists());
}

#[test]
fn test_related_files_attempted_after_bundle_failure() {
    let fx = Fixture::new();
    let app = install_app(&fx);
    let cache = fx.file("Library/Caches/com.example.Notes/blob", 40);

    let remover = Arc::new(FailOn::new(app.path.clone()));
    let executor = Executor::new(fx.policy(Vec::new()), fx.journal()).with_remover(remover);
    let files = vec![related(cache.parent().unwrap().to_path_buf(), 40, false)];
    let result = uninstall(&executor, &app, &files, false);

    assert_eq!(result.bundle.failed, 1);
    assert_eq!(result.related.succeeded, 1);
    assert!(!result.is_clean());
    assert!(app.path.exists());
    assert!(!cache.exists());
}
