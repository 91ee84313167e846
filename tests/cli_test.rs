use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Binary isolated to a throwaway home and data directory
fn reclaim(home: &Path, data: &Path) -> Command {
    let mut cmd = Command::cargo_bin("reclaim").unwrap();
    cmd.env("HOME", home)
        .env("RECLAIM_DATA_DIR", data)
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

struct Sandbox {
    home: TempDir,
    data: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        reclaim(self.home.path(), self.data.path())
    }

    fn write(&self, rel: &str, len: usize) -> std::path::PathBuf {
        let path = self.home.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; len]).unwrap();
        path
    }
}

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("uninstall"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn test_version_flag() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reclaim"));
}

#[test]
fn test_no_subcommand_shows_help() {
    let sb = Sandbox::new();
    sb.cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ─── Scan & clean ────────────────────────────────────────────────────────────

#[test]
fn test_scan_json_lists_entries() {
    let sb = Sandbox::new();
    sb.write(".cache/thumbnails/t.png", 2 * 1024 * 1024);

    sb.cmd()
        .args(["scan", "--category", "system", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scanner_id\": \"system_caches\""))
        .stdout(predicate::str::contains("thumbnails"));
}

#[test]
fn test_scan_rejects_unknown_category() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["scan", "--category", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scanner category"));
}

#[test]
fn test_clean_previews_without_yes() {
    let sb = Sandbox::new();
    let blob = sb.write(".cache/pkg/blob", 2 * 1024 * 1024);

    sb.cmd()
        .args(["clean", "--category", "system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preview"));
    assert!(blob.exists());
}

#[test]
fn test_clean_with_yes_deletes_and_journals() {
    let sb = Sandbox::new();
    let blob = sb.write(".cache/pkg/blob", 2 * 1024 * 1024);

    sb.cmd()
        .args(["clean", "--category", "system", "--yes", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": 1"));
    assert!(!blob.exists());

    sb.cmd()
        .args(["history", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pkg"));
}

// ─── History & config ────────────────────────────────────────────────────────

#[test]
fn test_history_empty() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No deletions recorded"));
}

#[test]
fn test_config_path_uses_data_dir() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let sb = Sandbox::new();
    sb.cmd().args(["config", "init"]).assert().success();
    assert!(sb.data.path().join("config.toml").exists());

    sb.cmd()
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("min_size_bytes"));
}

#[test]
fn test_invalid_config_is_reported() {
    let sb = Sandbox::new();
    std::fs::write(sb.data.path().join("config.toml"), "min_size_bytes = \"lots\"").unwrap();

    sb.cmd()
        .arg("history")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

// ─── Apps ────────────────────────────────────────────────────────────────────

#[test]
fn test_apps_info_nonexistent() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["apps", "info", "definitely-not-an-installed-app-xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no installed application"));
}

#[test]
fn test_apps_list_json() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["apps", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}
