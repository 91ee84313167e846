use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiscoveredEntry, SafetyTier, ScanConfig, ScannerCategory};
use super::{discovered, walker, Scanner};
use crate::apps::bundle::AppBundle;
use crate::common::safety::SafetyPolicy;

/// Application bundles in the system and user application folders
pub struct InstalledAppScanner {
    app_dirs: Vec<PathBuf>,
    policy: Arc<SafetyPolicy>,
}

impl InstalledAppScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self::with_dirs(
            vec![PathBuf::from("/Applications"), home.join("Applications")],
            policy,
        )
    }

    pub fn with_dirs(app_dirs: Vec<PathBuf>, policy: Arc<SafetyPolicy>) -> Self {
        Self { app_dirs, policy }
    }
}

/// `.app` bundles directly inside a folder
pub fn app_bundles_in(dir: &Path) -> Vec<PathBuf> {
    let mut bundles: Vec<PathBuf> = walker::children(dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "app") && p.is_dir())
        .collect();
    bundles.sort();
    bundles
}

impl Scanner for InstalledAppScanner {
    fn id(&self) -> &str {
        "installed_apps"
    }

    fn name(&self) -> &str {
        "Installed Applications"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Apps
    }

    fn is_available(&self) -> bool {
        self.app_dirs.iter().any(|d| d.is_dir())
    }

    fn estimated_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for dir in &self.app_dirs {
            for path in app_bundles_in(dir) {
                if config.is_excluded(&path) {
                    continue;
                }
                let stats = walker::dir_stats(&path, config);
                if !config.meets_size_floor(stats.size) {
                    continue;
                }

                let app = AppBundle::load(&path);
                let mut entry = discovered(
                    self.id(),
                    self.category(),
                    &self.policy,
                    app.display_name(),
                    path,
                    &stats,
                );
                if app.is_system_app() {
                    entry.safety = SafetyTier::Protected;
                }
                if let Some(id) = app.bundle_id() {
                    entry = entry.with_meta("bundle_id", id);
                }
                if let Some(version) = app.version() {
                    entry = entry.with_meta("version", version);
                }
                entries.push(entry.with_meta("display_name", app.display_name()));
            }
        }

        entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::safety::SysinfoProbe;
    use tempfile::TempDir;

    fn make_app(dir: &Path, name: &str, bundle_id: &str, payload: usize) -> PathBuf {
        let app = dir.join(format!("{}.app", name));
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(
            app.join("Contents/Info.plist"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict>
<key>CFBundleIdentifier</key><string>{}</string>
<key>CFBundleShortVersionString</key><string>1.0</string>
</dict></plist>"#,
                bundle_id
            ),
        )
        .unwrap();
        std::fs::write(app.join("Contents/MacOS").join(name), vec![0u8; payload]).unwrap();
        app
    }

    #[test]
    fn test_lists_bundles_with_metadata() {
        let home = TempDir::new().unwrap();
        let apps = home.path().join("Applications");
        make_app(&apps, "Editor", "com.example.Editor", 4096);
        make_app(&apps, "Safari", "com.apple.Safari", 4096);
        std::fs::create_dir_all(apps.join("NotAnApp")).unwrap();

        let policy = Arc::new(SafetyPolicy::new(home.path(), Arc::new(SysinfoProbe)));
        let scanner = InstalledAppScanner::with_dirs(vec![apps.clone()], policy);
        let entries = scanner.scan(&ScanConfig::new(0, 3)).unwrap();

        assert_eq!(entries.len(), 2);
        let editor = entries.iter().find(|e| e.name == "Editor").unwrap();
        assert_eq!(
            editor.metadata.get("bundle_id").map(String::as_str),
            Some("com.example.Editor")
        );
        assert_eq!(editor.metadata.get("version").map(String::as_str), Some("1.0"));
        assert!(editor.safety.is_deletable());

        let safari = entries.iter().find(|e| e.name == "Safari").unwrap();
        assert_eq!(safari.safety, SafetyTier::Protected);
    }
}
