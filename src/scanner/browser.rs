use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use super::{discovered, walker, Scanner};
use crate::common::safety::SafetyPolicy;

/// Known browser cache locations, relative to the home directory
const BROWSER_CACHES: &[(&str, &str)] = &[
    ("Safari", "Library/Caches/com.apple.Safari"),
    ("Chrome", "Library/Caches/Google/Chrome"),
    ("Firefox", "Library/Caches/Firefox"),
    ("Edge", "Library/Caches/Microsoft Edge"),
    ("Arc", "Library/Caches/Arc"),
    ("Brave", "Library/Caches/BraveSoftware"),
    ("Vivaldi", "Library/Caches/Vivaldi"),
    ("Opera", "Library/Caches/com.operasoftware.Opera"),
    ("Opera GX", "Library/Caches/com.operasoftware.OperaGX"),
    ("Chromium", "Library/Caches/Chromium"),
    ("Orion", "Library/Caches/com.kagi.kagimac"),
    ("Chrome", ".cache/google-chrome"),
    ("Chromium", ".cache/chromium"),
    ("Firefox", ".cache/mozilla/firefox"),
];

/// One entry per browser whose cache exceeds the size floor
pub struct BrowserCacheScanner {
    caches: Vec<(String, PathBuf)>,
    policy: Arc<SafetyPolicy>,
}

impl BrowserCacheScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        let caches = BROWSER_CACHES
            .iter()
            .map(|(browser, rel)| (browser.to_string(), home.join(rel)))
            .collect();
        Self { caches, policy }
    }
}

impl Scanner for BrowserCacheScanner {
    fn id(&self) -> &str {
        "browser_cache"
    }

    fn name(&self) -> &str {
        "Browser Caches"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Browser
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for (browser, path) in &self.caches {
            if !path.is_dir() || config.is_excluded(path) {
                continue;
            }
            // Reporting the whole cache would swallow the excluded part
            if walker::contains_excluded(path, config) {
                tracing::debug!(browser = %browser, "cache holds an excluded path, skipping");
                continue;
            }

            let stats = walker::dir_stats(path, config);
            if !config.meets_size_floor(stats.size) {
                continue;
            }

            entries.push(
                discovered(
                    self.id(),
                    self.category(),
                    &self.policy,
                    format!("{} Cache", browser),
                    path.clone(),
                    &stats,
                )
                .with_meta("browser", browser.as_str()),
            );
        }

        Ok(entries)
    }
}
