use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::types::{DiscoveredEntry, ScanConfig, ScannerCategory};
use super::{discovered, keep_largest, walker, Scanner};
use crate::common::safety::SafetyPolicy;

const MAX_RESULTS: usize = 50;

/// What must be present for a directory name to count as build output
#[derive(Debug, Clone, Copy)]
enum Marker {
    /// The name alone is enough
    Always,
    /// One of these files sits next to the directory
    Sibling(&'static [&'static str]),
    /// This file sits inside the directory
    Inside(&'static str),
}

/// Build and dependency directories that a project can regenerate
const BUILD_DIRS: &[(&str, Marker)] = &[
    ("node_modules", Marker::Sibling(&["package.json"])),
    ("target", Marker::Sibling(&["Cargo.toml", "pom.xml"])),
    (".gradle", Marker::Always),
    (
        "build",
        Marker::Sibling(&[
            "build.gradle",
            "build.gradle.kts",
            "CMakeLists.txt",
            "package.json",
            "setup.py",
        ]),
    ),
    (
        "dist",
        Marker::Sibling(&["package.json", "setup.py", "pyproject.toml"]),
    ),
    ("__pycache__", Marker::Always),
    (".pytest_cache", Marker::Always),
    (".venv", Marker::Inside("pyvenv.cfg")),
    ("venv", Marker::Inside("pyvenv.cfg")),
    ("DerivedData", Marker::Always),
];

/// Package manager and toolchain caches, relative to the home directory
const TOOL_CACHES: &[(&str, &str)] = &[
    ("npm", ".npm/_cacache"),
    ("Yarn", "Library/Caches/Yarn"),
    ("pnpm", "Library/pnpm/store"),
    ("pip", "Library/Caches/pip"),
    ("pip", ".cache/pip"),
    ("Cargo", ".cargo/registry/cache"),
    ("Gradle", ".gradle/caches"),
    ("Maven", ".m2/repository"),
    ("CocoaPods", "Library/Caches/CocoaPods"),
    ("Homebrew", "Library/Caches/Homebrew"),
    ("Conda", ".conda/pkgs"),
    ("Go", "Library/Caches/go-build"),
];

const PROJECT_ROOTS: &[&str] = &[
    "Documents",
    "Projects",
    "Developer",
    "Workspace",
    "src",
    "code",
    "dev",
    "repos",
];

/// Regenerable build output under project folders, plus tool caches
pub struct DevJunkScanner {
    search_roots: Vec<PathBuf>,
    tool_caches: Vec<(String, PathBuf)>,
    policy: Arc<SafetyPolicy>,
}

impl DevJunkScanner {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self {
            search_roots: PROJECT_ROOTS.iter().map(|d| home.join(d)).collect(),
            tool_caches: TOOL_CACHES
                .iter()
                .map(|(tool, rel)| (tool.to_string(), home.join(rel)))
                .collect(),
            policy,
        }
    }

    /// Scanner over explicit project roots, without tool caches
    pub fn with_roots(search_roots: Vec<PathBuf>, policy: Arc<SafetyPolicy>) -> Self {
        Self {
            search_roots,
            tool_caches: Vec::new(),
            policy,
        }
    }

    fn scan_projects(&self, root: &Path, config: &ScanConfig, out: &mut Vec<DiscoveredEntry>) {
        let mut it = WalkDir::new(root)
            .max_depth(config.max_depth())
            .follow_links(config.follow_symlinks())
            .into_iter();

        while let Some(next) = it.next() {
            let entry = match next {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if config.is_excluded(path) {
                it.skip_current_dir();
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(pattern) = match_build_dir(&name, path) {
                // Never descend into a match; nested node_modules belong to it
                it.skip_current_dir();
                if walker::contains_excluded(path, config) {
                    continue;
                }
                let stats = walker::dir_stats(path, config);
                if !config.meets_size_floor(stats.size) {
                    continue;
                }
                let project = path
                    .parent()
                    .map(walker::display_name)
                    .unwrap_or_default();
                out.push(
                    discovered(
                        self.id(),
                        self.category(),
                        &self.policy,
                        format!("{} ({})", project, pattern),
                        path.to_path_buf(),
                        &stats,
                    )
                    .with_meta("pattern", pattern),
                );
            } else if name.starts_with('.') {
                // .git and friends hold no build output
                it.skip_current_dir();
            }
        }
    }

    fn scan_tool_caches(&self, config: &ScanConfig, out: &mut Vec<DiscoveredEntry>) {
        for (tool, path) in &self.tool_caches {
            if !path.is_dir() || config.is_excluded(path) || walker::contains_excluded(path, config)
            {
                continue;
            }
            let stats = walker::dir_stats(path, config);
            if !config.meets_size_floor(stats.size) {
                continue;
            }
            out.push(
                discovered(
                    self.id(),
                    self.category(),
                    &self.policy,
                    format!("{} cache", tool),
                    path.clone(),
                    &stats,
                )
                .with_meta("pattern", "tool_cache")
                .with_meta("tool", tool.as_str()),
            );
        }
    }
}

fn match_build_dir(name: &str, path: &Path) -> Option<&'static str> {
    let (pattern, marker) = BUILD_DIRS.iter().find(|(n, _)| *n == name)?;
    let present = match marker {
        Marker::Always => true,
        Marker::Sibling(files) => path
            .parent()
            .is_some_and(|parent| files.iter().any(|f| parent.join(f).exists())),
        Marker::Inside(file) => path.join(file).exists(),
    };
    present.then_some(*pattern)
}

impl Scanner for DevJunkScanner {
    fn id(&self) -> &str {
        "dev_junk"
    }

    fn name(&self) -> &str {
        "Development Junk"
    }

    fn category(&self) -> ScannerCategory {
        ScannerCategory::Development
    }

    fn estimated_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(15)
    }

    fn scan(&self, config: &ScanConfig) -> anyhow::Result<Vec<DiscoveredEntry>> {
        let mut entries = Vec::new();

        for root in self.search_roots.iter().filter(|r| r.is_dir()) {
            tracing::debug!(root = %root.display(), "searching for build output");
            self.scan_projects(root, config, &mut entries);
        }
        self.scan_tool_caches(config, &mut entries);

        keep_largest(&mut entries, MAX_RESULTS);
        Ok(entries)
    }
}
