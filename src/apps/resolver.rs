use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::bundle::AppBundle;
use crate::common::safety::{SafetyPolicy, SafetyTier};
use crate::scanner::apps::app_bundles_in;
use crate::scanner::types::ScanConfig;
use crate::scanner::walker;

/// Kind of location a related file was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedKind {
    AppSupport,
    Preferences,
    Cache,
    Logs,
    SavedState,
    LaunchAgent,
    LaunchDaemon,
    Container,
    GroupContainer,
    Cookies,
    HttpStorage,
    WebKit,
    Fonts,
}

impl std::fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelatedKind::AppSupport => write!(f, "App Support"),
            RelatedKind::Preferences => write!(f, "Preferences"),
            RelatedKind::Cache => write!(f, "Cache"),
            RelatedKind::Logs => write!(f, "Logs"),
            RelatedKind::SavedState => write!(f, "Saved State"),
            RelatedKind::LaunchAgent => write!(f, "Launch Agent"),
            RelatedKind::LaunchDaemon => write!(f, "Launch Daemon"),
            RelatedKind::Container => write!(f, "Container"),
            RelatedKind::GroupContainer => write!(f, "Group Container"),
            RelatedKind::Cookies => write!(f, "Cookies"),
            RelatedKind::HttpStorage => write!(f, "HTTP Storage"),
            RelatedKind::WebKit => write!(f, "WebKit Data"),
            RelatedKind::Fonts => write!(f, "Fonts"),
        }
    }
}

/// Which rule associated a file with an application, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    BundleId,
    AppName,
    Preference,
}

impl MatchRule {
    const ORDER: [MatchRule; 3] = [MatchRule::BundleId, MatchRule::AppName, MatchRule::Preference];
}

/// A path believed to belong to an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedFile {
    pub path: PathBuf,
    pub size: u64,
    pub kind: RelatedKind,
    pub rule: MatchRule,
    /// Lives in a system-wide location; never removed by uninstall
    pub system_owned: bool,
    pub safety: SafetyTier,
}

#[derive(Debug, Clone)]
struct SearchLocation {
    dir: PathBuf,
    kind: RelatedKind,
    system_owned: bool,
}

/// Per-user locations searched for related files, in order
const USER_LOCATIONS: &[(&str, RelatedKind)] = &[
    ("Library/Application Support", RelatedKind::AppSupport),
    ("Library/Preferences", RelatedKind::Preferences),
    ("Library/Preferences/ByHost", RelatedKind::Preferences),
    ("Library/Caches", RelatedKind::Cache),
    ("Library/Logs", RelatedKind::Logs),
    ("Library/Saved Application State", RelatedKind::SavedState),
    ("Library/LaunchAgents", RelatedKind::LaunchAgent),
    ("Library/Containers", RelatedKind::Container),
    ("Library/Group Containers", RelatedKind::GroupContainer),
    ("Library/Cookies", RelatedKind::Cookies),
    ("Library/HTTPStorages", RelatedKind::HttpStorage),
    ("Library/WebKit", RelatedKind::WebKit),
    ("Library/Fonts", RelatedKind::Fonts),
];

/// System-wide locations, relative to the system library root
const SYSTEM_LOCATIONS: &[(&str, RelatedKind)] = &[
    ("LaunchAgents", RelatedKind::LaunchAgent),
    ("LaunchDaemons", RelatedKind::LaunchDaemon),
    ("Application Support", RelatedKind::AppSupport),
];

/// Names shorter than this only match exactly
const MIN_SUBSTRING_NAME: usize = 3;

/// Finds applications and the files they leave scattered around the system
pub struct AppResolver {
    app_dirs: Vec<PathBuf>,
    home: PathBuf,
    system_library: PathBuf,
    config: ScanConfig,
    policy: Arc<SafetyPolicy>,
}

impl AppResolver {
    pub fn new(home: &Path, policy: Arc<SafetyPolicy>) -> Self {
        Self {
            app_dirs: vec![PathBuf::from("/Applications"), home.join("Applications")],
            home: home.to_path_buf(),
            system_library: PathBuf::from("/Library"),
            config: ScanConfig::default(),
            policy,
        }
    }

    pub fn with_app_dirs(mut self, app_dirs: Vec<PathBuf>) -> Self {
        self.app_dirs = app_dirs;
        self
    }

    /// Root of the system-wide library (normally `/Library`)
    pub fn with_system_library(mut self, root: PathBuf) -> Self {
        self.system_library = root;
        self
    }

    /// Exclusions and symlink handling used when sizing related files
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a bundle and size it. An unreadable manifest is not an error.
    pub fn resolve_bundle(&self, path: &Path) -> AppBundle {
        let size = walker::dir_stats(path, &self.config).size;
        AppBundle::load(path).with_size(size)
    }

    /// Every installed application, sorted by display name
    pub fn list_apps(&self) -> Vec<AppBundle> {
        let mut apps: Vec<AppBundle> = self
            .app_dirs
            .iter()
            .flat_map(|dir| app_bundles_in(dir))
            .map(|path| self.resolve_bundle(&path))
            .collect();
        apps.sort_by_key(|a| a.display_name().to_lowercase());
        apps
    }

    /// Find an application by path, file name, display name or bundle id.
    ///
    /// An exact name wins over a partial one; a partial name must be unambiguous.
    pub fn resolve_app(&self, query: &str) -> Option<AppBundle> {
        let as_path = Path::new(query);
        if as_path.is_absolute() && as_path.is_dir() {
            return Some(self.resolve_bundle(as_path));
        }

        let wanted = query.trim_end_matches(".app");
        let apps = self.list_apps();

        let exact = apps.iter().position(|a| a.name.eq_ignore_ascii_case(wanted));
        let by_display = || {
            apps.iter()
                .position(|a| a.display_name().eq_ignore_ascii_case(wanted))
        };
        let by_bundle_id = || {
            apps.iter()
                .position(|a| a.bundle_id().is_some_and(|id| id.eq_ignore_ascii_case(wanted)))
        };
        let partial = || {
            let lower = wanted.to_lowercase();
            let hits: Vec<usize> = apps
                .iter()
                .enumerate()
                .filter(|(_, a)| a.name.to_lowercase().contains(&lower))
                .map(|(i, _)| i)
                .collect();
            match hits.as_slice() {
                [only] => Some(*only),
                _ => None,
            }
        };

        let index = exact
            .or_else(by_display)
            .or_else(by_bundle_id)
            .or_else(partial)?;
        apps.into_iter().nth(index)
    }

    /// Files belonging to one application
    pub fn find_related(&self, bundle: &AppBundle) -> Vec<RelatedFile> {
        self.find_related_all(std::slice::from_ref(bundle))
            .pop()
            .unwrap_or_default()
    }

    /// Files belonging to each of several applications.
    ///
    /// Rules are applied across all bundles in precedence order, so a file that
    /// one app claims by bundle id is never handed to another by name. When
    /// several bundles match under the same rule the longest identity wins.
    /// No path appears in more than one result.
    pub fn find_related_all(&self, bundles: &[AppBundle]) -> Vec<Vec<RelatedFile>> {
        let candidates = self.candidates();
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut found: Vec<Vec<(usize, MatchRule)>> = vec![Vec::new(); bundles.len()];

        for rule in MatchRule::ORDER {
            for (c, (path, _)) in candidates.iter().enumerate() {
                if claimed.contains(&c) {
                    continue;
                }
                let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
                    continue;
                };
                // The most specific identity wins: com.example.AppHelper over com.example.App
                let owner = bundles
                    .iter()
                    .enumerate()
                    .filter(|(_, bundle)| matches_rule(rule, bundle, &file_name))
                    .fold(None, |best: Option<(usize, usize)>, (b, bundle)| {
                        let weight = specificity(rule, bundle);
                        match best {
                            Some((_, w)) if w >= weight => best,
                            _ => Some((b, weight)),
                        }
                    });
                if let Some((b, _)) = owner {
                    claimed.insert(c);
                    found[b].push((c, rule));
                }
            }
        }

        found
            .into_iter()
            .map(|mut hits| {
                hits.sort_by_key(|(c, _)| *c);
                hits.into_iter()
                    .map(|(c, rule)| {
                        let (path, location) = &candidates[c];
                        self.related_file(path, location, rule)
                    })
                    .collect()
            })
            .collect()
    }

    fn related_file(&self, path: &Path, location: &SearchLocation, rule: MatchRule) -> RelatedFile {
        RelatedFile {
            path: path.to_path_buf(),
            size: walker::dir_stats(path, &self.config).size,
            kind: location.kind,
            rule,
            system_owned: location.system_owned,
            safety: self.policy.classify(path),
        }
    }

    fn locations(&self) -> Vec<SearchLocation> {
        let user = USER_LOCATIONS.iter().map(|(rel, kind)| SearchLocation {
            dir: self.home.join(rel),
            kind: *kind,
            system_owned: false,
        });
        let system = SYSTEM_LOCATIONS.iter().map(|(rel, kind)| SearchLocation {
            dir: self.system_library.join(rel),
            kind: *kind,
            system_owned: true,
        });
        user.chain(system).collect()
    }

    /// Every child of every search location, in location order
    fn candidates(&self) -> Vec<(PathBuf, SearchLocation)> {
        let mut out = Vec::new();
        for location in self.locations() {
            let entries = match std::fs::read_dir(&location.dir) {
                Ok(entries) => entries,
                Err(e) => {
                    // Unreadable system locations count as empty
                    tracing::debug!(dir = %location.dir.display(), error = %e, "skipping search location");
                    continue;
                }
            };
            let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
            paths.sort();
            for path in paths {
                if self.config.is_excluded(&path) {
                    continue;
                }
                // ByHost is searched as a location of its own
                if path.file_name().is_some_and(|n| n == "ByHost") {
                    continue;
                }
                out.push((path, location.clone()));
            }
        }
        out
    }
}

/// Length of the identity a rule matched on
fn specificity(rule: MatchRule, bundle: &AppBundle) -> usize {
    match rule {
        MatchRule::BundleId | MatchRule::Preference => bundle.bundle_id().map_or(0, str::len),
        MatchRule::AppName => names_of(bundle).iter().map(String::len).max().unwrap_or(0),
    }
}

/// Decide whether a file name belongs to an application under one rule
pub fn matches_rule(rule: MatchRule, bundle: &AppBundle, file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    match rule {
        MatchRule::BundleId => bundle
            .bundle_id()
            .is_some_and(|id| lower.contains(&id.to_lowercase())),
        MatchRule::AppName => {
            let stem = file_stem(file_name).to_lowercase();
            names_of(bundle).iter().any(|name| {
                // With a bundle id known, a bare name is weak evidence
                if bundle.bundle_id().is_some() || name.chars().count() < MIN_SUBSTRING_NAME {
                    stem == *name
                } else {
                    lower.contains(name.as_str())
                }
            })
        }
        MatchRule::Preference => {
            if !lower.ends_with(".plist") {
                return false;
            }
            match bundle.bundle_id() {
                Some(id) => {
                    let id = squash(id);
                    !id.is_empty() && squash(file_name).starts_with(&id)
                }
                None => false,
            }
        }
    }
}

fn names_of(bundle: &AppBundle) -> Vec<String> {
    let mut names = vec![bundle.name.to_lowercase()];
    let display = bundle.display_name().to_lowercase();
    if !names.contains(&display) {
        names.push(display);
    }
    names.retain(|n| !n.trim().is_empty());
    names
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(i) => &file_name[..i],
    }
}

/// Lowercase and drop everything but letters and digits
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::bundle::AppDescriptor;

    fn bundle(name: &str, bundle_id: Option<&str>) -> AppBundle {
        AppBundle {
            path: PathBuf::from(format!("/Applications/{}.app", name)),
            name: name.to_string(),
            descriptor: bundle_id.map(|id| AppDescriptor {
                bundle_id: Some(id.to_string()),
                ..AppDescriptor::default()
            }),
            size: 0,
        }
    }

    #[test]
    fn test_bundle_id_rule() {
        let app = bundle("App", Some("com.example.App"));
        assert!(matches_rule(MatchRule::BundleId, &app, "com.example.App.plist"));
        assert!(matches_rule(MatchRule::BundleId, &app, "COM.EXAMPLE.APP"));
        assert!(!matches_rule(MatchRule::BundleId, &app, "com.example.Other"));
    }

    #[test]
    fn test_name_rule_is_strict_with_bundle_id() {
        let app = bundle("App", Some("com.example.App"));
        assert!(matches_rule(MatchRule::AppName, &app, "App"));
        assert!(matches_rule(MatchRule::AppName, &app, "app.log"));
        assert!(!matches_rule(MatchRule::AppName, &app, "random-app-notes.txt"));
    }

    #[test]
    fn test_name_rule_substring_without_bundle_id() {
        let app = bundle("Slack", None);
        assert!(matches_rule(MatchRule::AppName, &app, "Slack Helper"));
        // Short names never match as substrings
        let short = bundle("Go", None);
        assert!(matches_rule(MatchRule::AppName, &short, "Go"));
        assert!(!matches_rule(MatchRule::AppName, &short, "Google"));
    }

    #[test]
    fn test_preference_rule_strips_punctuation() {
        let app = bundle("App", Some("com.example.App"));
        assert!(matches_rule(MatchRule::Preference, &app, "com_example_app.helper.plist"));
        assert!(!matches_rule(MatchRule::Preference, &app, "com_example_app.txt"));
        assert!(!matches_rule(MatchRule::Preference, &bundle("App", None), "App.plist"));
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash("com.Example-App_2"), "comexampleapp2");
    }
}
