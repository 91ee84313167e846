use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Deletion risk of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyTier {
    /// Caches and temp files, regenerated on demand
    Safe,
    /// App data and hidden files; deletable after review
    Caution,
    /// Never deleted, whatever the caller asks for
    Protected,
}

impl SafetyTier {
    pub fn is_deletable(self) -> bool {
        !matches!(self, SafetyTier::Protected)
    }
}

impl std::fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyTier::Safe => write!(f, "Safe"),
            SafetyTier::Caution => write!(f, "Caution"),
            SafetyTier::Protected => write!(f, "Protected"),
        }
    }
}

/// Prefixes that are protected together with everything beneath them.
const PROTECTED_PREFIXES: &[&str] = &[
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/private/etc",
    "/var/db",
    "/private/var/db",
    "/Library/Keychains",
    "/Library/Security",
    "/Library/CoreServices",
    "/lib",
    "/lib64",
    "/boot",
    "/proc",
    "/sys",
    "/dev",
];

/// Paths that must never be deleted themselves; their contents may be.
const PROTECTED_EXACT: &[&str] = &[
    "/",
    "/Applications",
    "/Users",
    "/Library",
    "/home",
    "/root",
    "/var",
    "/tmp",
    "/opt",
    "/private",
    "/private/var",
    "/cores",
    "/Volumes",
];

/// Home subdirectories protected with everything beneath them (credentials).
const PROTECTED_HOME_PREFIXES: &[&str] = &[
    "Library/Keychains",
    ".ssh",
    ".gnupg",
];

/// Home subdirectories that must never be deleted entirely
const PROTECTED_HOME_DIRS: &[&str] = &[
    "", // home dir itself
    "Desktop",
    "Documents",
    "Downloads",
    "Pictures",
    "Music",
    "Movies",
    "Library",
    "Library/Caches",
    "Library/Logs",
    "Library/Preferences",
    "Library/Application Support",
    "Applications",
    ".Trash",
    ".cache",
    ".config",
    ".local",
];

/// Path fragments that mark OS bookkeeping anywhere on disk
const CRITICAL_PATTERNS: &[&str] = &[
    ".Spotlight-V100",
    ".fseventsd",
    ".DocumentRevisions-V100",
    "Library/Keychains",
    "Library/Security",
    "Library/CoreServices",
];

/// Home subdirectories whose contents belong to applications rather than caches
const CAUTION_HOME_DIRS: &[&str] = &[
    "Library/Application Support",
    "Library/Containers",
    "Library/Group Containers",
    "Library/Preferences",
    "Library/LaunchAgents",
];

/// Live view of which executables are running right now.
///
/// Queried on every safety re-check; implementations must not cache.
pub trait ProcessProbe: Send + Sync {
    fn running_executables(&self) -> Vec<PathBuf>;
}

/// Process probe backed by the OS process table
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl ProcessProbe for SysinfoProbe {
    fn running_executables(&self) -> Vec<PathBuf> {
        let mut sys = sysinfo::System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        sys.processes()
            .values()
            .filter_map(|p| p.exe().map(Path::to_path_buf))
            .collect()
    }
}

/// Why a path was refused by the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// On the deny-list
    Protected,
    /// Belongs to a process that is running
    InUse { executable: PathBuf },
}

/// Classifies paths and gates every deletion.
///
/// `classify` is a pure function of the path and the static deny-list, so the
/// discovery-time annotation and the execution-time re-check always agree.
/// Running processes are consulted only by [`SafetyPolicy::check`], freshly
/// on every call.
#[derive(Clone)]
pub struct SafetyPolicy {
    home: PathBuf,
    prefixes: Vec<PathBuf>,
    exact: Vec<PathBuf>,
    caution_dirs: Vec<PathBuf>,
    probe: Arc<dyn ProcessProbe>,
}

impl std::fmt::Debug for SafetyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyPolicy")
            .field("home", &self.home)
            .field("prefixes", &self.prefixes)
            .field("exact", &self.exact)
            .finish()
    }
}

impl SafetyPolicy {
    pub fn new(home: &Path, probe: Arc<dyn ProcessProbe>) -> Self {
        let home = normalize(home);

        // Resolved paths must meet the home entries too, so list both spellings
        let mut homes = vec![home.clone()];
        if let Ok(real) = std::fs::canonicalize(&home) {
            if real != home {
                homes.push(real);
            }
        }

        let mut prefixes: Vec<PathBuf> = PROTECTED_PREFIXES.iter().map(PathBuf::from).collect();
        let mut exact: Vec<PathBuf> = PROTECTED_EXACT.iter().map(PathBuf::from).collect();
        let mut caution_dirs = Vec::new();
        for root in &homes {
            prefixes.extend(PROTECTED_HOME_PREFIXES.iter().map(|d| root.join(d)));
            exact.extend(PROTECTED_HOME_DIRS.iter().map(|d| {
                if d.is_empty() {
                    root.clone()
                } else {
                    root.join(d)
                }
            }));
            caution_dirs.extend(CAUTION_HOME_DIRS.iter().map(|d| root.join(d)));
        }

        Self {
            home,
            prefixes,
            exact,
            caution_dirs,
            probe,
        }
    }

    /// Policy for the given home, checking the live OS process table
    pub fn with_system_probe(home: &Path) -> Self {
        Self::new(home, Arc::new(SysinfoProbe))
    }

    /// Add prefixes that are protected with everything beneath them
    pub fn with_protected<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = normalize(path.as_ref());
            if let Ok(real) = std::fs::canonicalize(&path) {
                if real != path {
                    self.prefixes.push(real);
                }
            }
            self.prefixes.push(path);
        }
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Classify a path by deletion risk
    pub fn classify(&self, path: &Path) -> SafetyTier {
        // Relative paths cannot be placed against the deny-list
        if !path.is_absolute() {
            return SafetyTier::Protected;
        }
        let path = normalize(path);

        if self.exact.iter().any(|p| *p == path) {
            return SafetyTier::Protected;
        }
        if self.prefixes.iter().any(|p| path.starts_with(p)) {
            return SafetyTier::Protected;
        }

        let path_str = path.to_string_lossy();
        if CRITICAL_PATTERNS.iter().any(|p| path_str.contains(p)) {
            return SafetyTier::Protected;
        }

        if self.caution_dirs.iter().any(|d| path.starts_with(d)) || is_hidden(&path) {
            return SafetyTier::Caution;
        }

        SafetyTier::Safe
    }

    /// Full execution-time check: deny-list plus the live process table.
    ///
    /// The path is judged both as written and with its parent resolved through
    /// symlinks; a refusal under either spelling refuses the path.
    pub fn check(&self, path: &Path) -> Result<SafetyTier, Refusal> {
        let mut tier = SafetyTier::Safe;
        for candidate in spellings(path) {
            match self.classify(&candidate) {
                SafetyTier::Protected => return Err(Refusal::Protected),
                SafetyTier::Caution => tier = SafetyTier::Caution,
                SafetyTier::Safe => {}
            }
        }
        if let Some(executable) = self.running_inside(path) {
            return Err(Refusal::InUse { executable });
        }
        Ok(tier)
    }

    /// True if the path may be deleted with user consent
    pub fn is_safe_to_delete(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }

    /// First running executable that lives under `path`, or whose app bundle
    /// contains `path`. Symlinked parents are followed.
    pub fn running_inside(&self, path: &Path) -> Option<PathBuf> {
        let candidates = spellings(path);
        self.probe
            .running_executables()
            .into_iter()
            .find(|exe| {
                let exe = normalize(exe);
                candidates.iter().any(|path| {
                    exe.starts_with(path)
                        || bundle_root(&exe).is_some_and(|root| path.starts_with(root))
                })
            })
    }
}

/// `path` with its parent resolved through symlinks. The last component is
/// kept as written, since removal acts on a symlink itself.
pub fn resolve_parent(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = std::fs::canonicalize(path.parent()?).ok()?;
    Some(parent.join(name))
}

/// The lexical form of `path`, plus its resolved form when that differs
fn spellings(path: &Path) -> Vec<PathBuf> {
    let mut out = vec![normalize(path)];
    if let Some(resolved) = resolve_parent(path) {
        if !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out
}

/// Lexically resolve `.` and `..` so `/tmp/../usr` cannot dodge the deny-list
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Nearest ancestor that is an `.app` bundle
fn bundle_root(path: &Path) -> Option<&Path> {
    path.ancestors()
        .find(|p| p.extension().is_some_and(|e| e == "app"))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n != "." && n != "..")
        .unwrap_or(false)
}
