use std::io::ErrorKind;
use std::path::Path;

/// Paths requiring Full Disk Access on macOS
const FDA_PATHS: &[&str] = &[
    "Library/Mail",
    "Library/Messages",
    "Library/Safari",
    "Library/Cookies",
    "Library/HomeKit",
    "Library/IdentityServices",
    "Library/Metadata/CoreSpotlight",
    "Library/Containers/com.apple.Safari",
    ".Trash",
];

/// Check if a path likely requires Full Disk Access
pub fn requires_full_disk_access(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    FDA_PATHS.iter().any(|p| path_str.contains(p))
}

/// Check if we can list a directory's entries.
/// A missing directory is not a permission problem, so it counts as listable.
pub fn can_list(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(_) => true,
        Err(e) => e.kind() == ErrorKind::NotFound,
    }
}

/// Human-readable failure reason for a deletion error
pub fn failure_reason(path: &Path, err: &std::io::Error) -> String {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            if requires_full_disk_access(path) {
                "permission denied (grant Full Disk Access in System Settings > Privacy & Security)"
                    .to_string()
            } else {
                "permission denied".to_string()
            }
        }
        ErrorKind::NotFound => "not found".to_string(),
        _ => err.to_string(),
    }
}
