use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bundle identifiers of OS-vendor applications that are never uninstalled
const SYSTEM_APPS: &[&str] = &[
    "com.apple.Safari",
    "com.apple.mail",
    "com.apple.iCal",
    "com.apple.AddressBook",
    "com.apple.finder",
    "com.apple.Terminal",
    "com.apple.Preview",
    "com.apple.TextEdit",
    "com.apple.Notes",
    "com.apple.reminders",
    "com.apple.Maps",
    "com.apple.Photos",
    "com.apple.Music",
    "com.apple.podcasts",
    "com.apple.news",
    "com.apple.stocks",
    "com.apple.FaceTime",
    "com.apple.MobileSMS",
    "com.apple.AppStore",
    "com.apple.systempreferences",
];

/// Metadata parsed from an application's manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub bundle_id: Option<String>,
    pub display_name: Option<String>,
    pub version: Option<String>,
}

impl AppDescriptor {
    fn is_empty(&self) -> bool {
        self.bundle_id.is_none() && self.display_name.is_none() && self.version.is_none()
    }
}

/// An installed application.
///
/// A missing or corrupt manifest leaves `descriptor` empty; matching then
/// falls back to the bundle's file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBundle {
    pub path: PathBuf,
    /// File stem of the bundle, e.g. `Slack` for `Slack.app`
    pub name: String,
    pub descriptor: Option<AppDescriptor>,
    /// Size of the bundle itself in bytes
    pub size: u64,
}

impl AppBundle {
    /// Read a bundle and its manifest. Never fails; an unreadable manifest
    /// just yields no descriptor.
    pub fn load(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let descriptor = parse_manifest(path);
        if descriptor.is_none() {
            tracing::debug!(app = %path.display(), "no usable manifest; matching by name only");
        }

        Self {
            path: path.to_path_buf(),
            name,
            descriptor,
            size: 0,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Bundle identifier, if known and non-empty
    pub fn bundle_id(&self) -> Option<&str> {
        self.descriptor
            .as_ref()
            .and_then(|d| d.bundle_id.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn version(&self) -> Option<&str> {
        self.descriptor.as_ref().and_then(|d| d.version.as_deref())
    }

    /// Name shown to users: the manifest's display name, else the file stem
    pub fn display_name(&self) -> &str {
        self.descriptor
            .as_ref()
            .and_then(|d| d.display_name.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }

    /// OS-vendor application that must not be uninstalled
    pub fn is_system_app(&self) -> bool {
        match self.bundle_id() {
            Some(id) => SYSTEM_APPS.iter().any(|s| s.eq_ignore_ascii_case(id)),
            None => false,
        }
    }
}

/// Location of the manifest inside a bundle
pub fn manifest_path(bundle: &Path) -> PathBuf {
    bundle.join("Contents/Info.plist")
}

fn parse_manifest(bundle: &Path) -> Option<AppDescriptor> {
    let plist_val = plist::Value::from_file(manifest_path(bundle)).ok()?;
    let dict = plist_val.as_dictionary()?;

    let get = |key: &str| {
        dict.get(key)
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
    };

    let descriptor = AppDescriptor {
        bundle_id: get("CFBundleIdentifier"),
        display_name: get("CFBundleDisplayName").or_else(|| get("CFBundleName")),
        version: get("CFBundleShortVersionString").or_else(|| get("CFBundleVersion")),
    };

    if descriptor.is_empty() {
        None
    } else {
        Some(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(bundle: &Path, body: &str) {
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();
        std::fs::write(manifest_path(bundle), body).unwrap();
    }

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.example.App</string>
    <key>CFBundleName</key>
    <string>Example</string>
    <key>CFBundleShortVersionString</key>
    <string>2.4.1</string>
</dict>
</plist>"#;

    #[test]
    fn test_load_parses_manifest() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("App.app");
        write_manifest(&bundle, MANIFEST);

        let app = AppBundle::load(&bundle);
        assert_eq!(app.name, "App");
        assert_eq!(app.bundle_id(), Some("com.example.App"));
        assert_eq!(app.display_name(), "Example");
        assert_eq!(app.version(), Some("2.4.1"));
        assert!(!app.is_system_app());
    }

    #[test]
    fn test_missing_manifest_degrades() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Bare.app");
        std::fs::create_dir_all(&bundle).unwrap();

        let app = AppBundle::load(&bundle);
        assert_eq!(app.descriptor, None);
        assert_eq!(app.bundle_id(), None);
        assert_eq!(app.display_name(), "Bare");
    }

    #[test]
    fn test_corrupt_manifest_degrades() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Broken.app");
        write_manifest(&bundle, "<plist><dict><key>CFBundle");

        let app = AppBundle::load(&bundle);
        assert_eq!(app.descriptor, None);
        assert_eq!(app.display_name(), "Broken");
    }

    #[test]
    fn test_system_app_detection() {
        let app = AppBundle {
            path: PathBuf::from("/Applications/Safari.app"),
            name: "Safari".into(),
            descriptor: Some(AppDescriptor {
                bundle_id: Some("com.apple.Safari".into()),
                ..AppDescriptor::default()
            }),
            size: 0,
        };
        assert!(app.is_system_app());
    }
}
