use std::path::{Path, PathBuf};

use crate::bundle::BundleInfo;
use crate::error::Result;
use crate::icons::cache::IconCache;
use crate::icons::IconHandle;
use crate::logs;
use crate::resolver;

#[path = "platforms/macos.rs"]
#[cfg(target_os = "macos")]
mod macos;

#[path = "platforms/other.rs"]
#[cfg(not(target_os = "macos"))]
mod other;

/// An application placed in a cell.
#[derive(Debug, Clone)]
pub struct AppEntry {
    /// Resolved bundle root
    pub bundle_path: PathBuf,
    /// Name shown under the icon
    pub display_name: String,
    /// Current bitmap, shared with the icon cache
    pub icon: IconHandle,
    /// Set only when the user picked an icon or one was restored from disk
    pub custom_icon_path: Option<PathBuf>,
}

impl AppEntry {
    /// Build an entry for an existing bundle, resolving its icon through `icons`.
    pub fn create(bundle: &Path, icons: &mut IconCache, icon_size: u32) -> Option<Self> {
        if !bundle.is_dir() {
            return None;
        }

        let display_name = BundleInfo::load(bundle)
            .map(|info| info.display_name_or_stem())
            .unwrap_or_else(|| resolver::bundle_stem(bundle));

        Some(Self {
            bundle_path: bundle.to_path_buf(),
            display_name,
            icon: icons.get_or_resolve(bundle, icon_size),
            custom_icon_path: None,
        })
    }
}

pub fn launch(entry: &AppEntry) -> Result<()> {
    logs::log_info(&format!("Launching {}", entry.bundle_path.display()));

    #[cfg(target_os = "macos")]
    {
        macos::launch(&entry.bundle_path)
    }

    #[cfg(not(target_os = "macos"))]
    {
        other::launch(&entry.bundle_path)
    }
}

/// Show the bundle in the platform file browser.
pub fn reveal(entry: &AppEntry) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        macos::reveal(&entry.bundle_path)
    }

    #[cfg(not(target_os = "macos"))]
    {
        other::reveal(&entry.bundle_path)
    }
}

/// The platform's generic application icon, if it has one.
pub fn generic_app_icon() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        macos::generic_app_icon()
    }

    #[cfg(not(target_os = "macos"))]
    {
        other::generic_app_icon()
    }
}

/// Folders scanned in addition to `/Applications` when importing it.
pub fn system_applications_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        macos::system_applications_dir()
    }

    #[cfg(not(target_os = "macos"))]
    {
        other::system_applications_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconPipeline;
    use crate::testutil::{app_plist, write_bundle};
    use tempfile::TempDir;

    #[test]
    fn test_create_uses_display_name() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(
            dir.path(),
            "Foo.app",
            &app_plist("<key>CFBundleName</key><string>Foo Pro</string>"),
        );
        let mut icons = IconCache::init(dir.path().join("icons"), IconPipeline::new(vec![])).unwrap();

        let entry = AppEntry::create(&bundle, &mut icons, 48).unwrap();
        assert_eq!(entry.display_name, "Foo Pro");
        assert_eq!(entry.icon.dimensions(), (48, 48));
        assert!(entry.custom_icon_path.is_none());
    }

    #[test]
    fn test_create_without_metadata_uses_stem() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Bare.app");
        std::fs::create_dir_all(&bundle).unwrap();
        let mut icons = IconCache::init(dir.path().join("icons"), IconPipeline::new(vec![])).unwrap();

        let entry = AppEntry::create(&bundle, &mut icons, 16).unwrap();
        assert_eq!(entry.display_name, "Bare");
    }

    #[test]
    fn test_create_missing_bundle() {
        let dir = TempDir::new().unwrap();
        let mut icons = IconCache::init(dir.path().join("icons"), IconPipeline::new(vec![])).unwrap();
        assert!(AppEntry::create(&dir.path().join("Gone.app"), &mut icons, 16).is_none());
    }
}
