//! Discovery of importable bundles in a user-chosen folder.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::apps;
use crate::bundle;
use crate::resolver;
use crate::walk;

/// Only the top level of the chosen folder is scanned.
pub const IMPORT_DEPTH: usize = 1;

/// Path fragments of bundles nested inside other applications.
const NESTED_HELPER_DIRS: [&str; 2] = ["/Contents/Library/LoginItems/", "/Contents/Helpers/"];

/// Folders that get special treatment during import.
#[derive(Debug, Clone)]
pub struct KnownLocations {
    pub applications: PathBuf,
    pub system_applications: PathBuf,
}

impl Default for KnownLocations {
    fn default() -> Self {
        Self {
            applications: PathBuf::from("/Applications"),
            system_applications: apps::system_applications_dir(),
        }
    }
}

impl KnownLocations {
    /// Roots to scan for `chosen`. Importing the main applications folder also
    /// pulls in the system applications and their utilities.
    pub fn roots_for(&self, chosen: &Path) -> Vec<PathBuf> {
        let mut roots = vec![chosen.to_path_buf()];

        let is_applications = resolver::canonical_identity(chosen)
            == resolver::canonical_identity(&self.applications);
        if is_applications {
            roots.extend(
                [
                    self.system_applications.clone(),
                    self.system_applications.join("Utilities"),
                ]
                .into_iter()
                .filter(|dir| dir.is_dir()),
            );
        }
        roots
    }
}

/// Resolved, de-duplicated, user-facing bundles under `chosen`, in scan order.
pub fn discover_bundles(chosen: &Path, locations: &KnownLocations) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for root in locations.roots_for(chosen) {
        walk::walk_subtree(
            root,
            IMPORT_DEPTH,
            |dir: &PathBuf| walk::dir_children(dir, true),
            |path, depth| {
                if depth > 0 && resolver::is_bundle_name(path) {
                    candidates.push(path.clone());
                }
            },
        );
    }

    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(|path| resolver::resolve_bundle_root(path))
        .filter(|bundle| !is_nested_helper(bundle))
        .filter(|bundle| bundle::is_user_facing(bundle))
        .filter(|bundle| seen.insert(resolver::canonical_identity(bundle)))
        .collect()
}

fn is_nested_helper(bundle: &Path) -> bool {
    let path = bundle.to_string_lossy();
    NESTED_HELPER_DIRS
        .iter()
        .any(|fragment| path.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{app_plist, write_bundle};
    use std::fs;
    use tempfile::TempDir;

    fn locations(root: &Path) -> KnownLocations {
        KnownLocations {
            applications: root.join("Applications"),
            system_applications: root.join("System/Applications"),
        }
    }

    fn names(bundles: &[PathBuf]) -> Vec<String> {
        bundles.iter().map(|b| resolver::bundle_stem(b)).collect()
    }

    #[test]
    fn test_top_level_user_facing_only() {
        let dir = TempDir::new().unwrap();
        let chosen = dir.path().join("Stuff");
        fs::create_dir_all(&chosen).unwrap();

        write_bundle(&chosen, "Editor.app", &app_plist(""));
        write_bundle(&chosen, "Editor Updater.app", &app_plist(""));
        write_bundle(
            &chosen,
            "Menu.app",
            &app_plist("<key>LSBackgroundOnly</key><true/>"),
        );
        fs::create_dir_all(chosen.join("Nested")).unwrap();
        write_bundle(&chosen.join("Nested"), "Deep.app", &app_plist(""));
        fs::write(chosen.join("Readme.txt"), b"").unwrap();

        let found = discover_bundles(&chosen, &locations(dir.path()));
        assert_eq!(names(&found), vec!["Editor"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_bundles_collapse() {
        let dir = TempDir::new().unwrap();
        let real = write_bundle(dir.path(), "Tool.app", &app_plist(""));
        let chosen = dir.path().join("Links");
        fs::create_dir_all(&chosen).unwrap();
        std::os::unix::fs::symlink(&real, chosen.join("Tool.app")).unwrap();
        std::os::unix::fs::symlink(&real, chosen.join("Tool Copy.app")).unwrap();

        let found = discover_bundles(&chosen, &locations(dir.path()));
        assert_eq!(found, vec![fs::canonicalize(&real).unwrap()]);
    }

    #[test]
    fn test_applications_pulls_in_system_folders() {
        let dir = TempDir::new().unwrap();
        let known = locations(dir.path());
        fs::create_dir_all(&known.applications).unwrap();
        fs::create_dir_all(known.system_applications.join("Utilities")).unwrap();

        write_bundle(&known.applications, "Mine.app", &app_plist(""));
        write_bundle(&known.system_applications, "Notes.app", &app_plist(""));
        write_bundle(
            &known.system_applications.join("Utilities"),
            "Terminal.app",
            &app_plist(""),
        );

        let found = discover_bundles(&known.applications, &known);
        assert_eq!(names(&found), vec!["Mine", "Notes", "Terminal"]);

        let elsewhere = dir.path().join("Other");
        fs::create_dir_all(&elsewhere).unwrap();
        assert_eq!(known.roots_for(&elsewhere), vec![elsewhere.clone()]);
    }

    #[test]
    fn test_nested_helper_paths() {
        assert!(is_nested_helper(Path::new(
            "/Applications/Big.app/Contents/Library/LoginItems/Launcher.app"
        )));
        assert!(is_nested_helper(Path::new(
            "/Applications/Big.app/Contents/Helpers/Sync.app"
        )));
        assert!(!is_nested_helper(Path::new("/Applications/Big.app")));
    }
}
