//! Maps arbitrary filesystem paths onto the real `.app` bundle they belong to.
//!
//! Application folders on macOS alias each other (`/Applications/Safari.app` is a
//! firmlink onto `/System/Applications`), so every identity comparison in the
//! launcher goes through [`canonical_identity`].

use std::fs;
use std::path::{Path, PathBuf};

pub const BUNDLE_EXTENSION: &str = "app";

/// True when the final path component carries the bundle suffix.
pub fn is_bundle_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(BUNDLE_EXTENSION))
        .unwrap_or(false)
}

/// Climb from `path` to the enclosing bundle and return its real location.
///
/// Returns `None` when no ancestor is a bundle, or when the bundle cannot be
/// confirmed as a directory either through its real path or through the path
/// as given.
pub fn resolve_bundle_root(path: &Path) -> Option<PathBuf> {
    let absolute = absolute(path);
    let root = absolute.ancestors().find(|p| is_bundle_name(p))?;

    if let Ok(real) = fs::canonicalize(root)
        && real.is_dir()
        && is_bundle_name(&real)
    {
        return Some(real);
    }

    fs::symlink_metadata(root)
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
        .then(|| root.to_path_buf())
}

/// Canonical absolute path used as a de-duplication key. Never fails.
pub fn canonical_identity(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| absolute(path))
        .to_string_lossy()
        .into_owned()
}

/// Bundle file name with the suffix removed (`Safari.app` -> `Safari`).
pub fn bundle_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case(BUNDLE_EXTENSION) && !stem.is_empty() => {
            stem.to_string()
        }
        _ => name,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
