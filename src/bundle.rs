//! Read-only view of a bundle's `Info.plist`.

use plist::{Dictionary, Value};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::resolver;

const APPLICATION_PACKAGE_TYPE: &str = "APPL";

/// Names that mark a bundle as plumbing rather than something a user launches.
const NOT_USER_FACING: &str = "(helper|updat(er|e)|agent|daemon|service|installer|uninstall|crash|report(er)?|diagnostic|plugin|sample|example|test)";

pub fn info_plist_path(bundle: &Path) -> PathBuf {
    bundle.join("Contents").join("Info.plist")
}

pub fn resources_dir(bundle: &Path) -> PathBuf {
    bundle.join("Contents").join("Resources")
}

pub fn assets_car_path(bundle: &Path) -> PathBuf {
    resources_dir(bundle).join("Assets.car")
}

#[derive(Debug, Clone)]
pub struct BundleInfo {
    root: PathBuf,
    plist: Dictionary,
}

impl BundleInfo {
    /// Parse `Contents/Info.plist`; `None` if it is missing or not a dictionary.
    pub fn load(bundle: &Path) -> Option<Self> {
        let plist = Value::from_file(info_plist_path(bundle))
            .ok()?
            .into_dictionary()?;

        Some(Self {
            root: bundle.to_path_buf(),
            plist,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_type(&self) -> Option<&str> {
        self.string("CFBundlePackageType")
    }

    pub fn bundle_name(&self) -> Option<&str> {
        self.string("CFBundleName")
    }

    /// `CFBundleDisplayName`, then `CFBundleName`.
    pub fn display_name(&self) -> Option<&str> {
        self.string("CFBundleDisplayName")
            .or_else(|| self.bundle_name())
    }

    /// Display name with the file name as the last resort.
    pub fn display_name_or_stem(&self) -> String {
        self.display_name()
            .map(str::to_string)
            .unwrap_or_else(|| resolver::bundle_stem(&self.root))
    }

    /// Declared `.icns` file name, suffix added when the plist omits it.
    pub fn icon_file(&self) -> Option<String> {
        self.string("CFBundleIconFile").map(with_icns_suffix)
    }

    pub fn icon_name(&self) -> Option<String> {
        self.string("CFBundleIconName").map(with_icns_suffix)
    }

    /// Base names listed under `CFBundleIcons` (or the iPad variant).
    pub fn icon_variant_files(&self) -> Vec<String> {
        self.plist
            .get("CFBundleIcons")
            .or_else(|| self.plist.get("CFBundleIcons~ipad"))
            .and_then(Value::as_dictionary)
            .and_then(|icons| icons.get("CFBundlePrimaryIcon"))
            .and_then(Value::as_dictionary)
            .and_then(|primary| primary.get("CFBundleIconFiles"))
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_string)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_background_only(&self) -> bool {
        self.flag("LSBackgroundOnly")
    }

    pub fn is_ui_element(&self) -> bool {
        self.flag("LSUIElement")
    }

    pub fn is_application(&self) -> bool {
        self.package_type()
            .map(|t| t.eq_ignore_ascii_case(APPLICATION_PACKAGE_TYPE))
            .unwrap_or(false)
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.plist
            .get(key)?
            .as_string()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        match self.plist.get(key) {
            Some(Value::Boolean(b)) => *b,
            Some(Value::Integer(i)) => i.as_signed() == Some(1),
            Some(Value::String(s)) => {
                let s = s.trim();
                s == "1" || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        }
    }
}

fn with_icns_suffix(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".icns") {
        name.to_string()
    } else {
        format!("{}.icns", name)
    }
}

fn not_user_facing() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(NOT_USER_FACING).expect("denylist pattern is valid"))
}

/// True when `name` looks like a helper, updater, installer and so on.
pub fn is_denylisted_name(name: &str) -> bool {
    not_user_facing().is_match(&name.to_lowercase())
}

/// Heuristic used by folder import to keep only bundles a person would launch.
pub fn is_user_facing(bundle: &Path) -> bool {
    let Some(info) = BundleInfo::load(bundle) else {
        return false;
    };

    if !info.is_application() || info.is_background_only() || info.is_ui_element() {
        return false;
    }

    let file_name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let declared = info.display_name().unwrap_or(file_name.as_str());

    !is_denylisted_name(declared) && !is_denylisted_name(&file_name)
}
