use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Result;

const GENERIC_APP_ICON: &str =
    "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources/GenericApplicationIcon.icns";

pub fn launch(bundle: &Path) -> Result<()> {
    open(&[bundle.as_os_str()])
}

pub fn reveal(bundle: &Path) -> Result<()> {
    open(&[OsStr::new("-R"), bundle.as_os_str()])
}

// `open` hands off to LaunchServices and returns straight away.
fn open(args: &[&OsStr]) -> Result<()> {
    let status = Command::new("open").args(args).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("open exited with {}", status)).into())
    }
}

pub fn generic_app_icon() -> Option<PathBuf> {
    Some(PathBuf::from(GENERIC_APP_ICON)).filter(|path| path.is_file())
}

pub fn system_applications_dir() -> PathBuf {
    PathBuf::from("/System/Applications")
}
