use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

fn unsupported(action: &str, bundle: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot {} {} on this platform", action, bundle.display()),
    )
}

pub fn launch(bundle: &Path) -> Result<()> {
    Err(unsupported("launch", bundle).into())
}

pub fn reveal(bundle: &Path) -> Result<()> {
    Err(unsupported("reveal", bundle).into())
}

pub fn generic_app_icon() -> Option<PathBuf> {
    None
}

pub fn system_applications_dir() -> PathBuf {
    PathBuf::from("/System/Applications")
}
