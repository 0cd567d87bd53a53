//! What a drag carries. A drag started inside the grid carries an internal
//! payload naming its source cell; drags from outside carry file lists or text.

use std::path::{Path, PathBuf};

use crate::registry::{CellRef, Registry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub path: PathBuf,
    pub source: CellRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    pub internal: Option<DragPayload>,
    pub files: Vec<PathBuf>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropSource {
    Internal(DragPayload),
    External(PathBuf),
}

impl DropSource {
    pub fn path(&self) -> &Path {
        match self {
            DropSource::Internal(payload) => &payload.path,
            DropSource::External(path) => path,
        }
    }

    pub fn source_cell(&self) -> Option<CellRef> {
        match self {
            DropSource::Internal(payload) => Some(payload.source),
            DropSource::External(_) => None,
        }
    }
}

impl Transfer {
    /// Start an internal drag from an occupied cell.
    pub fn from_cell(registry: &Registry, source: CellRef) -> Option<Self> {
        let entry = registry.entry(source)?;
        Some(Self {
            internal: Some(DragPayload {
                path: entry.bundle_path.clone(),
                source,
            }),
            files: Vec::new(),
            text: Some(entry.bundle_path.to_string_lossy().into_owned()),
        })
    }

    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Internal payload, else the first file, else the text as a path.
    pub fn source(&self) -> Option<DropSource> {
        if let Some(payload) = &self.internal {
            return Some(DropSource::Internal(payload.clone()));
        }
        if let Some(first) = self.files.first() {
            return Some(DropSource::External(first.clone()));
        }
        self.text
            .as_deref()
            .and_then(text_to_path)
            .map(DropSource::External)
    }
}

fn text_to_path(text: &str) -> Option<PathBuf> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    let path = line.strip_prefix("file://").unwrap_or(line);
    Some(PathBuf::from(path))
}
