use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchpadError {
    #[error("{} is not an application bundle", .0.display())]
    Resolution(PathBuf),

    #[error("Unable to read image {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Application {name} already exists in the \"{tab}\" category (cell {cell}).")]
    Duplicate {
        name: String,
        tab: String,
        tab_index: usize,
        cell: usize,
    },

    #[error("No room left in the \"{0}\" category")]
    CapacityExhausted(String),

    #[error("Thumbnail helper did not finish within {0:?}")]
    ExternalToolTimeout(Duration),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Cell {cell} on tab {tab} is already occupied")]
    CellOccupied { tab: usize, cell: usize },

    #[error("Cell {cell} on tab {tab} does not exist")]
    InvalidCell { tab: usize, cell: usize },

    #[error("Tab {0} does not exist")]
    UnknownTab(usize),

    #[error("Category names cannot be blank")]
    InvalidTabName,

    #[error("No category under the drop location")]
    NoDropTarget,

    #[error("Nothing usable was dropped")]
    EmptyTransfer,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LaunchpadError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LaunchpadError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure should be shown to the user rather than only logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            LaunchpadError::Duplicate { .. }
                | LaunchpadError::Decode { .. }
                | LaunchpadError::InvalidTabName
        )
    }
}

pub type Result<T> = std::result::Result<T, LaunchpadError>;
