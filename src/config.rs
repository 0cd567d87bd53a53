use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::APP_NAME;
use crate::error::Result;
use crate::logs;

/// Smallest timeout the thumbnail helper is ever given.
pub const MIN_THUMBNAIL_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_columns")]
    pub columns: usize,

    #[serde(default = "default_initial_rows")]
    pub initial_rows: usize,

    #[serde(default = "default_icon_render_size")]
    pub icon_render_size: u32,

    #[serde(default = "default_cell_size")]
    pub cell_size: u32,

    #[serde(default = "default_thumbnail_timeout_ms")]
    pub thumbnail_timeout_ms: u64,

    #[serde(default = "default_thumbnailer")]
    pub thumbnailer: PathBuf,

    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: i32,

    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

fn default_columns() -> usize {
    7
}

fn default_initial_rows() -> usize {
    7
}

fn default_icon_render_size() -> u32 {
    120
}

fn default_cell_size() -> u32 {
    150
}

fn default_thumbnail_timeout_ms() -> u64 {
    2500
}

fn default_thumbnailer() -> PathBuf {
    PathBuf::from("/usr/bin/qlmanage")
}

fn default_drag_threshold_px() -> i32 {
    5
}

fn default_double_click_ms() -> u64 {
    500
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            initial_rows: default_initial_rows(),
            icon_render_size: default_icon_render_size(),
            cell_size: default_cell_size(),
            thumbnail_timeout_ms: default_thumbnail_timeout_ms(),
            thumbnailer: default_thumbnailer(),
            drag_threshold_px: default_drag_threshold_px(),
            double_click_ms: default_double_click_ms(),
            cache_dir: None,
            state_file: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, writing the defaults back when no file exists yet.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        match fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                logs::log_warn(&format!("Failed to parse settings: {}. Using defaults.", e));
                Self::default()
            }),
            Err(_) => {
                let default = Self::default();
                if let Err(e) = default.save() {
                    logs::log_warn(&format!("Could not write default settings: {}", e));
                }
                default
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Settings>(contents)?.normalized())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamp values that would break the grid or the thumbnail helper.
    fn normalized(mut self) -> Self {
        self.columns = self.columns.max(1);
        self.initial_rows = self.initial_rows.max(1);
        self.icon_render_size = self.icon_render_size.max(16);
        self.thumbnail_timeout_ms = self.thumbnail_timeout_ms.max(MIN_THUMBNAIL_TIMEOUT_MS);
        self
    }

    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_millis(self.thumbnail_timeout_ms.max(MIN_THUMBNAIL_TIMEOUT_MS))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
                .join("appIcons")
        })
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| config_root().join(format!("{}.xml", APP_NAME)))
    }

    pub fn config_path() -> PathBuf {
        config_root().join("settings.json")
    }
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}
