//! Saved layout document.
//!
//! ```xml
//! <launchpad>
//!   <tab name="Internet" selected="true">
//!     <cell index="0" path="/Applications/Safari.app" icon="/…/Safari.png"/>
//!   </tab>
//! </launchpad>
//! ```
//!
//! Only occupied cells are written, ascending by index. On load every record is
//! re-validated; a record whose bundle is gone leaves its cell empty.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::apps::AppEntry;
use crate::config::Settings;
use crate::error::{LaunchpadError, Result};
use crate::icons::cache::IconCache;
use crate::logs;
use crate::registry::{CellRef, Registry, DEFAULT_TAB_NAME};
use crate::resolver;

const ROOT: &[u8] = b"launchpad";
const TAB: &[u8] = b"tab";
const CELL: &[u8] = b"cell";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedLayout {
    pub tabs: Vec<SavedTab>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedTab {
    pub name: String,
    pub selected: bool,
    pub cells: Vec<SavedCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCell {
    /// Stored index. Informational only: records are placed in document order.
    pub index: Option<usize>,
    pub path: PathBuf,
    pub icon: Option<PathBuf>,
}

/// Capture the persistent parts of `registry`.
pub fn snapshot(registry: &Registry) -> SavedLayout {
    let tabs = registry
        .tabs()
        .iter()
        .enumerate()
        .map(|(index, tab)| SavedTab {
            name: tab.name().to_string(),
            selected: registry.selected() == Some(index),
            cells: tab
                .entries()
                .map(|(cell, entry)| SavedCell {
                    index: Some(cell),
                    path: entry.bundle_path.clone(),
                    icon: entry.custom_icon_path.clone(),
                })
                .collect(),
        })
        .collect();

    SavedLayout { tabs }
}

pub fn to_xml(layout: &SavedLayout) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("launchpad")))?;

    for tab in &layout.tabs {
        let mut element = BytesStart::new("tab");
        element.push_attribute(("name", tab.name.as_str()));
        if tab.selected {
            element.push_attribute(("selected", "true"));
        }
        writer.write_event(Event::Start(element))?;

        for cell in &tab.cells {
            let mut element = BytesStart::new("cell");
            if let Some(index) = cell.index {
                element.push_attribute(("index", index.to_string().as_str()));
            }
            element.push_attribute(("path", cell.path.to_string_lossy().as_ref()));
            if let Some(icon) = &cell.icon {
                element.push_attribute(("icon", icon.to_string_lossy().as_ref()));
            }
            writer.write_event(Event::Empty(element))?;
        }

        writer.write_event(Event::End(BytesEnd::new("tab")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("launchpad")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| LaunchpadError::Persistence(e.to_string()))
}

/// Parse a layout document. Cells outside a tab and cells without a path are
/// ignored; a document without the root element is an error.
pub fn parse(xml: &str) -> Result<SavedLayout> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut layout = SavedLayout::default();
    let mut seen_root = false;
    let mut in_tab = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                match element.name().as_ref() {
                    ROOT => seen_root = true,
                    TAB => {
                        layout.tabs.push(read_tab(&element)?);
                        in_tab = true;
                    }
                    CELL if in_tab => push_cell(&mut layout, &element)?,
                    _ => {}
                }
            }
            Event::Empty(element) => match element.name().as_ref() {
                ROOT => seen_root = true,
                TAB => layout.tabs.push(read_tab(&element)?),
                CELL if in_tab => push_cell(&mut layout, &element)?,
                _ => {}
            },
            Event::End(element) if element.name().as_ref() == TAB => in_tab = false,
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(LaunchpadError::Persistence(
            "missing <launchpad> root element".to_string(),
        ));
    }
    Ok(layout)
}

fn read_tab(element: &BytesStart) -> Result<SavedTab> {
    Ok(SavedTab {
        name: attribute(element, "name")?.unwrap_or_default(),
        selected: attribute(element, "selected")?
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        cells: Vec::new(),
    })
}

fn push_cell(layout: &mut SavedLayout, element: &BytesStart) -> Result<()> {
    let Some(path) = attribute(element, "path")?.filter(|p| !p.trim().is_empty()) else {
        return Ok(());
    };
    let index = attribute(element, "index")?.and_then(|value| value.trim().parse().ok());
    let icon = attribute(element, "icon")?
        .filter(|icon| !icon.trim().is_empty())
        .map(PathBuf::from);

    if let Some(tab) = layout.tabs.last_mut() {
        tab.cells.push(SavedCell {
            index,
            path: PathBuf::from(path),
            icon,
        });
    }
    Ok(())
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| LaunchpadError::Persistence(e.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| LaunchpadError::Persistence(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Rebuild a registry from a parsed layout.
///
/// Each tab grows once to fit its record count, then records fill consecutive
/// cells from zero in document order. Stored indices are only checked against
/// that position. Records
/// whose bundle no longer exists, or that repeat an earlier bundle, are
/// skipped and leave their cell empty.
pub fn restore(
    layout: &SavedLayout,
    icons: &mut IconCache,
    columns: usize,
    initial_rows: usize,
    icon_size: u32,
) -> Registry {
    let mut registry = Registry::new(columns, initial_rows);
    let mut seen = HashSet::new();
    let mut selected = None;

    for saved in &layout.tabs {
        let name = match saved.name.trim() {
            "" => DEFAULT_TAB_NAME,
            name => name,
        };
        let mut tab = registry.new_tab(name);
        if let Some(last) = saved.cells.len().checked_sub(1) {
            tab.ensure_cell_index(last);
        }
        let tab_index = registry.push_tab(tab);
        if saved.selected {
            selected = Some(tab_index);
        }

        for (position, cell) in saved.cells.iter().enumerate() {
            if cell.index != Some(position) {
                logs::log_warn(&format!(
                    "Cell index {:?} in \"{}\" does not match position {}; using position",
                    cell.index, name, position
                ));
            }

            let Some(bundle) = resolver::resolve_bundle_root(&cell.path) else {
                logs::log_warn(&format!("Skipping missing bundle {}", cell.path.display()));
                continue;
            };
            if !seen.insert(resolver::canonical_identity(&bundle)) {
                logs::log_warn(&format!("Skipping repeated bundle {}", bundle.display()));
                continue;
            }

            let Some(entry) = restore_entry(&bundle, cell.icon.as_deref(), icons, icon_size) else {
                continue;
            };
            if let Err(e) = registry.place_entry(CellRef::new(tab_index, position), entry) {
                logs::log_warn(&format!("Could not restore {}: {}", bundle.display(), e));
            }
        }
    }

    if registry.tab_count() == 0 {
        return Registry::with_default_tab(columns, initial_rows);
    }
    let _ = registry.select_tab(selected.unwrap_or(0));
    registry
}

fn restore_entry(
    bundle: &Path,
    icon: Option<&Path>,
    icons: &mut IconCache,
    icon_size: u32,
) -> Option<AppEntry> {
    // Seed the cache first so creating the entry picks the override up.
    let custom = icon
        .filter(|icon| icon.is_file())
        .filter(|icon| icons.load_override(bundle, icon, icon_size).is_some())
        .map(Path::to_path_buf);

    let mut entry = AppEntry::create(bundle, icons, icon_size)?;
    entry.custom_icon_path = custom;
    Some(entry)
}

/// Write the layout next to `path` and rename it into place.
pub fn save(path: &Path, registry: &Registry) -> Result<()> {
    let xml = to_xml(&snapshot(registry))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".layout-")
        .suffix(".xml")
        .tempfile_in(dir)?;
    tmp.write_all(xml.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Load the saved layout, falling back to a single empty default tab when the
/// file is missing or unreadable.
pub fn load(path: &Path, icons: &mut IconCache, settings: &Settings) -> Registry {
    let fallback = || Registry::with_default_tab(settings.columns, settings.initial_rows);

    if !path.exists() {
        return fallback();
    }

    let layout = fs::read_to_string(path)
        .map_err(LaunchpadError::from)
        .and_then(|xml| parse(&xml));

    match layout {
        Ok(layout) => restore(
            &layout,
            icons,
            settings.columns,
            settings.initial_rows,
            settings.icon_render_size,
        ),
        Err(e) => {
            logs::log_error(&format!("Failed to load {}: {}", path.display(), e));
            fallback()
        }
    }
}
