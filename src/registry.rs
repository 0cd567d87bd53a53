//! Tabs of fixed-width cell grids and the application entries placed in them.
//!
//! An application may appear at most once across all tabs. Callers check that
//! with [`Registry::find_by_canonical_path`] before placing anything; the
//! registry itself only guards cell occupancy.

use crate::apps::AppEntry;
use crate::error::{LaunchpadError, Result};
use crate::resolver;

pub const DEFAULT_TAB_NAME: &str = "Default";

/// Address of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub tab: usize,
    pub cell: usize,
}

impl CellRef {
    pub fn new(tab: usize, cell: usize) -> Self {
        Self { tab, cell }
    }
}

/// Where an application already lives, for duplicate reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub tab_index: usize,
    pub cell_index: usize,
    pub tab_name: String,
}

impl Location {
    pub fn cell_ref(&self) -> CellRef {
        CellRef::new(self.tab_index, self.cell_index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cell {
    entry: Option<AppEntry>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn entry(&self) -> Option<&AppEntry> {
        self.entry.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Tab {
    name: String,
    cells: Vec<Cell>,
    columns: usize,
    enabled: bool,
}

impl Tab {
    pub fn new(name: impl Into<String>, columns: usize, rows: usize) -> Self {
        let columns = columns.max(1);
        Self {
            name: name.into(),
            cells: vec![Cell::default(); columns * rows],
            columns,
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.cells.len() / self.columns
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn entry(&self, index: usize) -> Option<&AppEntry> {
        self.cells.get(index)?.entry()
    }

    /// Occupied cells in grid order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &AppEntry)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.entry().map(|entry| (index, entry)))
    }

    /// Returns false, leaving the grid untouched, when the new size overflows.
    pub fn add_rows(&mut self, rows: usize) -> bool {
        let Some(grown) = rows
            .checked_mul(self.columns)
            .and_then(|added| self.cells.len().checked_add(added))
        else {
            return false;
        };
        self.cells.resize_with(grown, Cell::default);
        true
    }

    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_empty()).count()
    }

    pub fn first_empty_cell(&self) -> Option<usize> {
        self.cells.iter().position(Cell::is_empty)
    }

    /// Grow by whole rows until at least `needed` cells are empty.
    pub fn ensure_capacity(&mut self, needed: usize) {
        let missing = needed.saturating_sub(self.count_empty());
        if missing > 0 {
            self.add_rows(missing.div_ceil(self.columns));
        }
    }

    /// Grow by whole rows until `index` is addressable.
    pub fn ensure_cell_index(&mut self, index: usize) -> bool {
        if index < self.cells.len() {
            return true;
        }
        match index.checked_add(1) {
            Some(needed) => self.add_rows((needed - self.cells.len()).div_ceil(self.columns)),
            None => false,
        }
    }

    /// Shift every entry toward the front, keeping relative order.
    pub fn pack(&mut self) {
        let entries: Vec<AppEntry> = self
            .cells
            .iter_mut()
            .filter_map(|cell| cell.entry.take())
            .collect();

        for (cell, entry) in self.cells.iter_mut().zip(entries) {
            cell.entry = Some(entry);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    tabs: Vec<Tab>,
    selected: Option<usize>,
    columns: usize,
    initial_rows: usize,
}

impl Registry {
    pub fn new(columns: usize, initial_rows: usize) -> Self {
        Self {
            tabs: Vec::new(),
            selected: None,
            columns: columns.max(1),
            initial_rows: initial_rows.max(1),
        }
    }

    /// A registry holding a single empty, selected "Default" tab.
    pub fn with_default_tab(columns: usize, initial_rows: usize) -> Self {
        let mut registry = Self::new(columns, initial_rows);
        let tab = registry.new_tab(DEFAULT_TAB_NAME);
        registry.push_tab(tab);
        registry.selected = Some(0);
        registry
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// An empty tab sized like every other tab in this registry.
    pub fn new_tab(&self, name: impl Into<String>) -> Tab {
        Tab::new(name, self.columns, self.initial_rows)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tab(&self, index: usize) -> Result<&Tab> {
        self.tabs.get(index).ok_or(LaunchpadError::UnknownTab(index))
    }

    pub fn tab_mut(&mut self, index: usize) -> Result<&mut Tab> {
        self.tabs
            .get_mut(index)
            .ok_or(LaunchpadError::UnknownTab(index))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select_tab(&mut self, index: usize) -> Result<()> {
        self.tab(index)?;
        self.selected = Some(index);
        Ok(())
    }

    /// Append without touching the selection.
    pub fn push_tab(&mut self, tab: Tab) -> usize {
        self.tabs.push(tab);
        self.tabs.len() - 1
    }

    /// Append a new empty tab and select it.
    pub fn add_tab(&mut self, name: &str) -> Result<usize> {
        let name = validated_name(name)?;
        let tab = self.new_tab(name);
        let index = self.push_tab(tab);
        self.selected = Some(index);
        Ok(index)
    }

    pub fn rename_tab(&mut self, index: usize, name: &str) -> Result<()> {
        let name = validated_name(name)?;
        self.tab_mut(index)?.name = name.to_string();
        Ok(())
    }

    /// Remove a tab and everything in it; the selection follows its neighbour.
    pub fn remove_tab(&mut self, index: usize) -> Result<Tab> {
        self.tab(index)?;
        let removed = self.tabs.remove(index);

        self.selected = match self.selected {
            _ if self.tabs.is_empty() => None,
            Some(selected) if selected > index => Some(selected - 1),
            Some(selected) if selected == index => Some(index.min(self.tabs.len() - 1)),
            other => other,
        };
        Ok(removed)
    }

    /// Move a tab to a new position and select it there. Out-of-range or
    /// identical positions are ignored.
    pub fn move_tab(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.tabs.len() || to >= self.tabs.len() {
            return false;
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.selected = Some(to);
        true
    }

    pub fn move_selected_up(&mut self) -> bool {
        match self.selected {
            Some(index) if index > 0 => self.move_tab(index, index - 1),
            _ => false,
        }
    }

    pub fn move_selected_down(&mut self) -> bool {
        match self.selected {
            Some(index) => self.move_tab(index, index + 1),
            None => false,
        }
    }

    /// Scan every tab for an entry whose bundle has this canonical identity.
    pub fn find_by_canonical_path(&self, identity: &str) -> Option<Location> {
        self.tabs.iter().enumerate().find_map(|(tab_index, tab)| {
            tab.entries()
                .find(|(_, entry)| resolver::canonical_identity(&entry.bundle_path) == identity)
                .map(|(cell_index, _)| Location {
                    tab_index,
                    cell_index,
                    tab_name: tab.name.clone(),
                })
        })
    }

    pub fn first_empty_cell(&self, tab: usize) -> Result<Option<CellRef>> {
        Ok(self
            .tab(tab)?
            .first_empty_cell()
            .map(|cell| CellRef::new(tab, cell)))
    }

    pub fn ensure_capacity(&mut self, tab: usize, needed: usize) -> Result<()> {
        self.tab_mut(tab)?.ensure_capacity(needed);
        Ok(())
    }

    pub fn entry(&self, at: CellRef) -> Option<&AppEntry> {
        self.tabs.get(at.tab)?.entry(at.cell)
    }

    pub fn entry_mut(&mut self, at: CellRef) -> Option<&mut AppEntry> {
        self.tabs
            .get_mut(at.tab)?
            .cells
            .get_mut(at.cell)?
            .entry
            .as_mut()
    }

    /// Put `entry` into an empty cell.
    pub fn place_entry(&mut self, at: CellRef, entry: AppEntry) -> Result<()> {
        let cell = self
            .tab_mut(at.tab)?
            .cells
            .get_mut(at.cell)
            .ok_or(LaunchpadError::InvalidCell {
                tab: at.tab,
                cell: at.cell,
            })?;

        if !cell.is_empty() {
            return Err(LaunchpadError::CellOccupied {
                tab: at.tab,
                cell: at.cell,
            });
        }
        cell.entry = Some(entry);
        Ok(())
    }

    /// Empty a cell, returning what was there.
    pub fn remove_entry(&mut self, at: CellRef) -> Option<AppEntry> {
        self.tabs
            .get_mut(at.tab)?
            .cells
            .get_mut(at.cell)?
            .entry
            .take()
    }

    pub fn pack(&mut self, tab: usize) -> Result<()> {
        self.tab_mut(tab)?.pack();
        Ok(())
    }

    /// Every occupied cell across all tabs.
    pub fn entries(&self) -> impl Iterator<Item = (CellRef, &AppEntry)> {
        self.tabs.iter().enumerate().flat_map(|(tab_index, tab)| {
            tab.entries()
                .map(move |(cell, entry)| (CellRef::new(tab_index, cell), entry))
        })
    }
}

fn validated_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        Err(LaunchpadError::InvalidTabName)
    } else {
        Ok(name)
    }
}
