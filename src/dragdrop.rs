//! Placement of applications into the grid: drops, single adds, folder
//! imports, custom icons and the cell-level housekeeping around them.

use std::path::{Path, PathBuf};

use crate::apps::{self, AppEntry};
use crate::error::{LaunchpadError, Result};
use crate::gesture::Point;
use crate::icons::cache::IconCache;
use crate::icons::IconHandle;
use crate::import::{self, KnownLocations};
use crate::logs;
use crate::registry::{CellRef, Registry};
use crate::resolver;
use crate::transfer::{DropSource, Transfer};

/// Maps a drop position to the tab under it.
pub trait TabLocator {
    fn tab_at(&self, point: Point) -> Option<usize>;
}

impl<F> TabLocator for F
where
    F: Fn(Point) -> Option<usize>,
{
    fn tab_at(&self, point: Point) -> Option<usize> {
        self(point)
    }
}

/// Where something was dropped. `cell` is set when the drop landed on a
/// specific grid cell rather than on the tab as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropPoint {
    pub position: Point,
    pub cell: Option<usize>,
}

impl DropPoint {
    pub fn on_tab(position: Point) -> Self {
        Self {
            position,
            cell: None,
        }
    }

    pub fn on_cell(position: Point, cell: usize) -> Self {
        Self {
            position,
            cell: Some(cell),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub cell: CellRef,
    pub moved_from: Option<CellRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportNotice {
    NothingFound,
    SomeSkipped,
    NothingImported,
}

impl ImportNotice {
    pub fn message(&self) -> &'static str {
        match self {
            ImportNotice::NothingFound => "No applications were found in the selected folder.",
            ImportNotice::SomeSkipped => {
                "One or more apps were not imported as they already exist in LaunchPad."
            }
            ImportNotice::NothingImported => "No applications were imported.",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub found: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
}

impl ImportReport {
    pub fn notice(&self) -> Option<ImportNotice> {
        if self.found == 0 {
            Some(ImportNotice::NothingFound)
        } else if self.skipped_duplicates > 0 {
            Some(ImportNotice::SomeSkipped)
        } else if self.imported == 0 {
            Some(ImportNotice::NothingImported)
        } else {
            None
        }
    }
}

pub struct DragDropController {
    registry: Registry,
    icons: IconCache,
    icon_size: u32,
}

impl DragDropController {
    pub fn new(registry: Registry, icons: IconCache, icon_size: u32) -> Self {
        Self {
            registry,
            icons,
            icon_size,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn icons_mut(&mut self) -> &mut IconCache {
        &mut self.icons
    }

    /// Place whatever `transfer` carries into the tab under `at`.
    ///
    /// A drop of an application that already lives elsewhere is refused, except
    /// when it is the very entry being dragged, which makes this a move.
    pub fn drop_transfer(
        &mut self,
        transfer: &Transfer,
        at: DropPoint,
        locator: &impl TabLocator,
    ) -> Result<Placement> {
        let source = transfer.source().ok_or(LaunchpadError::EmptyTransfer)?;
        let bundle = resolver::resolve_bundle_root(source.path())
            .ok_or_else(|| LaunchpadError::Resolution(source.path().to_path_buf()))?;

        let tab = locator
            .tab_at(at.position)
            .filter(|&tab| tab < self.registry.tab_count())
            .ok_or(LaunchpadError::NoDropTarget)?;

        let explicit = at
            .cell
            .map(|cell| self.check_drop_cell(CellRef::new(tab, cell)))
            .transpose()?;

        let identity = resolver::canonical_identity(&bundle);
        let moving_from = self.moving_source(&source, &identity);
        if moving_from.is_none() {
            self.reject_duplicate(&bundle, &identity)?;
        }

        let target = match explicit {
            Some(cell) => cell,
            None => self.claim_empty_cell(tab)?,
        };

        let entry = match moving_from.and_then(|from| self.registry.entry(from).cloned()) {
            Some(entry) => entry,
            None => self.create_entry(&bundle)?,
        };
        self.registry.place_entry(target, entry)?;

        if let Some(from) = moving_from {
            self.registry.remove_entry(from);
        }

        logs::log_info(&format!(
            "Placed {} at tab {} cell {}",
            bundle.display(),
            target.tab,
            target.cell
        ));
        Ok(Placement {
            cell: target,
            moved_from: moving_from,
        })
    }

    /// Add one bundle to the first free cell of `tab`.
    pub fn add_app(&mut self, path: &Path, tab: usize) -> Result<CellRef> {
        if !resolver::is_bundle_name(path) {
            return Err(LaunchpadError::Resolution(path.to_path_buf()));
        }
        let bundle = resolver::resolve_bundle_root(path)
            .ok_or_else(|| LaunchpadError::Resolution(path.to_path_buf()))?;
        self.registry.tab(tab)?;

        self.reject_duplicate(&bundle, &resolver::canonical_identity(&bundle))?;

        let target = self.claim_empty_cell(tab)?;
        let entry = self.create_entry(&bundle)?;
        self.registry.place_entry(target, entry)?;
        Ok(target)
    }

    /// Import every user-facing bundle at the top of `dir` into `tab`.
    pub fn import_folder(
        &mut self,
        dir: &Path,
        tab: usize,
        locations: &KnownLocations,
    ) -> Result<ImportReport> {
        self.registry.tab(tab)?;

        let found = import::discover_bundles(dir, locations);
        let mut report = ImportReport {
            found: found.len(),
            ..Default::default()
        };

        let mut queue: Vec<PathBuf> = Vec::new();
        for bundle in found {
            if self
                .registry
                .find_by_canonical_path(&resolver::canonical_identity(&bundle))
                .is_some()
            {
                report.skipped_duplicates += 1;
                continue;
            }
            queue.push(bundle);
        }

        self.registry.ensure_capacity(tab, queue.len())?;
        for bundle in queue {
            let target = self.claim_empty_cell(tab)?;
            match AppEntry::create(&bundle, &mut self.icons, self.icon_size) {
                Some(entry) => {
                    self.registry.place_entry(target, entry)?;
                    report.imported += 1;
                }
                None => logs::log_warn(&format!("Skipped vanished bundle {}", bundle.display())),
            }
        }

        logs::log_info(&format!(
            "Imported {} of {} bundles from {} ({} already present)",
            report.imported,
            report.found,
            dir.display(),
            report.skipped_duplicates
        ));
        Ok(report)
    }

    /// Replace the icon of the entry at `cell` with a user-chosen image.
    pub fn assign_custom_icon(&mut self, cell: CellRef, image: &Path) -> Result<IconHandle> {
        let bundle = self.occupied(cell)?.bundle_path.clone();

        let (icon, stored) = self
            .icons
            .assign_custom_icon(&bundle, image, self.icon_size)
            .inspect_err(|e| logs::log_error(&format!("Custom icon failed: {}", e)))?;

        if let Some(entry) = self.registry.entry_mut(cell) {
            entry.icon = icon.clone();
            entry.custom_icon_path = Some(stored);
        }
        Ok(icon)
    }

    /// Drop any cached or custom icon for the entry at `cell` and resolve it again.
    pub fn refresh_icon(&mut self, cell: CellRef) -> Result<()> {
        let bundle = self.occupied(cell)?.bundle_path.clone();
        self.icons.evict(&bundle);
        let icon = self.icons.get_or_resolve(&bundle, self.icon_size);

        if let Some(entry) = self.registry.entry_mut(cell) {
            entry.icon = icon;
            entry.custom_icon_path = None;
        }
        Ok(())
    }

    pub fn remove(&mut self, cell: CellRef) -> Option<AppEntry> {
        self.registry.remove_entry(cell)
    }

    pub fn pack(&mut self, tab: usize) -> Result<()> {
        self.registry.pack(tab)
    }

    pub fn launch(&self, cell: CellRef) -> Result<()> {
        apps::launch(self.occupied(cell)?)
    }

    pub fn reveal(&self, cell: CellRef) -> Result<()> {
        apps::reveal(self.occupied(cell)?)
    }

    fn occupied(&self, cell: CellRef) -> Result<&AppEntry> {
        self.registry
            .entry(cell)
            .ok_or(LaunchpadError::InvalidCell {
                tab: cell.tab,
                cell: cell.cell,
            })
    }

    /// An explicit drop cell must exist and be empty.
    fn check_drop_cell(&self, at: CellRef) -> Result<CellRef> {
        let tab = self.registry.tab(at.tab)?;
        match tab.cells().get(at.cell) {
            None => Err(LaunchpadError::InvalidCell {
                tab: at.tab,
                cell: at.cell,
            }),
            Some(cell) if !cell.is_empty() => Err(LaunchpadError::CellOccupied {
                tab: at.tab,
                cell: at.cell,
            }),
            Some(_) => Ok(at),
        }
    }

    /// The source cell of an internal drag, if it still holds this bundle.
    fn moving_source(&self, source: &DropSource, identity: &str) -> Option<CellRef> {
        let from = source.source_cell()?;
        let entry = self.registry.entry(from)?;
        (resolver::canonical_identity(&entry.bundle_path) == identity).then_some(from)
    }

    fn reject_duplicate(&self, bundle: &Path, identity: &str) -> Result<()> {
        let Some(found) = self.registry.find_by_canonical_path(identity) else {
            return Ok(());
        };

        let err = LaunchpadError::Duplicate {
            name: bundle
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tab: found.tab_name,
            tab_index: found.tab_index,
            cell: found.cell_index,
        };
        logs::log_info(&err.to_string());
        Err(err)
    }

    /// First empty cell of `tab`, growing it by a row when it is full.
    fn claim_empty_cell(&mut self, tab: usize) -> Result<CellRef> {
        if let Some(cell) = self.registry.first_empty_cell(tab)? {
            return Ok(cell);
        }
        self.registry.tab_mut(tab)?.add_rows(1);
        self.registry.first_empty_cell(tab)?.ok_or_else(|| {
            LaunchpadError::CapacityExhausted(
                self.registry
                    .tab(tab)
                    .map(|t| t.name().to_string())
                    .unwrap_or_default(),
            )
        })
    }

    fn create_entry(&mut self, bundle: &Path) -> Result<AppEntry> {
        AppEntry::create(bundle, &mut self.icons, self.icon_size)
            .ok_or_else(|| LaunchpadError::Resolution(bundle.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconPipeline;
    use crate::testutil::{app_plist, write_bundle, write_png};
    use std::fs;
    use tempfile::TempDir;

    fn controller(dir: &Path, columns: usize, rows: usize) -> DragDropController {
        let icons = IconCache::init(dir.join("icons"), IconPipeline::new(vec![])).unwrap();
        DragDropController::new(Registry::with_default_tab(columns, rows), icons, 32)
    }

    fn tab_zero(_: Point) -> Option<usize> {
        Some(0)
    }

    fn names(ctl: &DragDropController, tab: usize) -> Vec<Option<String>> {
        ctl.registry()
            .tab(tab)
            .unwrap()
            .cells()
            .iter()
            .map(|c| c.entry().map(|e| e.display_name.clone()))
            .collect()
    }

    #[test]
    fn test_drop_file_places_in_first_empty_cell() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 3, 1);

        let inner = bundle.join("Contents/Info.plist");
        let placed = ctl
            .drop_transfer(
                &Transfer::from_files(vec![inner]),
                DropPoint::on_tab(Point::default()),
                &tab_zero,
            )
            .unwrap();
        assert_eq!(placed.cell, CellRef::new(0, 0));
        assert_eq!(placed.moved_from, None);
        assert_eq!(
            ctl.registry().entry(placed.cell).unwrap().bundle_path,
            fs::canonicalize(&bundle).unwrap()
        );
    }

    #[test]
    fn test_duplicate_drop_is_rejected_without_changes() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Safari.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);
        ctl.registry_mut().rename_tab(0, "Internet").unwrap();
        ctl.registry_mut().add_tab("Work").unwrap();

        // Put it at cell 3 of "Internet".
        let first = ctl
            .drop_transfer(
                &Transfer::from_files(vec![bundle.clone()]),
                DropPoint::on_cell(Point::default(), 3),
                &tab_zero,
            )
            .unwrap();
        assert_eq!(first.cell, CellRef::new(0, 3));

        let before = (names(&ctl, 0), names(&ctl, 1));
        let err = ctl
            .drop_transfer(
                &Transfer::from_files(vec![bundle]),
                DropPoint::on_tab(Point::default()),
                &|_: Point| Some(1),
            )
            .unwrap_err();

        match &err {
            LaunchpadError::Duplicate {
                name,
                tab,
                tab_index,
                cell,
            } => {
                assert_eq!(name, "Safari.app");
                assert_eq!(tab, "Internet");
                assert_eq!(*tab_index, 0);
                assert_eq!(*cell, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Application Safari.app already exists in the \"Internet\" category (cell 3)."
        );
        assert_eq!((names(&ctl, 0), names(&ctl, 1)), before);
    }

    #[test]
    fn test_internal_drag_moves_entry() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);
        ctl.registry_mut().add_tab("Other").unwrap();

        let from = ctl.add_app(&bundle, 0).unwrap();

        let transfer = Transfer::from_cell(ctl.registry(), from).unwrap();
        let placed = ctl
            .drop_transfer(&transfer, DropPoint::on_cell(Point::default(), 5), &|_: Point| Some(1))
            .unwrap();

        assert_eq!(placed.cell, CellRef::new(1, 5));
        assert_eq!(placed.moved_from, Some(from));
        assert!(ctl.registry().entry(from).is_none());
        assert_eq!(ctl.registry().entries().count(), 1);
    }

    #[test]
    fn test_internal_reorder_within_tab() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);
        ctl.registry_mut().rename_tab(0, "Work").unwrap();

        let from = ctl
            .drop_transfer(
                &Transfer::from_files(vec![bundle]),
                DropPoint::on_cell(Point::default(), 3),
                &tab_zero,
            )
            .unwrap()
            .cell;
        assert_eq!(from, CellRef::new(0, 3));

        let transfer = Transfer::from_cell(ctl.registry(), from).unwrap();
        let placed = ctl
            .drop_transfer(&transfer, DropPoint::on_cell(Point::default(), 5), &tab_zero)
            .unwrap();

        assert_eq!(placed.cell, CellRef::new(0, 5));
        assert_eq!(placed.moved_from, Some(from));
        assert!(ctl.registry().entry(from).is_none());
        assert_eq!(ctl.registry().entry(placed.cell).unwrap().display_name, "Foo");
        assert_eq!(ctl.registry().entries().count(), 1);
    }

    #[test]
    fn test_stale_internal_payload_is_not_a_move() {
        let dir = TempDir::new().unwrap();
        let foo = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let bar = write_bundle(dir.path(), "Bar.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);

        let from = ctl.add_app(&foo, 0).unwrap();
        let transfer = Transfer::from_cell(ctl.registry(), from).unwrap();

        // The source cell now holds something else.
        ctl.remove(from);
        ctl.add_app(&bar, 0).unwrap();

        let placed = ctl
            .drop_transfer(&transfer, DropPoint::on_tab(Point::default()), &tab_zero)
            .unwrap();
        assert_eq!(placed.moved_from, None);
        assert_eq!(ctl.registry().entries().count(), 2);
    }

    #[test]
    fn test_drop_on_occupied_cell_is_refused() {
        let dir = TempDir::new().unwrap();
        let foo = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let bar = write_bundle(dir.path(), "Bar.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);
        ctl.add_app(&foo, 0).unwrap();

        let err = ctl
            .drop_transfer(
                &Transfer::from_files(vec![bar]),
                DropPoint::on_cell(Point::default(), 0),
                &tab_zero,
            )
            .unwrap_err();
        assert!(matches!(err, LaunchpadError::CellOccupied { tab: 0, cell: 0 }));
    }

    #[test]
    fn test_drop_needs_a_tab_and_a_bundle() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let mut ctl = controller(dir.path(), 7, 1);

        let nowhere = |_: Point| -> Option<usize> { None };
        assert!(matches!(
            ctl.drop_transfer(
                &Transfer::from_files(vec![bundle]),
                DropPoint::on_tab(Point::default()),
                &nowhere
            ),
            Err(LaunchpadError::NoDropTarget)
        ));

        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        assert!(matches!(
            ctl.drop_transfer(
                &Transfer::from_files(vec![dir.path().join("notes.txt")]),
                DropPoint::on_tab(Point::default()),
                &tab_zero
            ),
            Err(LaunchpadError::Resolution(_))
        ));
        assert!(matches!(
            ctl.drop_transfer(&Transfer::default(), DropPoint::on_tab(Point::default()), &tab_zero),
            Err(LaunchpadError::EmptyTransfer)
        ));
    }

    #[test]
    fn test_full_tab_grows_by_one_row() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(dir.path(), 2, 1);
        for name in ["A.app", "B.app", "C.app"] {
            let bundle = write_bundle(dir.path(), name, &app_plist(""));
            ctl.add_app(&bundle, 0).unwrap();
        }

        let tab = ctl.registry().tab(0).unwrap();
        assert_eq!(tab.len(), 4);
        assert_eq!(tab.count_empty(), 1);
    }

    #[test]
    fn test_add_app_requires_bundle_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Folder")).unwrap();
        let mut ctl = controller(dir.path(), 7, 1);
        assert!(matches!(
            ctl.add_app(&dir.path().join("Folder"), 0),
            Err(LaunchpadError::Resolution(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_import_skips_helpers_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let installed = dir.path().join("installed");
        fs::create_dir_all(&installed).unwrap();
        let real = write_bundle(&installed, "MyApp.app", &app_plist(""));

        let mut ctl = controller(dir.path(), 7, 1);
        ctl.add_app(&real, 0).unwrap();

        let chosen = dir.path().join("chosen");
        fs::create_dir_all(&chosen).unwrap();
        std::os::unix::fs::symlink(&real, chosen.join("MyApp.app")).unwrap();
        write_bundle(&chosen, "MyApp Updater.app", &app_plist(""));

        let locations = KnownLocations {
            applications: dir.path().join("Applications"),
            system_applications: dir.path().join("System/Applications"),
        };
        let report = ctl.import_folder(&chosen, 0, &locations).unwrap();
        assert_eq!(report.found, 1);
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(report.notice(), Some(ImportNotice::SomeSkipped));
        assert_eq!(ctl.registry().entries().count(), 1);
    }

    #[test]
    fn test_import_fills_and_grows() {
        let dir = TempDir::new().unwrap();
        let chosen = dir.path().join("chosen");
        fs::create_dir_all(&chosen).unwrap();
        for name in ["A.app", "B.app", "C.app", "D.app", "Foo Uninstall.app"] {
            write_bundle(&chosen, name, &app_plist(""));
        }

        let mut ctl = controller(dir.path(), 3, 1);
        let report = ctl
            .import_folder(&chosen, 0, &KnownLocations::default())
            .unwrap();
        // Discovery leaves the uninstaller out.
        assert_eq!(report.found, 4);
        assert_eq!(report.imported, 4);
        assert_eq!(report.notice(), None);

        let tab = ctl.registry().tab(0).unwrap();
        assert_eq!(tab.len(), 6);
        assert_eq!(
            names(&ctl, 0),
            vec![
                Some("A".to_string()),
                Some("B".to_string()),
                Some("C".to_string()),
                Some("D".to_string()),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_import_notices() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        let mut ctl = controller(dir.path(), 3, 1);
        let report = ctl
            .import_folder(&empty, 0, &KnownLocations::default())
            .unwrap();
        assert_eq!(report.notice(), Some(ImportNotice::NothingFound));

        let nothing = ImportReport {
            found: 2,
            ..Default::default()
        };
        assert_eq!(nothing.notice(), Some(ImportNotice::NothingImported));
    }

    #[test]
    fn test_custom_icon_then_refresh() {
        let dir = TempDir::new().unwrap();
        let bundle = write_bundle(dir.path(), "Foo.app", &app_plist(""));
        let image = dir.path().join("pic.png");
        write_png(&image, 64, 64, [1, 2, 3, 255]);

        let mut ctl = controller(dir.path(), 7, 1);
        let cell = ctl.add_app(&bundle, 0).unwrap();

        let icon = ctl.assign_custom_icon(cell, &image).unwrap();
        let entry = ctl.registry().entry(cell).unwrap();
        assert_eq!(entry.icon.get_pixel(16, 16).0, [1, 2, 3, 255]);
        assert!(std::sync::Arc::ptr_eq(&entry.icon, &icon));
        assert!(entry.custom_icon_path.as_ref().unwrap().is_file());

        ctl.refresh_icon(cell).unwrap();
        let entry = ctl.registry().entry(cell).unwrap();
        assert!(entry.custom_icon_path.is_none());
        assert_ne!(entry.icon.get_pixel(16, 16).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_custom_icon_on_empty_cell() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(dir.path(), 7, 1);
        assert!(matches!(
            ctl.assign_custom_icon(CellRef::new(0, 0), Path::new("/tmp/x.png")),
            Err(LaunchpadError::InvalidCell { .. })
        ));
    }
}
