use clap::{Parser, Subcommand};
use std::path::PathBuf;

use launchpad::apps;
use launchpad::config::Settings;
use launchpad::dragdrop::{DragDropController, DropPoint};
use launchpad::gesture::Point;
use launchpad::icons::cache::IconCache;
use launchpad::icons::thumbnail::ThumbnailRenderer;
use launchpad::icons::IconPipeline;
use launchpad::import::KnownLocations;
use launchpad::logs;
use launchpad::persistence;
use launchpad::registry::{CellRef, Registry};
use launchpad::transfer::Transfer;
use launchpad::{LaunchpadError, Result};

#[derive(Parser)]
#[command(name = "launchpad", about = "Tabbed grid launcher for application bundles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every tab and the applications in it
    List,
    /// Add one application bundle to the first free cell
    Add {
        path: PathBuf,
        #[arg(short, long)]
        tab: Option<usize>,
    },
    /// Import the applications at the top of a folder
    Import {
        dir: PathBuf,
        #[arg(short, long)]
        tab: Option<usize>,
    },
    /// Drop a file or bundle path onto a tab, optionally onto a specific cell
    Drop {
        path: PathBuf,
        #[arg(short, long)]
        tab: Option<usize>,
        #[arg(short, long)]
        cell: Option<usize>,
    },
    /// Move an application to another tab or cell
    Move {
        tab: usize,
        cell: usize,
        #[arg(long)]
        to_tab: usize,
        #[arg(long)]
        to_cell: Option<usize>,
    },
    /// Empty a cell
    Remove { tab: usize, cell: usize },
    /// Shift a tab's applications to the front
    Pack { tab: Option<usize> },
    /// Set or reset an application's icon
    Icon {
        tab: usize,
        cell: usize,
        /// Image or .icns file; omit to re-resolve the bundle's own icon
        image: Option<PathBuf>,
    },
    Launch { tab: usize, cell: usize },
    /// Show the bundle in Finder
    Reveal { tab: usize, cell: usize },
    Tab {
        #[command(subcommand)]
        action: TabAction,
    },
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    Logs {
        #[command(subcommand)]
        action: Option<logs::LogsAction>,
    },
}

#[derive(Subcommand)]
enum TabAction {
    Add { name: String },
    Rename { index: usize, name: String },
    Delete { index: usize },
    Move { from: usize, to: usize },
    Select { index: usize },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cached icon
    Clear,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    logs::init_logger()?;

    let command = match Cli::parse().command {
        Commands::Logs { action } => return Ok(logs::handle_logs_command(action)?),
        command => command,
    };

    if let Err(e) = run(command) {
        logs::log_error(&e.to_string());
        eprintln!("{}", error_message(&e));
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    let settings = Settings::load();
    let renderer = ThumbnailRenderer::new(&settings.thumbnailer, settings.thumbnail_timeout());
    let pipeline = IconPipeline::standard(renderer, apps::generic_app_icon());
    let mut icons = IconCache::init(settings.cache_dir(), pipeline)?
        .with_decode_floor(settings.cell_size);

    let state_file = settings.state_file();
    let registry = persistence::load(&state_file, &mut icons, &settings);
    let mut controller = DragDropController::new(registry, icons, settings.icon_render_size);

    if execute(&mut controller, command)? {
        persistence::save(&state_file, controller.registry())?;
        logs::log_info(&format!("Layout saved to {}", state_file.display()));
    }
    Ok(())
}

/// Run one command. Returns whether the layout changed.
fn execute(controller: &mut DragDropController, command: Commands) -> Result<bool> {
    match command {
        Commands::List => {
            print_registry(controller.registry());
            Ok(false)
        }
        Commands::Add { path, tab } => {
            let tab = tab_or_selected(controller.registry(), tab)?;
            let cell = controller.add_app(&path, tab)?;
            println!("Added {} at tab {} cell {}", path.display(), cell.tab, cell.cell);
            Ok(true)
        }
        Commands::Import { dir, tab } => {
            let tab = tab_or_selected(controller.registry(), tab)?;
            let report = controller.import_folder(&dir, tab, &KnownLocations::default())?;
            println!("Imported {} of {} applications", report.imported, report.found);
            if let Some(notice) = report.notice() {
                println!("{}", notice.message());
            }
            Ok(report.imported > 0)
        }
        Commands::Drop { path, tab, cell } => {
            let tab = tab_or_selected(controller.registry(), tab)?;
            let at = match cell {
                Some(cell) => DropPoint::on_cell(Point::default(), cell),
                None => DropPoint::on_tab(Point::default()),
            };
            let placed = controller.drop_transfer(
                &Transfer::from_files(vec![path]),
                at,
                &|_: Point| Some(tab),
            )?;
            println!("Placed at tab {} cell {}", placed.cell.tab, placed.cell.cell);
            Ok(true)
        }
        Commands::Move {
            tab,
            cell,
            to_tab,
            to_cell,
        } => {
            let from = CellRef::new(tab, cell);
            let transfer = Transfer::from_cell(controller.registry(), from)
                .ok_or(LaunchpadError::InvalidCell { tab, cell })?;
            let at = match to_cell {
                Some(cell) => DropPoint::on_cell(Point::default(), cell),
                None => DropPoint::on_tab(Point::default()),
            };
            let placed = controller.drop_transfer(&transfer, at, &|_: Point| Some(to_tab))?;
            println!("Moved to tab {} cell {}", placed.cell.tab, placed.cell.cell);
            Ok(true)
        }
        Commands::Remove { tab, cell } => match controller.remove(CellRef::new(tab, cell)) {
            Some(entry) => {
                println!("Removed {}", entry.display_name);
                Ok(true)
            }
            None => {
                println!("Cell {} on tab {} is already empty", cell, tab);
                Ok(false)
            }
        },
        Commands::Pack { tab } => {
            let tab = tab_or_selected(controller.registry(), tab)?;
            controller.pack(tab)?;
            Ok(true)
        }
        Commands::Icon { tab, cell, image } => {
            let at = CellRef::new(tab, cell);
            match image {
                Some(image) => {
                    controller.assign_custom_icon(at, &image)?;
                }
                None => controller.refresh_icon(at)?,
            }
            Ok(true)
        }
        Commands::Launch { tab, cell } => {
            controller.launch(CellRef::new(tab, cell))?;
            Ok(false)
        }
        Commands::Reveal { tab, cell } => {
            controller.reveal(CellRef::new(tab, cell))?;
            Ok(false)
        }
        Commands::Tab { action } => tab_command(controller.registry_mut(), action),
        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            let removed = controller.icons_mut().clear()?;
            println!("Removed {} cached icons", removed);
            Ok(false)
        }
        Commands::Logs { action } => {
            logs::handle_logs_command(action)?;
            Ok(false)
        }
    }
}

fn tab_command(registry: &mut Registry, action: TabAction) -> Result<bool> {
    match action {
        TabAction::Add { name } => {
            let index = registry.add_tab(&name)?;
            println!("Added tab {} \"{}\"", index, name.trim());
        }
        TabAction::Rename { index, name } => registry.rename_tab(index, &name)?,
        TabAction::Delete { index } => {
            let removed = registry.remove_tab(index)?;
            println!("Deleted tab \"{}\"", removed.name());
        }
        TabAction::Move { from, to } => {
            if !registry.move_tab(from, to) {
                println!("Nothing to move");
                return Ok(false);
            }
        }
        TabAction::Select { index } => registry.select_tab(index)?,
    }
    Ok(true)
}

/// Errors the user can act on are shown as-is; the rest point at the log.
fn error_message(e: &LaunchpadError) -> String {
    if e.is_user_visible() {
        e.to_string()
    } else {
        format!("launchpad: command failed ({}). Run `launchpad logs` for details.", e)
    }
}

fn tab_or_selected(registry: &Registry, tab: Option<usize>) -> Result<usize> {
    let index = tab.or(registry.selected()).unwrap_or(0);
    registry.tab(index)?;
    Ok(index)
}

fn print_registry(registry: &Registry) {
    for (index, tab) in registry.tabs().iter().enumerate() {
        let marker = if registry.selected() == Some(index) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} {} ({}x{}, {} free)",
            marker,
            index,
            tab.name(),
            tab.columns(),
            tab.rows(),
            tab.count_empty()
        );
        for (cell, entry) in tab.entries() {
            println!(
                "    {:>3}  {:<24} {}",
                cell,
                entry.display_name,
                entry.bundle_path.display()
            );
        }
    }
}
