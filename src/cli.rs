//! Command implementations behind the `sorta` binary.
//!
//! Each command loads what it needs fresh from disk, does its work and maps
//! library errors to a readable message. Only a missing or broken drop folder,
//! bad settings or a failed write end a command with an error; per-entry
//! failures during a sweep are logged and the command still succeeds.

use crate::config::SweepSettings;
use crate::logging::TracingEvents;
use crate::output::OutputFormatter;
use crate::rule_store::{RuleKind, RuleStore};
use crate::sorter::Sorter;
use crate::undo::UndoManager;
use crate::watcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// A command to run against a drop folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortaCommand {
    /// Create the drop folder or reset its rules.
    Init,
    /// Sort the drop folder's current entries.
    Sort {
        /// Resolve only; move nothing.
        dry_run: bool,
        /// Keep sweeping whenever the drop folder changes.
        daemon: bool,
    },
    /// Add or replace a rule. `destination` is expanded and checked before
    /// it is stored.
    Add {
        kind: RuleKind,
        name: String,
        destination: String,
    },
    /// Remove a rule; removing a missing rule is not an error.
    Remove { kind: RuleKind, name: String },
    /// Show settings and rules.
    List,
    /// Revert the last sweep.
    Undo,
}

/// Runs `command` against the drop folder at `drop_folder` with default
/// sweep settings lookup.
///
/// # Examples
///
/// ```no_run
/// use sorta::cli::{run_cli, SortaCommand};
/// use std::path::Path;
///
/// match run_cli(SortaCommand::Init, Path::new("/home/user/sorta")) {
///     Ok(()) => println!("ready"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(command: SortaCommand, drop_folder: &Path) -> Result<(), String> {
    run_cli_with_config(command, drop_folder, None)
}

/// Runs `command`, reading sweep settings from `settings_path` when given.
pub fn run_cli_with_config(
    command: SortaCommand,
    drop_folder: &Path,
    settings_path: Option<&Path>,
) -> Result<(), String> {
    match command {
        SortaCommand::Init => init_drop_folder(drop_folder),
        SortaCommand::Sort { dry_run, daemon } => {
            sort_drop_folder(drop_folder, settings_path, dry_run, daemon)
        }
        SortaCommand::Add {
            kind,
            name,
            destination,
        } => add_rule(drop_folder, kind, &name, &destination),
        SortaCommand::Remove { kind, name } => remove_rule(drop_folder, kind, &name),
        SortaCommand::List => list_rules(drop_folder),
        SortaCommand::Undo => undo_sweep(drop_folder),
    }
}

fn init_drop_folder(drop_folder: &Path) -> Result<(), String> {
    let store = RuleStore::initialize(drop_folder).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!(
        "Initialized sorta drop folder in {}",
        store.drop_folder().display()
    ));
    Ok(())
}

fn sort_drop_folder(
    drop_folder: &Path,
    settings_path: Option<&Path>,
    dry_run: bool,
    daemon: bool,
) -> Result<(), String> {
    let store = RuleStore::load(drop_folder).map_err(|e| e.to_string())?;
    let filters = SweepSettings::load(settings_path)
        .and_then(SweepSettings::compile)
        .map_err(|e| format!("Error loading sweep settings: {}", e))?;

    let events = TracingEvents;
    let sorter = Sorter::new(&store, &events)
        .with_filters(&filters)
        .dry_run(dry_run);

    if daemon {
        let shutdown = install_shutdown_handler()?;
        let sweeps = watcher::watch(&sorter, &shutdown).map_err(|e| e.to_string())?;
        info!("daemon stopped after {} sweeps", sweeps);
        return Ok(());
    }

    let report = sorter.sweep().map_err(|e| e.to_string())?;
    if dry_run {
        OutputFormatter::plan(&report);
        OutputFormatter::dry_run_notice("No entries were moved.");
    } else {
        OutputFormatter::sweep_summary(&report);
        if !report.moved.is_empty() {
            OutputFormatter::info(&format!(
                "History saved. Use 'sorta undo --path {}' to revert this sweep.",
                drop_folder.display()
            ));
        }
    }
    Ok(())
}

fn add_rule(drop_folder: &Path, kind: RuleKind, name: &str, destination: &str) -> Result<(), String> {
    let mut store = RuleStore::load(drop_folder).map_err(|e| e.to_string())?;
    let destination = resolve_destination_dir(destination)?;

    store
        .set_rule(kind, name, &destination)
        .map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("{} rule '{}' → {}", kind, name, destination));
    Ok(())
}

fn remove_rule(drop_folder: &Path, kind: RuleKind, name: &str) -> Result<(), String> {
    let mut store = RuleStore::load(drop_folder).map_err(|e| e.to_string())?;
    let removed = store.remove_rule(kind, name).map_err(|e| e.to_string())?;

    if removed {
        OutputFormatter::success(&format!("Removed {} rule '{}'", kind, name));
    } else {
        OutputFormatter::warning(&format!("No {} rule named '{}'; nothing removed", kind, name));
    }
    Ok(())
}

fn list_rules(drop_folder: &Path) -> Result<(), String> {
    let store = RuleStore::load(drop_folder).map_err(|e| e.to_string())?;
    OutputFormatter::rules(&store);
    Ok(())
}

fn undo_sweep(drop_folder: &Path) -> Result<(), String> {
    RuleStore::load(drop_folder).map_err(|e| e.to_string())?;
    let report = UndoManager::undo(drop_folder).map_err(|e| e.to_string())?;
    OutputFormatter::undo_report(&report);
    Ok(())
}

/// Raises the returned flag on Ctrl+C or SIGTERM.
fn install_shutdown_handler() -> Result<Arc<AtomicBool>, String> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("interrupt received, finishing current sweep...");
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Could not install interrupt handler: {}", e))?;
    Ok(shutdown)
}

/// Replaces a leading `~` with the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

/// Expands `~`, makes the drop folder path absolute. The folder need not
/// exist yet.
pub fn resolve_drop_folder(path: &str) -> Result<PathBuf, String> {
    std::path::absolute(expand_home(path))
        .map_err(|e| format!("Invalid drop folder path '{}': {}", path, e))
}

/// Turns a rule destination argument into the absolute path stored in the
/// rule. The directory must already exist.
pub fn resolve_destination_dir(destination: &str) -> Result<String, String> {
    let expanded = expand_home(destination);
    let absolute = fs::canonicalize(&expanded)
        .map_err(|e| format!("Invalid destination '{}': {}", destination, e))?;

    if !absolute.is_dir() {
        return Err(format!(
            "Invalid destination '{}': not a directory",
            destination
        ));
    }

    absolute
        .into_os_string()
        .into_string()
        .map_err(|_| format!("Invalid destination '{}': path is not valid UTF-8", destination))
}
