/// Sweeping a drop folder: resolve every entry and move it into place.
///
/// A sweep is best effort. An entry without a matching rule, or one that
/// cannot be moved, is reported and skipped; the remaining entries are still
/// processed. Only failing to list the drop folder ends a sweep early.
///
/// Destination directories are never created. A rule pointing at a missing
/// directory makes its entries fail until the directory exists.
use crate::config::SweepFilters;
use crate::history::{HISTORY_FILE_NAME, Operation, OperationLog};
use crate::logging::SortEvents;
use crate::resolver::resolve;
use crate::rule_store::{CONFIG_FILE_NAME, RuleStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Errors that can occur while sweeping.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// The drop folder could not be listed. Fatal to the sweep.
    #[error("failed to read drop folder {}: {source}", .path.display())]
    ReadDropFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("entry name is not valid UTF-8: {name}")]
    NonUtf8Name { name: String },

    #[error("destination directory {} does not exist", .directory.display())]
    DestinationDirMissing { directory: PathBuf },

    #[error("destination {} already exists", .destination.display())]
    DestinationExists { destination: PathBuf },

    #[error("failed to move {} to {}: {source}", .from.display(), .destination.display())]
    Move {
        from: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type SortResult<T> = Result<T, SortError>;

/// What a sweep did with each entry.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Moves that happened.
    pub moved: Vec<Operation>,
    /// Dry run only: moves that would have happened.
    pub planned: Vec<(String, PathBuf)>,
    /// Entries no rule applies to.
    pub unmatched: Vec<String>,
    /// Entries excluded by the sweep filters.
    pub filtered: Vec<String>,
    /// Entries a rule applied to but that could not be moved, with the reason.
    pub failed: Vec<(String, String)>,
}

impl SweepReport {
    pub fn total_processed(&self) -> usize {
        self.moved.len()
            + self.planned.len()
            + self.unmatched.len()
            + self.filtered.len()
            + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Runs sweeps over the drop folder of a [`RuleStore`].
pub struct Sorter<'a> {
    store: &'a RuleStore,
    events: &'a dyn SortEvents,
    filters: Option<&'a SweepFilters>,
    dry_run: bool,
}

impl<'a> Sorter<'a> {
    pub fn new(store: &'a RuleStore, events: &'a dyn SortEvents) -> Self {
        Self {
            store,
            events,
            filters: None,
            dry_run: false,
        }
    }

    pub fn with_filters(mut self, filters: &'a SweepFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// In dry-run mode entries are resolved but nothing is moved and no
    /// history is written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &RuleStore {
        self.store
    }

    /// Processes every entry currently in the drop folder, in name order.
    ///
    /// When at least one entry was moved the moves are saved as the drop
    /// folder's history, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns `SortError::ReadDropFolder` if the drop folder cannot be
    /// listed. Per-entry failures are reported through the event sink and
    /// collected in the returned [`SweepReport`].
    pub fn sweep(&self) -> SortResult<SweepReport> {
        let drop_folder = self.store.drop_folder();
        let mut report = SweepReport::default();
        let mut log = OperationLog::new(drop_folder.to_path_buf());

        for name in self.list_entries(&mut report)? {
            if name == CONFIG_FILE_NAME || name == HISTORY_FILE_NAME {
                continue;
            }

            if let Some(filters) = self.filters
                && !filters.should_sweep(&name)
            {
                self.events.filtered(&name);
                report.filtered.push(name);
                continue;
            }

            let resolution = match resolve(&name, self.store) {
                Ok(resolution) => resolution,
                Err(e) => {
                    self.events.unmatched(&e);
                    report.unmatched.push(name);
                    continue;
                }
            };

            if self.dry_run {
                self.events
                    .planned(&name, &resolution.destination, &resolution.rule);
                report.planned.push((name, resolution.destination));
                continue;
            }

            let source = drop_folder.join(&name);
            match move_entry(&source, &resolution.destination) {
                Ok(()) => {
                    self.events
                        .moved(&name, &resolution.destination, &resolution.rule);
                    let operation = Operation {
                        original_path: source,
                        new_path: resolution.destination,
                        rule: format!("{}:{}", resolution.rule.kind, resolution.rule.key),
                    };
                    log.add_operation(operation.clone());
                    report.moved.push(operation);
                }
                Err(e) => {
                    self.events.failed(&name, &e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        if !log.is_empty()
            && let Err(e) = log.save(drop_folder)
        {
            warn!("could not save sweep history: {}", e);
        }

        Ok(report)
    }

    /// Entry names, sorted. Names that aren't UTF-8 are reported as failures.
    fn list_entries(&self, report: &mut SweepReport) -> SortResult<Vec<String>> {
        let drop_folder = self.store.drop_folder();
        let read_error = |e| SortError::ReadDropFolder {
            path: drop_folder.to_path_buf(),
            source: e,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(drop_folder).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    let name = raw.to_string_lossy().into_owned();
                    let error = SortError::NonUtf8Name { name: name.clone() };
                    self.events.failed(&name, &error);
                    report.failed.push((name, error.to_string()));
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Moves `from` to `destination` without creating directories or replacing
/// anything.
///
/// Falls back to copy-and-delete for regular files when `rename` cannot cross
/// filesystems.
pub fn move_entry(from: &Path, destination: &Path) -> SortResult<()> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        return Err(SortError::DestinationDirMissing {
            directory: parent.to_path_buf(),
        });
    }

    if destination.symlink_metadata().is_ok() {
        return Err(SortError::DestinationExists {
            destination: destination.to_path_buf(),
        });
    }

    let move_error = |e| SortError::Move {
        from: from.to_path_buf(),
        destination: destination.to_path_buf(),
        source: e,
    };

    match fs::rename(from, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices && from.is_file() => {
            let copied = fs::copy(from, destination);
            settle_copy(from, destination, copied).map_err(move_error)
        }
        Err(e) => Err(move_error(e)),
    }
}

/// Completes a copy-based move. On any failure the copy at `destination` is
/// discarded so the entry stays only in the drop folder.
fn settle_copy(from: &Path, destination: &Path, copied: io::Result<u64>) -> io::Result<()> {
    let result = copied.and_then(|_| fs::remove_file(from));
    if result.is_err()
        && destination.symlink_metadata().is_ok()
        && let Err(e) = fs::remove_file(destination)
    {
        warn!("could not discard copy {}: {}", destination.display(), e);
    }
    result
}
