/// Reverting the last sweep of a drop folder.
///
/// Moves recorded in the drop folder's history are replayed backwards: every
/// entry goes back to where it was in the drop folder, under its original
/// name.
use crate::history::{HistoryError, Operation, OperationLog};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What an undo restored, skipped and failed on.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored_files: usize,
    /// Entries whose restore failed, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Entries no longer at their sorted location.
    pub skipped_files: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    #[error("no previous sweep found to undo in {}", .0.display())]
    NothingToUndo(PathBuf),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Why a single operation could not be restored.
enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

pub struct UndoManager;

impl UndoManager {
    /// Undoes the last recorded sweep of `drop_folder`.
    ///
    /// * An entry that is no longer at its sorted location is skipped.
    /// * An entry whose original name is taken again in the drop folder is
    ///   restored after the newcomer is renamed to `<name>.bak.<timestamp>`.
    ///
    /// The history is deleted only when every entry was restored, so a partial
    /// undo can be retried.
    pub fn undo(drop_folder: &Path) -> Result<UndoReport, UndoError> {
        let log = OperationLog::load(drop_folder)?
            .ok_or_else(|| UndoError::NothingToUndo(drop_folder.to_path_buf()))?;

        let mut report = UndoReport::default();
        for operation in log.operations.iter().rev() {
            match Self::restore(operation) {
                Ok(()) => {
                    info!(
                        "{} restored to {}",
                        operation.new_path.display(),
                        operation.original_path.display()
                    );
                    report.restored_files += 1;
                }
                Err(RestoreFailure::Missing(path, reason)) => {
                    warn!("{}: {}", path.display(), reason);
                    report.skipped_files.push((path, reason));
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    warn!("{}: {}", path.display(), reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(drop_folder)
        {
            warn!("could not delete history file: {}", e);
        }

        Ok(report)
    }

    fn restore(operation: &Operation) -> Result<(), RestoreFailure> {
        if operation.new_path.symlink_metadata().is_err() {
            return Err(RestoreFailure::Missing(
                operation.new_path.clone(),
                "not found at its sorted location".to_string(),
            ));
        }

        if operation.original_path.symlink_metadata().is_ok() {
            let backup_path = Self::backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("could not back up conflicting entry: {}", e),
                )
            })?;
        }

        fs::rename(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreFailure::Failed(
                operation.new_path.clone(),
                format!("failed to restore: {}", e),
            )
        })
    }

    /// `file.txt` becomes `file.txt.bak.20251109-143052`.
    fn backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("entry");
        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_FILE_NAME;
    use tempfile::TempDir;

    fn record(drop: &Path, operations: Vec<Operation>) {
        let mut log = OperationLog::new(drop.to_path_buf());
        for op in operations {
            log.add_operation(op);
        }
        log.save(drop).expect("Failed to save history");
    }

    fn moved(drop: &Path, sorted_dir: &Path, from: &str, to: &str) -> Operation {
        let original_path = drop.join(from);
        let new_path = sorted_dir.join(to);
        fs::write(&new_path, from).unwrap();
        Operation {
            original_path,
            new_path,
            rule: "extension:txt".to_string(),
        }
    }

    #[test]
    fn test_undo_without_history() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            UndoManager::undo(temp_dir.path()),
            Err(UndoError::NothingToUndo(_))
        ));
    }

    #[test]
    fn test_undo_restores_original_names() {
        let temp_dir = TempDir::new().unwrap();
        let drop = temp_dir.path();
        let sorted = TempDir::new().unwrap();

        record(
            drop,
            vec![
                moved(drop, sorted.path(), "reports--q1.txt", "q1.txt"),
                moved(drop, sorted.path(), "notes.txt", "notes.txt"),
            ],
        );

        let report = UndoManager::undo(drop).unwrap();
        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert!(drop.join("reports--q1.txt").is_file());
        assert!(drop.join("notes.txt").is_file());
        assert!(!sorted.path().join("q1.txt").exists());
        assert!(!drop.join(HISTORY_FILE_NAME).exists());
    }

    #[test]
    fn test_undo_backs_up_conflicting_entry() {
        let temp_dir = TempDir::new().unwrap();
        let drop = temp_dir.path();
        let sorted = TempDir::new().unwrap();

        record(drop, vec![moved(drop, sorted.path(), "a.txt", "a.txt")]);
        fs::write(drop.join("a.txt"), "newcomer").unwrap();

        let report = UndoManager::undo(drop).unwrap();
        assert_eq!(report.restored_files, 1);
        assert_eq!(fs::read_to_string(drop.join("a.txt")).unwrap(), "a.txt");

        let backups = fs::read_dir(drop)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("a.txt.bak."))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_undo_skips_missing_entries_and_keeps_history() {
        let temp_dir = TempDir::new().unwrap();
        let drop = temp_dir.path();

        record(
            drop,
            vec![Operation {
                original_path: drop.join("gone.txt"),
                new_path: drop.join("nowhere").join("gone.txt"),
                rule: "extension:txt".to_string(),
            }],
        );

        let report = UndoManager::undo(drop).unwrap();
        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.total_processed(), 1);
        assert!(drop.join(HISTORY_FILE_NAME).exists());
    }
}
