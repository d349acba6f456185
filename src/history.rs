/// Record of the moves made by the last sweep of a drop folder.
///
/// The log is written as pretty JSON into the drop folder itself, next to
/// `.sortaconfig`, and is what `sorta undo` replays backwards.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the history file inside a drop folder.
pub const HISTORY_FILE_NAME: &str = ".sorta_history.json";

/// A single move performed by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Where the entry was in the drop folder.
    pub original_path: PathBuf,
    /// Where the sweep put it.
    pub new_path: PathBuf,
    /// The rule that decided the move, e.g. `prefix:reports`.
    pub rule: String,
}

/// All moves of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the sweep.
    pub timestamp: String,
    pub drop_folder: PathBuf,
    pub operations: Vec<Operation>,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to write history file: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read history file: {0}")]
    Read(#[source] std::io::Error),

    #[error("invalid history file format: {0}")]
    Format(String),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

impl OperationLog {
    pub fn new(drop_folder: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            drop_folder,
            operations: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn history_file_path(drop_folder: &Path) -> PathBuf {
        drop_folder.join(HISTORY_FILE_NAME)
    }

    /// Writes this log, replacing any previous one.
    pub fn save(&self, drop_folder: &Path) -> HistoryResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| HistoryError::Format(format!("JSON serialization failed: {}", e)))?;

        fs::write(Self::history_file_path(drop_folder), json).map_err(HistoryError::Write)
    }

    /// Loads the last log, or `None` if no sweep has been recorded.
    pub fn load(drop_folder: &Path) -> HistoryResult<Option<Self>> {
        let history_path = Self::history_file_path(drop_folder);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(HistoryError::Read)?;
        let log = serde_json::from_str(&json)
            .map_err(|e| HistoryError::Format(format!("JSON parse error: {}", e)))?;
        Ok(Some(log))
    }

    pub fn delete(drop_folder: &Path) -> HistoryResult<()> {
        let history_path = Self::history_file_path(drop_folder);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(HistoryError::Write)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_history_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(OperationLog::load(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_saved_log_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = OperationLog::new(temp_dir.path().to_path_buf());
        log.add_operation(Operation {
            original_path: temp_dir.path().join("reports--q1.pdf"),
            new_path: PathBuf::from("/srv/reports/q1.pdf"),
            rule: "prefix:reports".to_string(),
        });
        log.save(temp_dir.path()).unwrap();

        let loaded = OperationLog::load(temp_dir.path()).unwrap().unwrap();
        assert_eq!(loaded.timestamp, log.timestamp);
        assert_eq!(loaded.operations, log.operations);
    }

    #[test]
    fn test_corrupt_history_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(HISTORY_FILE_NAME), "{ not json").unwrap();

        assert!(matches!(
            OperationLog::load(temp_dir.path()),
            Err(HistoryError::Format(_))
        ));
    }

    #[test]
    fn test_delete_is_quiet_without_history() {
        let temp_dir = TempDir::new().unwrap();
        OperationLog::delete(temp_dir.path()).unwrap();
    }
}
