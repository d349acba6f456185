//! The persisted rule set of a drop folder.
//!
//! A drop folder is initialized by writing a `.sortaconfig` document into it.
//! That document holds three namespaces:
//! - `core`: the prefix delimiter and the daemon polling interval
//! - `prefix`: prefix name to destination directory
//! - `extension`: extension (without the leading dot) to destination directory
//!
//! A [`RuleStore`] is loaded fresh for every command and written back in full
//! after every mutation. There is no locking: two processes mutating the same
//! drop folder at once can lose updates.

use crate::ini::{self, IniDocument, Section};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Name of the rule document inside a drop folder.
pub const CONFIG_FILE_NAME: &str = ".sortaconfig";

/// Delimiter written by [`RuleStore::initialize`].
pub const DEFAULT_DELIMITER: &str = "--";

/// Polling interval, in seconds, written by [`RuleStore::initialize`].
pub const DEFAULT_POLLING_SECS: f64 = 60.0;

/// Shortest polling interval a drop folder may configure.
pub const MIN_POLLING: Duration = Duration::from_millis(1);

const CORE_SECTION: &str = "core";
const PREFIX_SECTION: &str = "prefix";
const EXTENSION_SECTION: &str = "extension";

/// The two rule namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Prefix,
    Extension,
}

impl RuleKind {
    fn section(self) -> &'static str {
        match self {
            RuleKind::Prefix => PREFIX_SECTION,
            RuleKind::Extension => EXTENSION_SECTION,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Errors raised while loading or writing a rule store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The drop folder or its `.sortaconfig` does not exist.
    #[error("{} is not an initialized drop folder (run `sorta init` first)", .path.display())]
    NotInitialized { path: PathBuf },

    /// The document exists but cannot be used.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    /// A rule name or destination that could not be written back faithfully.
    #[error("invalid rule name '{name}': {reason}")]
    InvalidRuleName { name: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for rule store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A lookup miss in one of the rule namespaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {kind} rule named '{name}'")]
pub struct RuleNotFound {
    pub kind: RuleKind,
    pub name: String,
}

/// Scalar settings from the `core` namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// Separator between a prefix and the rest of a file name.
    pub delimiter: String,
    /// Seconds between two modification-time checks in daemon mode.
    pub polling: f64,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            polling: DEFAULT_POLLING_SECS,
        }
    }
}

/// In-memory view of a drop folder's `.sortaconfig`.
#[derive(Debug, Clone)]
pub struct RuleStore {
    drop_folder: PathBuf,
    config_path: PathBuf,
    core: CoreSettings,
    prefix: BTreeMap<String, String>,
    extension: BTreeMap<String, String>,
}

impl RuleStore {
    /// Loads the rule store of the drop folder at `drop_folder`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInitialized` if the folder or its config
    /// document does not exist, `StoreError::Invalid` if the document is
    /// malformed and `StoreError::Io` if it cannot be read.
    pub fn load(drop_folder: &Path) -> StoreResult<Self> {
        let config_path = drop_folder.join(CONFIG_FILE_NAME);
        if !drop_folder.is_dir() || !config_path.is_file() {
            return Err(StoreError::NotInitialized {
                path: drop_folder.to_path_buf(),
            });
        }

        let text = fs::read_to_string(&config_path).map_err(|e| StoreError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let invalid = |reason: String| StoreError::Invalid {
            path: config_path.clone(),
            reason,
        };

        let mut doc = IniDocument::parse(&text).map_err(|e| invalid(e.to_string()))?;
        let core = doc
            .take_section(CORE_SECTION)
            .ok_or_else(|| invalid(format!("missing [{}] section", CORE_SECTION)))?;
        let prefix = doc
            .take_section(PREFIX_SECTION)
            .ok_or_else(|| invalid(format!("missing [{}] section", PREFIX_SECTION)))?;
        let extension = doc
            .take_section(EXTENSION_SECTION)
            .ok_or_else(|| invalid(format!("missing [{}] section", EXTENSION_SECTION)))?;

        let core = parse_core(&core).map_err(invalid)?;

        debug!(
            path = %config_path.display(),
            prefix_rules = prefix.len(),
            extension_rules = extension.len(),
            "loaded rule store"
        );

        Ok(Self {
            drop_folder: drop_folder.to_path_buf(),
            config_path,
            core,
            prefix,
            extension,
        })
    }

    /// Creates the drop folder if needed and writes a fresh `.sortaconfig`.
    ///
    /// An existing document is reset to the defaults: all rules are dropped.
    pub fn initialize(drop_folder: &Path) -> StoreResult<Self> {
        fs::create_dir_all(drop_folder).map_err(|e| StoreError::Io {
            path: drop_folder.to_path_buf(),
            source: e,
        })?;

        let store = Self {
            drop_folder: drop_folder.to_path_buf(),
            config_path: drop_folder.join(CONFIG_FILE_NAME),
            core: CoreSettings::default(),
            prefix: BTreeMap::new(),
            extension: BTreeMap::new(),
        };
        store.save()?;
        Ok(store)
    }

    pub fn drop_folder(&self) -> &Path {
        &self.drop_folder
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn core(&self) -> &CoreSettings {
        &self.core
    }

    pub fn delimiter(&self) -> &str {
        &self.core.delimiter
    }

    pub fn polling_interval_secs(&self) -> f64 {
        self.core.polling
    }

    /// The polling interval as a `Duration`. Load rejects non-positive values;
    /// values too large to represent saturate.
    pub fn polling_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.core.polling).unwrap_or(Duration::MAX)
    }

    pub fn set_prefix_rule(&mut self, name: &str, destination: &str) -> StoreResult<()> {
        self.set_rule(RuleKind::Prefix, name, destination)
    }

    pub fn set_extension_rule(&mut self, name: &str, destination: &str) -> StoreResult<()> {
        self.set_rule(RuleKind::Extension, name, destination)
    }

    /// Returns `true` if a rule was removed. Removing a missing rule is not an
    /// error.
    pub fn remove_prefix_rule(&mut self, name: &str) -> StoreResult<bool> {
        self.remove_rule(RuleKind::Prefix, name)
    }

    pub fn remove_extension_rule(&mut self, name: &str) -> StoreResult<bool> {
        self.remove_rule(RuleKind::Extension, name)
    }

    /// Inserts or overwrites a rule, then rewrites the whole document.
    ///
    /// The destination is stored verbatim; expanding `~` or making it absolute
    /// is the caller's job.
    pub fn set_rule(&mut self, kind: RuleKind, name: &str, destination: &str) -> StoreResult<()> {
        let key = validate_rule_name(name)?;
        let destination = destination.trim();
        if destination.is_empty() || destination.contains(['\n', '\r']) {
            return Err(StoreError::InvalidRuleName {
                name: name.to_string(),
                reason: "destination must be a non-empty single-line path".to_string(),
            });
        }

        self.rules_mut(kind).insert(key, destination.to_string());
        self.save()
    }

    /// Deletes a rule if present, then rewrites the whole document.
    pub fn remove_rule(&mut self, kind: RuleKind, name: &str) -> StoreResult<bool> {
        let removed = self.rules_mut(kind).remove(&ini::normalize_key(name)).is_some();
        self.save()?;
        Ok(removed)
    }

    pub fn lookup_prefix_destination(&self, name: &str) -> Result<&str, RuleNotFound> {
        self.lookup(RuleKind::Prefix, name)
    }

    pub fn lookup_extension_destination(&self, extension: &str) -> Result<&str, RuleNotFound> {
        self.lookup(RuleKind::Extension, extension)
    }

    /// Looks up a rule. Names are matched case-insensitively but otherwise
    /// exactly; surrounding whitespace is not trimmed.
    pub fn lookup(&self, kind: RuleKind, name: &str) -> Result<&str, RuleNotFound> {
        self.rules(kind)
            .get(&ini::fold_key(name))
            .map(String::as_str)
            .ok_or_else(|| RuleNotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// All rules of one namespace, sorted by name.
    pub fn rules(&self, kind: RuleKind) -> &BTreeMap<String, String> {
        match kind {
            RuleKind::Prefix => &self.prefix,
            RuleKind::Extension => &self.extension,
        }
    }

    fn rules_mut(&mut self, kind: RuleKind) -> &mut BTreeMap<String, String> {
        match kind {
            RuleKind::Prefix => &mut self.prefix,
            RuleKind::Extension => &mut self.extension,
        }
    }

    fn save(&self) -> StoreResult<()> {
        let mut core = Section::new();
        core.insert("delimiter".to_string(), self.core.delimiter.clone());
        core.insert("polling".to_string(), format!("{:?}", self.core.polling));

        let text = ini::render([
            (CORE_SECTION, &core),
            (PREFIX_SECTION, &self.prefix),
            (EXTENSION_SECTION, &self.extension),
        ]);

        fs::write(&self.config_path, text).map_err(|e| StoreError::Io {
            path: self.config_path.clone(),
            source: e,
        })?;
        debug!(path = %self.config_path.display(), "rule store written");
        Ok(())
    }
}

fn parse_core(section: &Section) -> Result<CoreSettings, String> {
    let delimiter = section
        .get("delimiter")
        .ok_or_else(|| "missing core.delimiter".to_string())?;
    if delimiter.is_empty() {
        return Err("core.delimiter must not be empty".to_string());
    }

    let polling_raw = section
        .get("polling")
        .ok_or_else(|| "missing core.polling".to_string())?;
    let polling: f64 = polling_raw
        .parse()
        .map_err(|_| format!("core.polling is not a number: '{}'", polling_raw))?;
    if !polling.is_finite() || polling <= 0.0 {
        return Err(format!(
            "core.polling must be a positive number of seconds, got {}",
            polling_raw
        ));
    }
    if Duration::try_from_secs_f64(polling).is_ok_and(|interval| interval < MIN_POLLING) {
        return Err(format!(
            "core.polling must be at least {:?}, got {}",
            MIN_POLLING, polling_raw
        ));
    }

    Ok(CoreSettings {
        delimiter: delimiter.clone(),
        polling,
    })
}

/// Rejects names that would not read back as the same option.
fn validate_rule_name(name: &str) -> StoreResult<String> {
    let key = ini::normalize_key(name);
    let reason = if key.is_empty() {
        Some("name is empty")
    } else if key.contains(['=', ':']) {
        Some("name must not contain '=' or ':'")
    } else if key.contains(['\n', '\r']) {
        Some("name must be a single line")
    } else if key.starts_with(['[', '#', ';']) {
        Some("name must not start with '[', '#' or ';'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidRuleName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(key),
    }
}
