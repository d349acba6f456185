//! User settings for sweeps.
//!
//! Rules live in each drop folder's `.sortaconfig`; this module covers the
//! user-level TOML settings that decide which drop folder entries a sweep
//! looks at in the first place. Filters match entry names only, since a sweep
//! never descends into subdirectories.
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::split_extension;

/// Settings file looked up in the current directory.
pub const LOCAL_SETTINGS_FILE: &str = ".sortarc.toml";

/// Errors that can occur while loading or compiling sweep settings.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FilterError {
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid settings in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("could not read settings {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default)]
    pub filters: FilterRules,
}

/// Which entries a sweep considers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether entries whose name starts with "." are swept. Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Include patterns override every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for leaving entries alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact entry names.
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the leading dot, compared case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl SweepSettings {
    /// Loads settings, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `settings_path`, when given (it must exist)
    /// 2. `.sortarc.toml` in the current directory
    /// 3. `sorta/config.toml` under the platform config directory
    /// 4. defaults: no filters
    pub fn load(settings_path: Option<&Path>) -> Result<Self, FilterError> {
        if let Some(path) = settings_path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(LOCAL_SETTINGS_FILE);
        if local.is_file() {
            return Self::load_from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("sorta").join("config.toml");
            if user.is_file() {
                return Self::load_from_file(&user);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, FilterError> {
        if !path.exists() {
            return Err(FilterError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| FilterError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| FilterError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Validates and compiles the filter rules.
    pub fn compile(self) -> Result<SweepFilters, FilterError> {
        SweepFilters::new(self.filters)
    }
}

/// Filter rules ready for matching.
#[derive(Debug)]
pub struct SweepFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl Default for SweepFilters {
    fn default() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

impl SweepFilters {
    fn new(rules: FilterRules) -> Result<Self, FilterError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| FilterError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| FilterError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Whether a sweep should try to sort the entry called `name`.
    ///
    /// Include patterns are checked first and short-circuit to `true`; then
    /// hidden entries, exact names, extensions, globs and regexes exclude.
    pub fn should_sweep(&self, name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.enable_hidden_files && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name) {
            return false;
        }

        if let Some(ext) = split_extension(name)
            && self.exclude_extensions.contains(&ext.to_lowercase())
        {
            return false;
        }

        if self.exclude_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(name))
    }
}
