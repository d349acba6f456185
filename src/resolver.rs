//! Destination resolution for drop folder entries.
//!
//! Prefix rules win over extension rules. A name is only considered for a
//! prefix rule when the delimiter splits it into exactly two parts; the
//! matched entry is then renamed to the part after the delimiter. Otherwise,
//! or when the prefix has no rule, the extension decides and the entry keeps
//! its full name.
//!
//! # Examples
//!
//! ```no_run
//! use sorta::resolver::resolve_destination;
//! use sorta::rule_store::RuleStore;
//! use std::path::{Path, PathBuf};
//!
//! let mut store = RuleStore::initialize(Path::new("/tmp/drop")).unwrap();
//! store.set_prefix_rule("reports", "/home/user/reports").unwrap();
//!
//! let dest = resolve_destination("reports--q1.pdf", &store).unwrap();
//! assert_eq!(dest, PathBuf::from("/home/user/reports/q1.pdf"));
//! ```

use crate::rule_store::{RuleKind, RuleStore};
use std::path::{Path, PathBuf};

/// No rule applies to an entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no destination found for the element {element}")]
pub struct DestinationNotFound {
    pub element: String,
}

/// The rule that produced a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRule {
    pub kind: RuleKind,
    /// The prefix or extension as it appeared in the entry name.
    pub key: String,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub destination: PathBuf,
    pub rule: MatchedRule,
}

/// Computes where `element_name` should be moved to.
///
/// Only reads the store's in-memory rules; never touches the filesystem.
pub fn resolve_destination(
    element_name: &str,
    store: &RuleStore,
) -> Result<PathBuf, DestinationNotFound> {
    resolve(element_name, store).map(|resolution| resolution.destination)
}

/// Like [`resolve_destination`], also reporting which rule matched.
pub fn resolve(element_name: &str, store: &RuleStore) -> Result<Resolution, DestinationNotFound> {
    let parts: Vec<&str> = element_name.split(store.delimiter()).collect();
    if let [prefix, remainder] = parts.as_slice()
        && let Ok(dir) = store.lookup_prefix_destination(prefix)
    {
        return Ok(Resolution {
            destination: Path::new(dir).join(remainder),
            rule: MatchedRule {
                kind: RuleKind::Prefix,
                key: prefix.to_string(),
            },
        });
    }

    if let Some(extension) = split_extension(element_name)
        && let Ok(dir) = store.lookup_extension_destination(extension)
    {
        return Ok(Resolution {
            destination: Path::new(dir).join(element_name),
            rule: MatchedRule {
                kind: RuleKind::Extension,
                key: extension.to_string(),
            },
        });
    }

    Err(DestinationNotFound {
        element: element_name.to_string(),
    })
}

/// Returns the text after the last dot, without the dot.
///
/// Leading dots belong to the stem, so `.bashrc` and `...` have no
/// extension, while `.config.toml` has `toml`. A trailing dot yields `None`.
pub fn split_extension(name: &str) -> Option<&str> {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    let dot = stem_start + name[stem_start..].rfind('.')?;
    let extension = &name[dot + 1..];
    (!extension.is_empty()).then_some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(prefix: &[(&str, &str)], extension: &[(&str, &str)]) -> (TempDir, RuleStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = RuleStore::initialize(temp_dir.path()).expect("Failed to initialize");
        for (name, dest) in prefix {
            store.set_prefix_rule(name, dest).unwrap();
        }
        for (name, dest) in extension {
            store.set_extension_rule(name, dest).unwrap();
        }
        (temp_dir, store)
    }

    #[test]
    fn test_prefix_rule_renames_into_destination() {
        let (_dir, store) = store_with(&[("reports", "/home/user/reports")], &[]);

        let dest = resolve_destination("reports--q1.pdf", &store).unwrap();
        assert_eq!(dest, PathBuf::from("/home/user/reports/q1.pdf"));
    }

    #[test]
    fn test_extension_rule_keeps_full_name() {
        let (_dir, store) = store_with(&[], &[("pdf", "/home/user/pdfs")]);

        let dest = resolve_destination("invoice.pdf", &store).unwrap();
        assert_eq!(dest, PathBuf::from("/home/user/pdfs/invoice.pdf"));
    }

    #[test]
    fn test_no_extension_no_prefix_is_not_found() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[("pdf", "/p")]);

        let err = resolve_destination("noext", &store).unwrap_err();
        assert_eq!(err.element, "noext");
        assert_eq!(err.to_string(), "no destination found for the element noext");
    }

    #[test]
    fn test_prefix_wins_over_extension() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[("pdf", "/p")]);

        let resolution = resolve("reports--q1.pdf", &store).unwrap();
        assert_eq!(resolution.destination, PathBuf::from("/r/q1.pdf"));
        assert_eq!(resolution.rule.kind, RuleKind::Prefix);
        assert_eq!(resolution.rule.key, "reports");
    }

    #[test]
    fn test_unknown_prefix_falls_through_to_extension() {
        let (_dir, store) = store_with(&[], &[("pdf", "/p")]);

        let dest = resolve_destination("taxes--2024.pdf", &store).unwrap();
        assert_eq!(dest, PathBuf::from("/p/taxes--2024.pdf"));
    }

    #[test]
    fn test_double_delimiter_never_matches_prefix() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[("pdf", "/p")]);

        let dest = resolve_destination("reports--q1--draft.pdf", &store).unwrap();
        assert_eq!(dest, PathBuf::from("/p/reports--q1--draft.pdf"));
    }

    #[test]
    fn test_double_delimiter_without_extension_rule_is_not_found() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[]);
        assert!(resolve_destination("reports--q1--draft.pdf", &store).is_err());
    }

    #[test]
    fn test_unmatched_extension_is_not_found() {
        let (_dir, store) = store_with(&[], &[("pdf", "/p")]);
        assert!(resolve_destination("photo.jpg", &store).is_err());
    }

    #[test]
    fn test_prefix_match_ignores_case() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[]);

        let dest = resolve_destination("Reports--Q1.pdf", &store).unwrap();
        assert_eq!(dest, PathBuf::from("/r/Q1.pdf"));
    }

    #[test]
    fn test_spaced_prefix_falls_through_to_extension() {
        let (_dir, store) = store_with(&[("reports", "/r")], &[("pdf", "/p")]);

        assert_eq!(
            resolve_destination(" reports--q1.pdf", &store).unwrap(),
            PathBuf::from("/p/ reports--q1.pdf")
        );
        assert_eq!(
            resolve_destination("reports --q1.pdf", &store).unwrap(),
            PathBuf::from("/p/reports --q1.pdf")
        );
    }

    #[test]
    fn test_spaced_extension_is_not_found() {
        let (_dir, store) = store_with(&[], &[("pdf", "/p")]);

        let err = resolve_destination("file. pdf", &store).unwrap_err();
        assert_eq!(err.element, "file. pdf");
    }

    #[test]
    fn test_custom_delimiter() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(crate::rule_store::CONFIG_FILE_NAME),
            "[core]\ndelimiter = _\npolling = 60.0\n[prefix]\nwork = /w\n[extension]\n",
        )
        .unwrap();
        let store = RuleStore::load(temp_dir.path()).unwrap();

        assert_eq!(
            resolve_destination("work_notes.txt", &store).unwrap(),
            PathBuf::from("/w/notes.txt")
        );
        assert!(resolve_destination("work_notes_old.txt", &store).is_err());
    }

    #[test]
    fn test_hidden_file_has_no_extension() {
        let (_dir, store) = store_with(&[], &[("bashrc", "/dots")]);
        assert!(resolve_destination(".bashrc", &store).is_err());
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("invoice.pdf"), Some("pdf"));
        assert_eq!(split_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(split_extension(".config.toml"), Some("toml"));
        assert_eq!(split_extension("..hidden.txt"), Some("txt"));
        assert_eq!(split_extension("noext"), None);
        assert_eq!(split_extension(".bashrc"), None);
        assert_eq!(split_extension("..."), None);
        assert_eq!(split_extension("trailing."), None);
        assert_eq!(split_extension(""), None);
    }
}
