//! Reading and writing of the flat, section-based `.sortaconfig` document.
//!
//! The format is the usual INI dialect:
//!
//! ```text
//! [core]
//! delimiter = --
//! polling = 60.0
//!
//! [prefix]
//! reports = /home/user/reports
//! ```
//!
//! Option names are trimmed and lower-cased, values are trimmed. Both `=` and
//! `:` separate a name from its value, whichever comes first on the line.
//! Lines starting with `#` or `;` are comments.

use std::collections::{BTreeMap, HashMap};

/// A parsed section: option name to value.
pub type Section = BTreeMap<String, String>;

/// Errors produced while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct IniError {
    /// 1-based line number of the offending line.
    pub line: usize,
    pub reason: String,
}

impl IniError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// A parsed document, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: HashMap<String, Section>,
}

impl IniDocument {
    /// Parses `text` into sections.
    ///
    /// Duplicate sections, duplicate options within a section, options that
    /// appear before any section header and lines without a separator are
    /// all rejected.
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut sections: HashMap<String, Section> = HashMap::new();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| IniError::new(line_no, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(IniError::new(line_no, "empty section name"));
                }
                if sections.contains_key(name) {
                    return Err(IniError::new(
                        line_no,
                        format!("section '{}' already exists", name),
                    ));
                }
                sections.insert(name.to_string(), Section::new());
                current = Some(name.to_string());
                continue;
            }

            let section_name = current
                .as_ref()
                .ok_or_else(|| IniError::new(line_no, "option found before any section header"))?;

            let split_at = line
                .find(['=', ':'])
                .ok_or_else(|| IniError::new(line_no, "expected 'name = value'"))?;
            let key = normalize_key(&line[..split_at]);
            let value = line[split_at + 1..].trim().to_string();

            if key.is_empty() {
                return Err(IniError::new(line_no, "empty option name"));
            }

            let section = sections
                .get_mut(section_name)
                .ok_or_else(|| IniError::new(line_no, "section vanished while parsing"))?;
            if section.contains_key(&key) {
                return Err(IniError::new(
                    line_no,
                    format!("option '{}' already exists in section '{}'", key, section_name),
                ));
            }
            section.insert(key, value);
        }

        Ok(Self { sections })
    }

    /// Removes and returns the named section, if present.
    pub fn take_section(&mut self, name: &str) -> Option<Section> {
        self.sections.remove(name)
    }
}

/// Renders sections in the given order.
///
/// Every section is followed by a blank line, empty sections included, so the
/// output of an initialized store always shows all of its namespaces.
pub fn render<'a, I>(sections: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Section)>,
{
    let mut out = String::new();
    for (name, options) in sections {
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
        for (key, value) in options {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Trims and lower-cases an option name as it is parsed or written.
pub fn normalize_key(key: &str) -> String {
    fold_key(key.trim())
}

/// Lower-cases a lookup key. Surrounding whitespace is part of the key, so
/// `" pdf"` never matches a `pdf` option.
pub fn fold_key(key: &str) -> String {
    key.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_options() {
        let doc = IndexedDoc::from(
            "[core]\ndelimiter = --\npolling = 60.0\n\n[prefix]\nreports = /home/user/reports\n\n[extension]\n",
        );

        assert_eq!(doc.get("core", "delimiter"), Some("--"));
        assert_eq!(doc.get("core", "polling"), Some("60.0"));
        assert_eq!(doc.get("prefix", "reports"), Some("/home/user/reports"));
        assert!(doc.0.sections.get("extension").unwrap().is_empty());
    }

    #[test]
    fn test_parse_accepts_colon_separator_and_comments() {
        let doc = IndexedDoc::from("# leading comment\n[prefix]\n; another\n  Work : /tmp/work  \n");
        assert_eq!(doc.get("prefix", "work"), Some("/tmp/work"));
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let doc = IndexedDoc::from("[extension]\npdf = C:\\Users\\me = odd\n");
        assert_eq!(doc.get("extension", "pdf"), Some("C:\\Users\\me = odd"));
    }

    #[test]
    fn test_parse_rejects_option_outside_section() {
        let err = IniDocument::parse("delimiter = --\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_parse_rejects_duplicate_option() {
        let err = IniDocument::parse("[prefix]\na = /x\nA = /y\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.reason.contains("already exists"));
    }

    #[test]
    fn test_parse_rejects_duplicate_section() {
        assert!(IniDocument::parse("[core]\n[core]\n").is_err());
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        let err = IniDocument::parse("[core]\njust words\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_fold_key_keeps_whitespace() {
        assert_eq!(normalize_key("  Reports "), "reports");
        assert_eq!(fold_key(" Reports"), " reports");
        assert_ne!(fold_key("pdf "), normalize_key("pdf "));
    }

    #[test]
    fn test_render_keeps_empty_sections() {
        let mut core = Section::new();
        core.insert("delimiter".to_string(), "--".to_string());
        let empty = Section::new();

        let text = render([("core", &core), ("prefix", &empty), ("extension", &empty)]);
        assert_eq!(text, "[core]\ndelimiter = --\n\n[prefix]\n\n[extension]\n\n");

        let reparsed = IniDocument::parse(&text).unwrap();
        assert!(reparsed.sections.get("prefix").is_some());
        assert!(reparsed.sections.get("extension").is_some());
    }

    struct IndexedDoc(IniDocument);

    impl IndexedDoc {
        fn from(text: &str) -> Self {
            Self(IniDocument::parse(text).expect("document should parse"))
        }

        fn get(&self, section: &str, key: &str) -> Option<&str> {
            self.0.sections.get(section)?.get(key).map(String::as_str)
        }
    }
}
