//! Request specifications.
//!
//! A [`RequestSpec`] says which records to select, which columns to write
//! and which output files to produce. It can come from a JSON file, from a
//! coded-parameter message (the block of `key = value` lines a request
//! e-mail carries between `Coded parameters for your transformation` and
//! `End of coded parameters`), or from the interactive prompt.
//!
//! # JSON
//!
//! ```
//! use iams2rf::request::{OutputFile, RequestSpec};
//!
//! let spec = RequestSpec::from_json(r#"{
//!     "files": ["records", "topics"],
//!     "columns": ["ID", "TT", "SU"],
//!     "criteria": [{"field": "PC", "op": "exact", "values": ["England"]}],
//!     "date_range": {"from": 1800, "to": 1900}
//! }"#)?;
//! assert_eq!(spec.files.len(), 2);
//! assert!(spec.files.contains(&OutputFile::Topics));
//! # Ok::<(), iams2rf::Error>(())
//! ```
//!
//! # Coded parameters
//!
//! ```
//! use iams2rf::request::RequestSpec;
//!
//! let message = "Dear colleague\n\
//!     Coded parameters for your transformation\n\
//!     o = ID|TT|PC\n\
//!     v = r|n\n\
//!     d1 = 1850\n\
//!     End of coded parameters\n";
//! let spec = RequestSpec::from_message(message)?;
//! assert_eq!(spec.files.len(), 2);
//! assert_eq!(spec.criteria.date_range.and_then(|r| r.from), Some(1850));
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use crate::columns::{Column, ColumnSet};
use crate::criteria::{Criteria, Criterion, DateRange, Operator};
use crate::error::{Error, Result};

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
}

const MESSAGE_START: &str = "Coded parameters for your transformation";
const MESSAGE_END: &str = "End of coded parameters";

/// Languages searched through the hidden language-code column.
const LANGUAGE_CODES: &str = "S_LANGUAGES";

/// One Researcher Format output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFile {
    /// One row per record.
    Records,
    /// One row per related name.
    Names,
    /// One row per title.
    Titles,
    /// One row per topic.
    Topics,
}

impl OutputFile {
    /// Every output file, in writing order.
    pub const ALL: [OutputFile; 4] = [
        OutputFile::Records,
        OutputFile::Names,
        OutputFile::Titles,
        OutputFile::Topics,
    ];

    /// File name written to the output directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFile::Records => "records_IAMS.csv",
            OutputFile::Names => "names_IAMS.csv",
            OutputFile::Titles => "titles_IAMS.csv",
            OutputFile::Topics => "topics_IAMS.csv",
        }
    }

    /// Find a file by name (`records`, `Names` ...) or by its one-letter
    /// message code (`r`, `n`, `t`, `s`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "records" | "record" | "r" => Some(OutputFile::Records),
            "names" | "name" | "n" => Some(OutputFile::Names),
            "titles" | "title" | "t" => Some(OutputFile::Titles),
            "topics" | "topic" | "subjects" | "s" => Some(OutputFile::Topics),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A complete extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Files to write.
    pub files: BTreeSet<OutputFile>,
    /// Columns to write.
    pub columns: ColumnSet,
    /// Records to select.
    pub criteria: Criteria,
}

impl Default for RequestSpec {
    /// Every record, default columns, records file only.
    fn default() -> Self {
        RequestSpec {
            files: [OutputFile::Records].into(),
            columns: ColumnSet::Default,
            criteria: Criteria::new(),
        }
    }
}

impl RequestSpec {
    /// Export every record to every file with every column.
    #[must_use]
    pub fn export_all() -> Self {
        RequestSpec {
            files: OutputFile::ALL.into(),
            columns: ColumnSet::All,
            criteria: Criteria::new(),
        }
    }

    /// Read a request file. `.json` files are parsed as JSON, anything else
    /// as a coded-parameter message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the file cannot be read or
    /// parsed, and [`Error::InvalidCriteria`] for a bad criterion.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| invalid(path, e.to_string()))?;
        let text = String::from_utf8_lossy(&bytes);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        tracing::info!(path = %path.display(), json = is_json, "reading request");
        if is_json {
            parse_json(&text, path)
        } else {
            parse_message(&text, path)
        }
    }

    /// Parse a JSON request.
    ///
    /// # Errors
    ///
    /// As for [`from_path`](Self::from_path).
    pub fn from_json(text: &str) -> Result<Self> {
        parse_json(text, Path::new("<json>"))
    }

    /// Parse a coded-parameter message.
    ///
    /// # Errors
    ///
    /// As for [`from_path`](Self::from_path).
    pub fn from_message(text: &str) -> Result<Self> {
        parse_message(text, Path::new("<message>"))
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::InvalidRequest {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonRequest {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    columns: Option<JsonColumns>,
    #[serde(default)]
    criteria: Vec<JsonCriterion>,
    #[serde(default)]
    date_range: Option<DateRange>,
    #[serde(default)]
    text: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonColumns {
    Named(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonCriterion {
    field: String,
    #[serde(default)]
    op: Option<String>,
    values: Vec<String>,
}

fn parse_json(text: &str, path: &Path) -> Result<RequestSpec> {
    let raw: JsonRequest = serde_json::from_str(text).map_err(|e| invalid(path, e.to_string()))?;

    let mut files = BTreeSet::new();
    for name in &raw.files {
        let file = OutputFile::from_name(name)
            .ok_or_else(|| invalid(path, format!("unknown output file '{name}'")))?;
        files.insert(file);
    }
    if files.is_empty() {
        files.insert(OutputFile::Records);
    }

    let columns = match raw.columns {
        None => ColumnSet::Default,
        Some(JsonColumns::Named(name)) => match name.trim().to_lowercase().as_str() {
            "default" => ColumnSet::Default,
            "all" => ColumnSet::All,
            _ => return Err(invalid(path, format!("unknown column set '{name}'"))),
        },
        Some(JsonColumns::List(codes)) => ColumnSet::Explicit(
            codes
                .iter()
                .map(|code| {
                    Column::lookup(code)
                        .filter(|c| !c.hidden)
                        .ok_or_else(|| invalid(path, format!("unknown column '{code}'")))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
    };

    let mut criteria = Criteria::new();
    for c in raw.criteria {
        let operator = match c.op {
            Some(op) => op.parse::<Operator>()?,
            None => Operator::Exact,
        };
        criteria = criteria.with_criterion(Criterion::new(c.field, operator, c.values));
    }
    criteria.date_range = raw.date_range;
    criteria.text = raw.text;
    criteria.validate()?;

    Ok(RequestSpec {
        files,
        columns,
        criteria,
    })
}

/// Strip markup, entities and stray characters from one message line.
#[must_use]
pub fn clean_message_line(line: &str) -> String {
    let line = line.replace(['\u{0}', '\u{FFFD}', '\r', '\n'], "");
    let line = MARKUP.replace_all(&line, "").replace("&nbsp;", " ");
    line.nfc().collect::<String>().trim().to_string()
}

/// Split a parameter value on `|`, trimming and dropping empty entries.
fn split_values(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first four digits of a value, as a year.
fn message_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().filter(char::is_ascii_digit).take(4).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

fn parse_message(text: &str, path: &Path) -> Result<RequestSpec> {
    let mut lines = text.lines().map(clean_message_line);
    if !lines.by_ref().any(|line| line.contains(MESSAGE_START)) {
        return Err(invalid(path, format!("no '{MESSAGE_START}' block")));
    }

    let mut spec = RequestSpec::default();
    let mut columns = Vec::new();
    let mut languages = Vec::new();
    let mut range = DateRange::default();

    for line in lines {
        if line.contains(MESSAGE_END) {
            break;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match key {
            "o" => {
                for code in split_values(value) {
                    match Column::by_code(&code).filter(|c| !c.hidden) {
                        Some(column) => columns.push(column),
                        None => tracing::warn!(code, "ignoring unknown column code"),
                    }
                }
            },
            "v" => {
                let files: Option<BTreeSet<_>> = value
                    .split('|')
                    .flat_map(str::chars)
                    .filter(|c| !c.is_whitespace())
                    .map(|c| OutputFile::from_name(&c.to_string()))
                    .collect();
                match files {
                    Some(files) if !files.is_empty() => spec.files = files,
                    _ => return Err(invalid(path, format!("bad output file list '{value}'"))),
                }
            },
            "l1" => languages.extend(split_values(value)),
            "txt" => spec.criteria.text.extend(split_values(value)),
            "d1" => range.from = message_year(value),
            "d2" => range.to = message_year(value),
            other => tracing::debug!(key = other, "ignoring unknown parameter"),
        }
    }

    if !columns.is_empty() {
        spec.columns = ColumnSet::Explicit(columns);
    }
    if !languages.is_empty() {
        spec.criteria = spec
            .criteria
            .with_criterion(Criterion::new(LANGUAGE_CODES, Operator::Exact, languages));
    }
    if range.from.is_some() || range.to.is_some() {
        spec.criteria.date_range = Some(range);
    }
    spec.criteria.validate()?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_defaults() {
        let spec = RequestSpec::from_json("{}").expect("valid");
        assert_eq!(spec, RequestSpec::default());
    }

    #[test]
    fn test_json_named_columns_and_text() {
        let spec =
            RequestSpec::from_json(r#"{"columns": "all", "text": ["Dickens"]}"#).expect("valid");
        assert_eq!(spec.columns, ColumnSet::All);
        assert_eq!(spec.criteria.text, vec!["Dickens"]);
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            RequestSpec::from_json("{"),
            Err(Error::InvalidRequest { .. })
        ));
        assert!(matches!(
            RequestSpec::from_json(r#"{"files": ["everything"]}"#),
            Err(Error::InvalidRequest { .. })
        ));
        assert!(matches!(
            RequestSpec::from_json(r#"{"criteria": [{"field": "PC", "op": "near", "values": ["x"]}]}"#),
            Err(Error::InvalidCriteria { .. })
        ));
        assert!(matches!(
            RequestSpec::from_json(r#"{"criteria": [{"field": "QQ", "values": ["x"]}]}"#),
            Err(Error::InvalidCriteria { .. })
        ));
    }

    #[test]
    fn test_message_block() {
        let message = "<p>Hello</p>\n\
            <b>Coded parameters for your transformation</b>\n\
            o = ID|TT|<i>SU</i>|ZZ\n\
            v = r|t|s\n\
            l1 = eng|fre\n\
            txt = Dickens\n\
            d2 = c.1900\n\
            End of coded parameters\n\
            o = PC\n";
        let spec = RequestSpec::from_message(message).expect("valid");
        let ColumnSet::Explicit(columns) = &spec.columns else {
            panic!("explicit columns expected");
        };
        let codes: Vec<_> = columns.iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["ID", "TT", "SU"]);
        assert_eq!(
            spec.files,
            [OutputFile::Records, OutputFile::Titles, OutputFile::Topics].into()
        );
        assert_eq!(spec.criteria.criteria.len(), 1);
        assert_eq!(spec.criteria.criteria[0].field, "S_LANGUAGES");
        assert_eq!(spec.criteria.criteria[0].values, vec!["eng", "fre"]);
        assert_eq!(spec.criteria.text, vec!["Dickens"]);
        assert_eq!(spec.criteria.date_range, Some(DateRange::new(None, Some(1900))));
    }

    #[test]
    fn test_message_without_block() {
        assert!(matches!(
            RequestSpec::from_message("o = TT\n"),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_clean_message_line() {
        assert_eq!(clean_message_line("<span>o&nbsp;= TT</span>\r\n"), "o = TT");
    }

    #[test]
    fn test_from_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = dir.path().join("request.json");
        fs::write(&json, r#"{"files": ["names"]}"#).expect("write");
        let spec = RequestSpec::from_path(&json).expect("json request");
        assert_eq!(spec.files, [OutputFile::Names].into());

        let msg = dir.path().join("request.msg");
        let mut file = fs::File::create(&msg).expect("create");
        writeln!(file, "Coded parameters for your transformation\nv = n\nEnd of coded parameters")
            .expect("write");
        let spec = RequestSpec::from_path(&msg).expect("message request");
        assert_eq!(spec.files, [OutputFile::Names].into());

        assert!(matches!(
            RequestSpec::from_path(dir.path().join("missing.json")),
            Err(Error::InvalidRequest { .. })
        ));
    }
}
