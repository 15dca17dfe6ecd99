//! The in-memory record model.
//!
//! A [`Record`] holds one archive description: its identifier, the single
//! cells of the Researcher Format master columns, and the ordered values of
//! each multi-valued [`Category`]. Values are stored exactly as the parser
//! produced them; facet splitting happens at selection and export time.
//!
//! # Examples
//!
//! ```
//! use iams2rf::record::{Category, Record};
//!
//! let record = Record::builder("040-000123456")
//!     .field("TT", "Letters to the editor")
//!     .field("PC", "England")
//!     .topic("Civil rights--History", "general term")
//!     .build()?;
//!
//! assert_eq!(record.id().as_str(), "040-000123456");
//! assert_eq!(record.master("TT"), Some("Letters to the editor"));
//! assert_eq!(record.values(Category::Topics), vec!["Civil rights--History"]);
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::columns::{Column, ColumnSource};
use crate::delimiters::RESEARCHER_FORMAT;
use crate::error::{Error, Result};
use crate::record_id::{RecordId, RecordStatus, RecordType};

/// A multi-valued attribute category. Each category has its own child table
/// in the store and its own per-value output file (where one exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Names related to the record (creators, correspondents, ...).
    Names,
    /// Main and additional titles.
    Titles,
    /// Subjects and places.
    Topics,
    /// External identifiers without a dedicated column.
    Identifiers,
    /// Languages of the material.
    Languages,
}

impl Category {
    /// Every category, in store order.
    pub const ALL: [Category; 5] = [
        Category::Names,
        Category::Titles,
        Category::Topics,
        Category::Identifiers,
        Category::Languages,
    ];

    /// Name of the category's child table.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Category::Names => "names",
            Category::Titles => "titles",
            Category::Topics => "topics",
            Category::Identifiers => "identifiers",
            Category::Languages => "languages",
        }
    }

    /// Find a category by name (`Topics`, `topics`, `Subjects` ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "names" | "name" => Some(Category::Names),
            "titles" | "title" => Some(Category::Titles),
            "topics" | "topic" | "subjects" | "subject" => Some(Category::Topics),
            "identifiers" | "identifier" => Some(Category::Identifiers),
            "languages" | "language" => Some(Category::Languages),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One related name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    /// Heading, e.g. `Dickens, Charles`.
    pub name: String,
    /// Dates associated with the name.
    pub dates: String,
    /// `person`, `family`, `corporation` ...
    pub kind: String,
    /// Relationship to the record, lower case.
    pub role: String,
    /// ISNI URI.
    pub isni: String,
    /// VIAF URI.
    pub viaf: String,
}

impl NameEntry {
    /// Create an entry with just a heading.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        NameEntry {
            name: name.into(),
            ..NameEntry::default()
        }
    }

    /// Single-cell form used in "All names" and "Other names":
    /// `Name, dates [role]`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.name.clone();
        if !self.dates.is_empty() {
            out.push_str(", ");
            out.push_str(&self.dates);
        }
        if !self.role.is_empty() {
            out.push_str(" [");
            out.push_str(&self.role);
            out.push(']');
        }
        out
    }
}

/// One topic (subject or place heading).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    /// Heading, possibly faceted.
    pub topic: String,
    /// `place`, `general term`, `person` ...
    pub kind: String,
}

/// One external identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierEntry {
    /// Identifier value.
    pub value: String,
    /// Identifier scheme as given in the source, may be empty.
    pub scheme: String,
}

impl IdentifierEntry {
    /// Single-cell form: `value [scheme]`.
    #[must_use]
    pub fn render(&self) -> String {
        if self.scheme.is_empty() {
            self.value.clone()
        } else {
            format!("{} [{}]", self.value, self.scheme)
        }
    }
}

/// One archive description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    status: Option<RecordStatus>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    master: IndexMap<&'static str, String>,
    master_values: IndexMap<&'static str, Vec<String>>,
    names: Vec<NameEntry>,
    titles: Vec<String>,
    topics: Vec<TopicEntry>,
    identifiers: Vec<IdentifierEntry>,
    languages: Vec<String>,
}

impl Record {
    /// Start building a record with the given identifier text.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            id: id.into(),
            status: None,
            start_year: None,
            end_year: None,
            fields: IndexMap::new(),
            names: Vec::new(),
            titles: Vec::new(),
            topics: Vec::new(),
            identifiers: Vec::new(),
            languages: Vec::new(),
        }
    }

    /// Build a record from raw `(field, value)` pairs.
    ///
    /// `field` is a column code or a category name. Values for derived
    /// columns (`AN`, `SU`, `LA`, `OI`) and for category names go to the
    /// matching category; everything else becomes part of a master cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the identifier is missing or not
    /// well-formed, or if a field names neither a column nor a category.
    pub fn from_fields<I, K, V>(id: &str, fields: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Record::builder(id);
        for (key, value) in fields {
            let key = key.as_ref();
            let category = Category::from_name(key).or_else(|| {
                Column::by_code(key).and_then(|c| match c.source {
                    ColumnSource::Category(category) => Some(category),
                    _ => None,
                })
            });
            builder = match category {
                Some(Category::Names) => builder.name(NameEntry::new(value)),
                Some(Category::Titles) => builder.title(value),
                Some(Category::Topics) => builder.topic(value, ""),
                Some(Category::Identifiers) => builder.identifier(value, ""),
                Some(Category::Languages) => builder.language(value),
                None => builder.field(key, value),
            };
        }
        builder.build()
    }

    /// The record identifier.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The record type from the identifier prefix.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.id.record_type()
    }

    /// Publication status, when the snapshot carried a known code.
    #[must_use]
    pub fn status(&self) -> Option<RecordStatus> {
        self.status
    }

    /// First year of the record's date range.
    #[must_use]
    pub fn start_year(&self) -> Option<i32> {
        self.start_year
    }

    /// Last year of the record's date range.
    #[must_use]
    pub fn end_year(&self) -> Option<i32> {
        self.end_year
    }

    /// The master cell for a column code, if non-empty.
    #[must_use]
    pub fn master(&self, code: &str) -> Option<&str> {
        self.master.get(code).map(String::as_str)
    }

    /// All non-empty master cells in catalogue order.
    pub fn master_cells(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.master.iter().map(|(code, cell)| (*code, cell.as_str()))
    }

    /// The separate values behind a master cell, in source order.
    ///
    /// A value may itself contain the repeat delimiter; only this list says
    /// where one value ends and the next begins.
    #[must_use]
    pub fn master_values(&self, code: &str) -> &[String] {
        self.master_values.get(code).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every master column with its separate values, in catalogue order.
    pub fn master_value_lists(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        self.master_values
            .iter()
            .map(|(code, values)| (*code, values.as_slice()))
    }

    /// Ordered raw values of a category.
    #[must_use]
    pub fn values(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Names => self.names.iter().map(|n| n.name.as_str()).collect(),
            Category::Titles => self.titles.iter().map(String::as_str).collect(),
            Category::Topics => self.topics.iter().map(|t| t.topic.as_str()).collect(),
            Category::Identifiers => self.identifiers.iter().map(|i| i.value.as_str()).collect(),
            Category::Languages => self.languages.iter().map(String::as_str).collect(),
        }
    }

    /// Related names in source order.
    #[must_use]
    pub fn names(&self) -> &[NameEntry] {
        &self.names
    }

    /// Titles in source order.
    #[must_use]
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Topics in source order.
    #[must_use]
    pub fn topics(&self) -> &[TopicEntry] {
        &self.topics
    }

    /// External identifiers in source order.
    #[must_use]
    pub fn identifiers(&self) -> &[IdentifierEntry] {
        &self.identifiers
    }

    /// Languages in source order.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

/// Builder for [`Record`]; validation happens in [`RecordBuilder::build`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: String,
    status: Option<RecordStatus>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    fields: IndexMap<String, Vec<String>>,
    names: Vec<NameEntry>,
    titles: Vec<String>,
    topics: Vec<TopicEntry>,
    identifiers: Vec<IdentifierEntry>,
    languages: Vec<String>,
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

impl RecordBuilder {
    /// Add a value to a master column. Repeated values are joined with the
    /// repeat delimiter; exact duplicates and empty values are dropped.
    #[must_use]
    pub fn field(mut self, code: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let values = self.fields.entry(code.to_string()).or_default();
        if !value.is_empty() {
            push_unique(values, value);
        }
        self
    }

    /// Set the publication status.
    #[must_use]
    pub fn status(mut self, status: Option<RecordStatus>) -> Self {
        self.status = status;
        self
    }

    /// Set the searchable year range.
    #[must_use]
    pub fn years(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    /// Append a related name.
    #[must_use]
    pub fn name(mut self, entry: NameEntry) -> Self {
        if !entry.name.is_empty() {
            push_unique(&mut self.names, entry);
        }
        self
    }

    /// Append a title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        if !title.is_empty() {
            push_unique(&mut self.titles, title);
        }
        self
    }

    /// Append a topic.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>, kind: impl Into<String>) -> Self {
        let entry = TopicEntry {
            topic: topic.into(),
            kind: kind.into(),
        };
        if !entry.topic.is_empty() {
            push_unique(&mut self.topics, entry);
        }
        self
    }

    /// Append an external identifier.
    #[must_use]
    pub fn identifier(mut self, value: impl Into<String>, scheme: impl Into<String>) -> Self {
        let entry = IdentifierEntry {
            value: value.into(),
            scheme: scheme.into(),
        };
        if !entry.value.is_empty() {
            push_unique(&mut self.identifiers, entry);
        }
        self
    }

    /// Append a language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.is_empty() {
            push_unique(&mut self.languages, language);
        }
        self
    }

    /// Whether any value has been collected for a master column.
    #[must_use]
    pub fn has_field(&self, code: &str) -> bool {
        self.fields.get(code).is_some_and(|v| !v.is_empty())
    }

    /// Validate and build the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the identifier is not
    /// well-formed or a field code is not a master column.
    pub fn build(self) -> Result<Record> {
        let id = RecordId::parse(&self.id)?;
        let mut master = IndexMap::new();
        let mut master_values = IndexMap::new();
        let mut fields = self.fields;
        for column in Column::master_columns() {
            if let Some(values) = fields.shift_remove(column.code) {
                let cell = RESEARCHER_FORMAT.join_repeats(&values);
                if !cell.is_empty() {
                    master.insert(column.code, cell);
                    master_values.insert(column.code, values);
                }
            }
        }
        fields.shift_remove("ID");
        if let Some(code) = fields.keys().next() {
            return Err(Error::malformed(
                0,
                Some(id.as_str()),
                format!("'{code}' is not a master column"),
            ));
        }
        Ok(Record {
            id,
            status: self.status,
            start_year: self.start_year,
            end_year: self.end_year,
            master,
            master_values,
            names: self.names,
            titles: self.titles,
            topics: self.topics,
            identifiers: self.identifiers,
            languages: self.languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_category_order() {
        let record = Record::builder("040-000000001")
            .topic("London", "place")
            .topic("New York", "place")
            .topic("London", "place")
            .build()
            .expect("valid record");
        assert_eq!(record.values(Category::Topics), vec!["London", "New York"]);
    }

    #[test]
    fn test_master_cells_join_repeats() {
        let record = Record::builder("040-000000001")
            .field("DS", "2 volumes")
            .field("DS", "Digital file format: PDF.")
            .field("DS", "")
            .build()
            .expect("valid record");
        assert_eq!(
            record.master("DS"),
            Some("2 volumes ; Digital file format: PDF.")
        );
        assert_eq!(record.master("TT"), None);
        assert_eq!(
            record.master_values("DS"),
            ["2 volumes", "Digital file format: PDF."]
        );
    }

    #[test]
    fn test_master_values_keep_embedded_delimiter() {
        let record = Record::builder("040-000000001")
            .field("TT", "Letters; diaries")
            .build()
            .expect("valid record");
        assert_eq!(record.master("TT"), Some("Letters; diaries"));
        assert_eq!(record.master_values("TT"), ["Letters; diaries"]);
        assert!(record.master_values("PC").is_empty());
    }

    #[test]
    fn test_invalid_identifier_is_malformed() {
        let err = Record::builder("40-123").build().expect_err("bad id");
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let err = Record::builder("040-000000001")
            .field("ZZ", "value")
            .build()
            .expect_err("unknown column");
        assert!(err.to_string().contains("'ZZ' is not a master column"));
    }

    #[test]
    fn test_from_fields_routes_categories() {
        let record = Record::from_fields(
            "041-000000042",
            [
                ("TT", "Diary"),
                ("SU", "Civil rights--History"),
                ("Names", "Smith, John"),
                ("LA", "English"),
                ("ID", "041-000000042"),
            ],
        )
        .expect("valid record");
        assert_eq!(record.master("TT"), Some("Diary"));
        assert_eq!(record.values(Category::Topics), vec!["Civil rights--History"]);
        assert_eq!(record.values(Category::Names), vec!["Smith, John"]);
        assert_eq!(record.values(Category::Languages), vec!["English"]);
        assert_eq!(record.record_type(), RecordType::Item);
    }

    #[test]
    fn test_name_render() {
        let entry = NameEntry {
            name: "Dickens, Charles".to_string(),
            dates: "1812-1870".to_string(),
            role: "author".to_string(),
            ..NameEntry::default()
        };
        assert_eq!(entry.render(), "Dickens, Charles, 1812-1870 [author]");
        assert_eq!(NameEntry::new("Anon").render(), "Anon");
    }

    #[test]
    fn test_identifier_render() {
        let entry = IdentifierEntry {
            value: "12345".to_string(),
            scheme: "NRA".to_string(),
        };
        assert_eq!(entry.render(), "12345 [NRA]");
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(Category::from_name("Topics"), Some(Category::Topics));
        assert_eq!(Category::from_name("subjects"), Some(Category::Topics));
        assert_eq!(Category::from_name("shelfmarks"), None);
    }
}
