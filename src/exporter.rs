//! Researcher Format CSV export.
//!
//! Up to four files are written for a selection:
//!
//! | File | Rows | Leading columns |
//! |------|------|-----------------|
//! | `records_IAMS.csv` | one per record | the selected columns |
//! | `names_IAMS.csv` | one per name | Name, Dates associated with name, Type of name, Role, ISNI, VIAF, Other names |
//! | `titles_IAMS.csv` | one per title | Title, Other titles |
//! | `topics_IAMS.csv` | one per topic | Topic, Type of topic |
//!
//! Per-value files continue with the selected columns, minus those the
//! leading columns already cover. Rows follow ascending identifier order
//! and then stored order, and nothing time-dependent is written, so the same
//! store and request always produce the same bytes.
//!
//! # Examples
//!
//! ```no_run
//! use iams2rf::columns::ColumnSet;
//! use iams2rf::exporter::{ExportPlan, Exporter};
//! use iams2rf::request::OutputFile;
//! use iams2rf::store::Store;
//!
//! let store = Store::open("iams.db")?;
//! let ids = store.record_ids()?;
//! let plan = ExportPlan::new([OutputFile::Records, OutputFile::Topics], &ColumnSet::Default);
//! let summary = Exporter::new(&store).export(&ids, &plan, "out")?;
//! println!("{} records, {} topic rows", summary.matched, summary.rows_in(OutputFile::Topics));
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::Path;

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};

use crate::columns::{Column, ColumnSet, ColumnSource};
use crate::delimiters::{Delimiters, RESEARCHER_FORMAT};
use crate::error::Result;
use crate::record::{Category, IdentifierEntry, NameEntry, Record, TopicEntry};
use crate::record_id::RecordId;
use crate::request::{OutputFile, RequestSpec};
use crate::store::Store;

const NAMES_HEADER: &[&str] = &[
    "Name",
    "Dates associated with name",
    "Type of name",
    "Role",
    "ISNI",
    "VIAF",
    "Other names",
];
const NAMES_COVERED: &[&str] = &["AA", "AD", "AT", "AR", "II", "VF", "AN"];

const TITLES_HEADER: &[&str] = &["Title", "Other titles"];
const TITLES_COVERED: &[&str] = &["TT", "TV", "TU", "TK"];

const TOPICS_HEADER: &[&str] = &["Topic", "Type of topic"];
const TOPICS_COVERED: &[&str] = &["SU"];

/// Which files to write and with which columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    /// Files to write.
    pub files: BTreeSet<OutputFile>,
    /// Selected columns, in catalogue order.
    pub columns: Vec<Column>,
}

impl ExportPlan {
    /// Create a plan.
    pub fn new(files: impl IntoIterator<Item = OutputFile>, columns: &ColumnSet) -> Self {
        ExportPlan {
            files: files.into_iter().collect(),
            columns: columns.resolve(),
        }
    }

    /// The plan a request asks for.
    #[must_use]
    pub fn from_request(request: &RequestSpec) -> Self {
        Self::new(request.files.iter().copied(), &request.columns)
    }

    /// Selected columns that follow the leading columns of `file`.
    #[must_use]
    pub fn trailing_columns(&self, file: OutputFile) -> Vec<Column> {
        let covered: &[&str] = match file {
            OutputFile::Records => &[],
            OutputFile::Names => NAMES_COVERED,
            OutputFile::Titles => TITLES_COVERED,
            OutputFile::Topics => TOPICS_COVERED,
        };
        self.columns
            .iter()
            .filter(|c| !covered.contains(&c.code))
            .copied()
            .collect()
    }

    /// Header row of `file`.
    #[must_use]
    pub fn header(&self, file: OutputFile) -> Vec<&'static str> {
        let leading: &[&str] = match file {
            OutputFile::Records => &[],
            OutputFile::Names => NAMES_HEADER,
            OutputFile::Titles => TITLES_HEADER,
            OutputFile::Topics => TOPICS_HEADER,
        };
        leading
            .iter()
            .copied()
            .chain(self.trailing_columns(file).iter().map(|c| c.label))
            .collect()
    }
}

/// What an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records selected for export.
    pub matched: usize,
    /// Data rows written per file (header excluded).
    pub rows: BTreeMap<OutputFile, usize>,
}

impl ExportSummary {
    /// Data rows written to `file`; zero if it was not requested.
    #[must_use]
    pub fn rows_in(&self, file: OutputFile) -> usize {
        self.rows.get(&file).copied().unwrap_or(0)
    }
}

/// Everything needed to render one record's rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordView {
    /// Identifier.
    pub id: String,
    /// Master cells by column code.
    pub cells: BTreeMap<&'static str, String>,
    /// Names in order.
    pub names: Vec<NameEntry>,
    /// Titles in order.
    pub titles: Vec<String>,
    /// Topics in order.
    pub topics: Vec<TopicEntry>,
    /// Identifiers in order.
    pub identifiers: Vec<IdentifierEntry>,
    /// Languages in order.
    pub languages: Vec<String>,
}

impl RecordView {
    /// Load a view from the store; `None` if the record is not stored.
    ///
    /// # Errors
    ///
    /// Returns a store error if a query fails.
    pub fn load(store: &Store, id: &RecordId) -> Result<Option<Self>> {
        let Some(row) = store.master_row(id)? else {
            return Ok(None);
        };
        Ok(Some(RecordView {
            id: id.to_string(),
            cells: row.cells.into_iter().collect(),
            names: store.names(id)?,
            titles: store.titles(id)?,
            topics: store.topics(id)?,
            identifiers: store.identifiers(id)?,
            languages: store.languages(id)?,
        }))
    }

    /// The cell of one column.
    #[must_use]
    pub fn cell(&self, column: &Column, delimiters: &Delimiters) -> String {
        match column.source {
            ColumnSource::Identifier => self.id.clone(),
            ColumnSource::Master => self.cells.get(column.code).cloned().unwrap_or_default(),
            ColumnSource::Category(category) => self.category_cell(category, delimiters),
        }
    }

    /// All values of a category in one cell, joined with the repeat
    /// delimiter; facets are left intact.
    #[must_use]
    pub fn category_cell(&self, category: Category, delimiters: &Delimiters) -> String {
        let values: Vec<String> = match category {
            Category::Names => self.names.iter().map(NameEntry::render).collect(),
            Category::Titles => self.titles.clone(),
            Category::Topics => self.topics.iter().map(|t| t.topic.clone()).collect(),
            Category::Identifiers => self.identifiers.iter().map(IdentifierEntry::render).collect(),
            Category::Languages => self.languages.clone(),
        };
        delimiters.join_repeats(&values)
    }

    fn cells(&self, columns: &[Column], delimiters: &Delimiters) -> Vec<String> {
        columns.iter().map(|c| self.cell(c, delimiters)).collect()
    }

    /// Rows of `file` for this record.
    #[must_use]
    pub fn rows(&self, file: OutputFile, plan: &ExportPlan, delimiters: &Delimiters) -> Vec<Vec<String>> {
        let trailing = self.cells(&plan.trailing_columns(file), delimiters);
        let with_trailing = |mut leading: Vec<String>| {
            leading.extend(trailing.iter().cloned());
            leading
        };
        match file {
            OutputFile::Records => vec![trailing.clone()],
            OutputFile::Names => self
                .names
                .iter()
                .map(|n| {
                    let others: Vec<String> = self
                        .names
                        .iter()
                        .filter(|o| o.name != n.name)
                        .map(NameEntry::render)
                        .collect();
                    with_trailing(vec![
                        n.name.clone(),
                        n.dates.clone(),
                        n.kind.clone(),
                        n.role.clone(),
                        n.isni.clone(),
                        n.viaf.clone(),
                        delimiters.join_repeats(&others),
                    ])
                })
                .collect(),
            OutputFile::Titles => self
                .titles
                .iter()
                .map(|t| {
                    let others: Vec<&str> = self
                        .titles
                        .iter()
                        .filter(|o| *o != t)
                        .map(String::as_str)
                        .collect();
                    with_trailing(vec![t.clone(), delimiters.join_repeats(&others)])
                })
                .collect(),
            OutputFile::Topics => self
                .topics
                .iter()
                .map(|t| with_trailing(vec![t.topic.clone(), t.kind.clone()]))
                .collect(),
        }
    }
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        RecordView {
            id: record.id().to_string(),
            cells: record
                .master_cells()
                .map(|(code, cell)| (code, cell.to_string()))
                .collect(),
            names: record.names().to_vec(),
            titles: record.titles().to_vec(),
            topics: record.topics().to_vec(),
            identifiers: record.identifiers().to_vec(),
            languages: record.languages().to_vec(),
        }
    }
}

/// Writes Researcher Format files from a [`Store`].
#[derive(Debug)]
pub struct Exporter<'a> {
    store: &'a Store,
    delimiters: Delimiters,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Exporter {
            store,
            delimiters: RESEARCHER_FORMAT,
        }
    }

    /// Write the files of `plan` for `ids` into `out_dir`, creating it if
    /// needed. Every requested file gets its header row, even when `ids`
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be written, or if
    /// the store fails.
    pub fn export(
        &self,
        ids: &BTreeSet<RecordId>,
        plan: &ExportPlan,
        out_dir: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;

        let mut writers = Vec::with_capacity(plan.files.len());
        for &file in &plan.files {
            let path = out_dir.join(file.file_name());
            tracing::info!(path = %path.display(), "writing");
            let mut writer = csv_writer(&path)?;
            writer.write_record(plan.header(file))?;
            writers.push((file, writer));
        }

        let mut summary = ExportSummary {
            matched: ids.len(),
            rows: plan.files.iter().map(|&f| (f, 0)).collect(),
        };
        for id in ids {
            let Some(view) = RecordView::load(self.store, id)? else {
                tracing::warn!(id = %id, "selected record is not in the store");
                continue;
            };
            for (file, writer) in &mut writers {
                for row in view.rows(*file, plan, &self.delimiters) {
                    writer.write_record(&row)?;
                    *summary.rows.entry(*file).or_default() += 1;
                }
            }
        }
        for (_, writer) in &mut writers {
            writer.flush()?;
        }
        tracing::info!(matched = summary.matched, "export complete");
        Ok(summary)
    }
}

fn csv_writer(path: &Path) -> Result<Writer<File>> {
    let writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(codes: &[&str], files: &[OutputFile]) -> ExportPlan {
        let columns = codes
            .iter()
            .map(|c| Column::by_code(c).expect("known code"))
            .collect();
        ExportPlan::new(files.iter().copied(), &ColumnSet::Explicit(columns))
    }

    fn view() -> RecordView {
        let record = Record::builder("040-000123456")
            .field("TT", "Letters")
            .name(NameEntry {
                name: "Dickens, Charles".to_string(),
                dates: "1812-1870".to_string(),
                kind: "person".to_string(),
                role: "creator".to_string(),
                ..NameEntry::default()
            })
            .name(NameEntry::new("Collins, Wilkie"))
            .title("Letters")
            .title("Correspondence")
            .topic("London", "place")
            .topic("New York", "place")
            .build()
            .expect("valid record");
        RecordView::from(&record)
    }

    #[test]
    fn test_headers_skip_covered_columns() {
        let p = plan(&["ID", "AA", "TT", "SU"], &[OutputFile::Names]);
        assert_eq!(p.header(OutputFile::Records), vec!["BL record ID", "Name", "Title", "Topics"]);
        assert_eq!(
            p.header(OutputFile::Names),
            vec![
                "Name",
                "Dates associated with name",
                "Type of name",
                "Role",
                "ISNI",
                "VIAF",
                "Other names",
                "BL record ID",
                "Title",
                "Topics"
            ]
        );
        assert_eq!(
            p.header(OutputFile::Topics),
            vec!["Topic", "Type of topic", "BL record ID", "Name", "Title"]
        );
    }

    #[test]
    fn test_record_row_aggregates_categories() {
        let p = plan(&["ID", "SU", "AN"], &[OutputFile::Records]);
        let rows = view().rows(OutputFile::Records, &p, &RESEARCHER_FORMAT);
        assert_eq!(
            rows,
            vec![vec![
                "040-000123456".to_string(),
                "Dickens, Charles, 1812-1870 [creator] ; Collins, Wilkie".to_string(),
                "London ; New York".to_string(),
            ]]
        );
    }

    #[test]
    fn test_per_value_rows() {
        let p = plan(&["ID"], &[OutputFile::Topics]);
        let v = view();
        let topics = v.rows(OutputFile::Topics, &p, &RESEARCHER_FORMAT);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0], vec!["London", "place", "040-000123456"]);
        assert_eq!(topics[1], vec!["New York", "place", "040-000123456"]);

        let titles = v.rows(OutputFile::Titles, &p, &RESEARCHER_FORMAT);
        assert_eq!(titles[0], vec!["Letters", "Correspondence", "040-000123456"]);
        assert_eq!(titles[1], vec!["Correspondence", "Letters", "040-000123456"]);

        let names = v.rows(OutputFile::Names, &p, &RESEARCHER_FORMAT);
        assert_eq!(names[0][6], "Collins, Wilkie");
        assert_eq!(names[1][6], "Dickens, Charles, 1812-1870 [creator]");
    }

    #[test]
    fn test_summary_rows_in() {
        let summary = ExportSummary {
            matched: 1,
            rows: [(OutputFile::Topics, 2)].into(),
        };
        assert_eq!(summary.rows_in(OutputFile::Topics), 2);
        assert_eq!(summary.rows_in(OutputFile::Names), 0);
    }
}
