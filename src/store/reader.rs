//! Read path: indexed lookups over a completed store.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};

use super::schema::{self, BuildState};
use crate::columns::Column;
use crate::error::{Error, Result};
use crate::record::{Category, IdentifierEntry, NameEntry, Record, TopicEntry};
use crate::record_id::RecordId;

/// The stored master row of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRow {
    /// Record identifier.
    pub id: RecordId,
    /// First year of the record's date range.
    pub start_year: Option<i32>,
    /// Last year of the record's date range.
    pub end_year: Option<i32>,
    /// Non-empty master cells keyed by column code, in catalogue order.
    pub cells: IndexMap<&'static str, String>,
}

impl MasterRow {
    /// The cell for a column code; empty when the record has none.
    #[must_use]
    pub fn cell(&self, code: &str) -> &str {
        self.cells.get(code).map_or("", String::as_str)
    }
}

/// Read-only handle on a completed store.
///
/// # Examples
///
/// ```no_run
/// use iams2rf::record::Category;
/// use iams2rf::store::Store;
///
/// let store = Store::open("iams.db")?;
/// for id in store.record_ids()? {
///     let topics = store.topics(&id)?;
///     println!("{id}: {} topics", topics.len());
/// }
/// let london = store.ids_with_value(Category::Topics, "London")?;
/// # let _ = london;
/// # Ok::<(), iams2rf::Error>(())
/// ```
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open the store at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreNotFound`] if there is no file at `path`, and
    /// [`Error::StoreIncomplete`] if the file is not a finished build.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::StoreNotFound { path });
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        if schema::build_state(&conn) != Some(BuildState::Complete) {
            return Err(Error::StoreIncomplete { path });
        }
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Store { conn, path })
    }

    /// Location of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every identifier, ascending.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn record_ids(&self) -> Result<BTreeSet<RecordId>> {
        let mut stmt = self.conn.prepare_cached("SELECT record_id FROM records")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        to_ids(ids)
    }

    /// Whether `id` is stored.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn contains(&self, id: &RecordId) -> Result<bool> {
        let found = self
            .conn
            .prepare_cached("SELECT 1 FROM records WHERE record_id = ?1")?
            .exists(params![id.as_str()])?;
        Ok(found)
    }

    /// The master row of `id`, if stored.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn master_row(&self, id: &RecordId) -> Result<Option<MasterRow>> {
        let sql = format!(
            "SELECT s_date1, s_date2, {} FROM records WHERE record_id = ?1",
            schema::master_column_names().join(", ")
        );
        let row = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![id.as_str()], |row| {
                let mut cells = IndexMap::new();
                for (i, column) in Column::master_columns().enumerate() {
                    if let Some(cell) = row.get::<_, Option<String>>(i + 2)? {
                        if !cell.is_empty() {
                            cells.insert(column.code, cell);
                        }
                    }
                }
                Ok(MasterRow {
                    id: id.clone(),
                    start_year: row.get(0)?,
                    end_year: row.get(1)?,
                    cells,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Names of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn names(&self, id: &RecordId) -> Result<Vec<NameEntry>> {
        self.children(
            "SELECT value, dates, kind, role, isni, viaf FROM names \
             WHERE record_id = ?1 ORDER BY ordinal",
            id,
            |row| {
                Ok(NameEntry {
                    name: row.get(0)?,
                    dates: row.get(1)?,
                    kind: row.get(2)?,
                    role: row.get(3)?,
                    isni: row.get(4)?,
                    viaf: row.get(5)?,
                })
            },
        )
    }

    /// Titles of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn titles(&self, id: &RecordId) -> Result<Vec<String>> {
        self.values(Category::Titles, id)
    }

    /// Topics of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn topics(&self, id: &RecordId) -> Result<Vec<TopicEntry>> {
        self.children(
            "SELECT value, kind FROM topics WHERE record_id = ?1 ORDER BY ordinal",
            id,
            |row| {
                Ok(TopicEntry {
                    topic: row.get(0)?,
                    kind: row.get(1)?,
                })
            },
        )
    }

    /// Identifiers of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn identifiers(&self, id: &RecordId) -> Result<Vec<IdentifierEntry>> {
        self.children(
            "SELECT value, scheme FROM identifiers WHERE record_id = ?1 ORDER BY ordinal",
            id,
            |row| {
                Ok(IdentifierEntry {
                    value: row.get(0)?,
                    scheme: row.get(1)?,
                })
            },
        )
    }

    /// Languages of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn languages(&self, id: &RecordId) -> Result<Vec<String>> {
        self.values(Category::Languages, id)
    }

    /// Raw values of one category of `id`, in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn values(&self, category: Category, id: &RecordId) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT value FROM {} WHERE record_id = ?1 ORDER BY ordinal",
            category.table()
        );
        self.children(&sql, id, |row| row.get(0))
    }

    /// `(code, value)` pairs behind the master cells of `id`, each column's
    /// values in source order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn master_values(&self, id: &RecordId) -> Result<Vec<(String, String)>> {
        self.children(
            "SELECT code, value FROM master_values WHERE record_id = ?1 ORDER BY code, ordinal",
            id,
            pair,
        )
    }

    /// Reassemble the stored form of `id` as a [`Record`].
    ///
    /// Publication status is kept only as the `SX` cell.
    ///
    /// # Errors
    ///
    /// Returns a store error if a query fails.
    pub fn record(&self, id: &RecordId) -> Result<Option<Record>> {
        let Some(row) = self.master_row(id)? else {
            return Ok(None);
        };
        let mut builder = Record::builder(id.as_str()).years(row.start_year, row.end_year);
        for (code, value) in self.master_values(id)? {
            builder = builder.field(&code, value);
        }
        for name in self.names(id)? {
            builder = builder.name(name);
        }
        for title in self.titles(id)? {
            builder = builder.title(title);
        }
        for topic in self.topics(id)? {
            builder = builder.topic(topic.topic, topic.kind);
        }
        for identifier in self.identifiers(id)? {
            builder = builder.identifier(identifier.value, identifier.scheme);
        }
        for language in self.languages(id)? {
            builder = builder.language(language);
        }
        builder.build().map(Some)
    }

    /// Records holding `value` exactly, as a whole, in `category`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn ids_with_value(&self, category: Category, value: &str) -> Result<BTreeSet<RecordId>> {
        let sql = format!(
            "SELECT DISTINCT record_id FROM {} WHERE value = ?1",
            category.table()
        );
        let ids = self
            .conn
            .prepare_cached(&sql)?
            .query_map(params![value], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        to_ids(ids)
    }

    /// `(id, value)` pairs of `category` that may contain `pattern`.
    ///
    /// The result is a superset: the store matches ASCII case-insensitively
    /// and returns every row when `pattern` is not ASCII. Callers apply the
    /// exact comparison.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn category_candidates(
        &self,
        category: Category,
        pattern: &str,
    ) -> Result<Vec<(RecordId, String)>> {
        let table = category.table();
        self.candidates(
            &format!("SELECT record_id, value FROM {table}"),
            &format!("SELECT record_id, value FROM {table} WHERE value LIKE ?1 ESCAPE '\\'"),
            &[],
            pattern,
        )
    }

    /// `(id, rendered)` pairs of names whose `Name, dates [role]` form may
    /// contain `pattern`, with the same superset rule as
    /// [`category_candidates`](Self::category_candidates).
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn rendered_name_candidates(&self, pattern: &str) -> Result<Vec<(RecordId, String)>> {
        let rendered = "SELECT record_id, value \
             || CASE WHEN dates <> '' THEN ', ' || dates ELSE '' END \
             || CASE WHEN role <> '' THEN ' [' || role || ']' ELSE '' END AS rendered \
             FROM names";
        self.candidates(
            rendered,
            &format!("SELECT record_id, rendered FROM ({rendered}) WHERE rendered LIKE ?1 ESCAPE '\\'"),
            &[],
            pattern,
        )
    }

    /// `(id, value)` pairs of a master column that may contain `pattern`.
    ///
    /// Each separate value of a cell is its own pair, so a value holding the
    /// repeat delimiter is never cut in two. Same superset rule as
    /// [`category_candidates`](Self::category_candidates). Columns not stored
    /// on the master table yield nothing.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn column_candidates(
        &self,
        column: &Column,
        pattern: &str,
    ) -> Result<Vec<(RecordId, String)>> {
        if column.sql_name().is_none() {
            return Ok(Vec::new());
        }
        self.candidates(
            "SELECT record_id, value FROM master_values WHERE code = ?1",
            "SELECT record_id, value FROM master_values WHERE code = ?1 AND value LIKE ?2 ESCAPE '\\'",
            &[column.code],
            pattern,
        )
    }

    /// Records whose date range overlaps `from..=to`.
    ///
    /// Either bound may be open. `from` is tested against the end year and
    /// `to` against the start year; a record lacking the year a bound tests
    /// does not match that bound.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub fn ids_in_date_range(&self, from: Option<i32>, to: Option<i32>) -> Result<BTreeSet<RecordId>> {
        let ids = self
            .conn
            .prepare_cached(
                "SELECT record_id FROM records \
                 WHERE (?1 IS NULL OR s_date2 >= ?1) AND (?2 IS NULL OR s_date1 <= ?2)",
            )?
            .query_map(params![from, to], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        to_ids(ids)
    }

    fn children<T, F>(&self, sql: &str, id: &RecordId, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let rows = self
            .conn
            .prepare_cached(sql)?
            .query_map(params![id.as_str()], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Run `like` with `scope` then the escaped pattern bound, or `all` with
    /// only `scope` bound when the pattern is not ASCII.
    fn candidates(
        &self,
        all: &str,
        like: &str,
        scope: &[&str],
        pattern: &str,
    ) -> Result<Vec<(RecordId, String)>> {
        let mut stmt;
        let rows = if pattern.is_ascii() {
            let mut args: Vec<String> = scope.iter().map(ToString::to_string).collect();
            args.push(like_pattern(pattern));
            stmt = self.conn.prepare_cached(like)?;
            stmt.query_map(params_from_iter(args), pair)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            stmt = self.conn.prepare_cached(all)?;
            stmt.query_map(params_from_iter(scope), pair)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        rows.into_iter()
            .map(|(id, value)| Ok((RecordId::parse(&id)?, value)))
            .collect()
    }
}

fn pair(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn to_ids(ids: Vec<String>) -> Result<BTreeSet<RecordId>> {
    ids.iter().map(|id| RecordId::parse(id)).collect()
}

/// `%pattern%` with LIKE wildcards escaped.
fn like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('%');
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
