//! Write path: building a store from decoded records.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::schema::{self, BuildState};
use crate::columns::Column;
use crate::error::{Error, Result};
use crate::record::Record;

/// Location of the in-progress build for a store at `path`.
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Builds a store in a `.partial` file and moves it into place on
/// [`finish`](StoreWriter::finish).
///
/// Dropping a writer without finishing it deletes the partial file, so an
/// aborted ingestion never leaves a queryable store behind.
///
/// # Examples
///
/// ```no_run
/// use iams2rf::record::Record;
/// use iams2rf::store::StoreWriter;
///
/// let mut writer = StoreWriter::initialize("iams.db", true)?;
/// writer.insert(&Record::from_fields("040-000123456", [("TT", "Letters")])?)?;
/// let records = writer.finish()?;
/// assert_eq!(records, 1);
/// # Ok::<(), iams2rf::Error>(())
/// ```
#[derive(Debug)]
pub struct StoreWriter {
    conn: Option<Connection>,
    path: PathBuf,
    partial: PathBuf,
    insert_record: String,
    records: usize,
}

impl StoreWriter {
    /// Start a fresh store build for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreExists`] if `path` exists and `overwrite` is
    /// false, or a store error if the partial file cannot be created.
    pub fn initialize(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() && !overwrite {
            return Err(Error::StoreExists { path });
        }
        let partial = partial_path(&path);
        if partial.exists() {
            tracing::warn!(path = %partial.display(), "removing stale partial build");
            fs::remove_file(&partial)?;
        }

        let conn = Connection::open(&partial)?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        schema::create(&conn)?;
        tracing::info!(path = %path.display(), "store build started");

        let columns = schema::master_column_names();
        let placeholders: Vec<String> = (1..=columns.len() + 3).map(|i| format!("?{i}")).collect();
        let insert_record = format!(
            "INSERT INTO records (record_id, s_date1, s_date2, {}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        Ok(StoreWriter {
            conn: Some(conn),
            path,
            partial,
            insert_record,
            records: 0,
        })
    }

    /// Final location of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records inserted so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or_else(|| Error::StoreIncomplete {
            path: self.partial.clone(),
        })
    }

    /// Insert one record: its master row and every category row, in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] if the identifier is already in
    /// the store, or a store error if the insert fails.
    pub fn insert(&mut self, record: &Record) -> Result<()> {
        let id = record.id().as_str();
        let master = master_row(record);
        let insert_record = self.insert_record.clone();
        let tx = self.connection()?.transaction()?;
        {
            let exists = tx
                .prepare_cached("SELECT 1 FROM records WHERE record_id = ?1")?
                .exists(params![id])?;
            if exists {
                return Err(Error::DuplicateRecord { id: id.to_string() });
            }
            tx.prepare_cached(&insert_record)?
                .execute(params_from_iter(master))?;

            let mut stmt = tx.prepare_cached(
                "INSERT INTO master_values (record_id, code, ordinal, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (code, values) in record.master_value_lists() {
                for (ordinal, value) in values.iter().enumerate() {
                    stmt.execute(params![id, code, ordinal, value])?;
                }
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO names (record_id, ordinal, value, dates, kind, role, isni, viaf) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (ordinal, n) in record.names().iter().enumerate() {
                stmt.execute(params![id, ordinal, n.name, n.dates, n.kind, n.role, n.isni, n.viaf])?;
            }

            let mut stmt =
                tx.prepare_cached("INSERT INTO titles (record_id, ordinal, value) VALUES (?1, ?2, ?3)")?;
            for (ordinal, title) in record.titles().iter().enumerate() {
                stmt.execute(params![id, ordinal, title])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO topics (record_id, ordinal, value, kind) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (ordinal, t) in record.topics().iter().enumerate() {
                stmt.execute(params![id, ordinal, t.topic, t.kind])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO identifiers (record_id, ordinal, value, scheme) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (ordinal, i) in record.identifiers().iter().enumerate() {
                stmt.execute(params![id, ordinal, i.value, i.scheme])?;
            }

            let mut stmt = tx
                .prepare_cached("INSERT INTO languages (record_id, ordinal, value) VALUES (?1, ?2, ?3)")?;
            for (ordinal, language) in record.languages().iter().enumerate() {
                stmt.execute(params![id, ordinal, language])?;
            }
        }
        tx.commit()?;
        self.records += 1;
        Ok(())
    }

    /// Build indexes, mark the store complete and move it into place.
    ///
    /// Returns the number of records stored.
    ///
    /// # Errors
    ///
    /// Returns an error if indexing, closing or renaming fails; the partial
    /// file is removed in that case.
    pub fn finish(mut self) -> Result<usize> {
        tracing::info!(records = self.records, "building store indexes");
        let records = self.records;
        {
            let conn = self.connection()?;
            schema::create_indexes(conn)?;
            schema::set_meta(conn, schema::KEY_RECORDS, &records.to_string())?;
            schema::set_meta(conn, schema::KEY_STATE, BuildState::Complete.as_str())?;
        }
        if let Some(conn) = self.conn.take() {
            if let Err((conn, e)) = conn.close() {
                self.conn = Some(conn);
                return Err(e.into());
            }
        }
        if let Err(e) = fs::rename(&self.partial, &self.path) {
            let _ = fs::remove_file(&self.partial);
            return Err(e.into());
        }
        tracing::info!(path = %self.path.display(), records, "store complete");
        Ok(records)
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        // A live connection here means finish() never ran to completion.
        if let Some(conn) = self.conn.take() {
            drop(conn);
            match fs::remove_file(&self.partial) {
                Ok(()) => {
                    tracing::warn!(path = %self.partial.display(), "store build abandoned");
                },
                Err(e) => {
                    tracing::warn!(path = %self.partial.display(), error = %e, "could not remove partial build");
                },
            }
        }
    }
}

/// Bind values for the master insert: identifier, years, then one value per
/// master column (`NULL` when the record has no cell).
fn master_row(record: &Record) -> Vec<Value> {
    let year = |y: Option<i32>| y.map_or(Value::Null, |y| Value::Integer(i64::from(y)));
    let mut values = Vec::with_capacity(Column::master_columns().count() + 3);
    values.push(Value::Text(record.id().as_str().to_string()));
    values.push(year(record.start_year()));
    values.push(year(record.end_year()));
    for column in Column::master_columns() {
        values.push(
            record
                .master(column.code)
                .map_or(Value::Null, |cell| Value::Text(cell.to_string())),
        );
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> Record {
        Record::from_fields(id, [("TT", "Letters"), ("Topics", "London")]).expect("valid record")
    }

    #[test]
    fn test_build_and_finish() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("iams.db");
        let mut writer = StoreWriter::initialize(&path, false).expect("init");
        assert!(partial_path(&path).exists());
        assert!(!path.exists());
        writer.insert(&record("040-000000001")).expect("insert");
        writer.insert(&record("040-000000002")).expect("insert");
        assert_eq!(writer.finish().expect("finish"), 2);
        assert!(path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_existing_store_needs_overwrite() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("iams.db");
        fs::write(&path, b"old").expect("write");
        let err = StoreWriter::initialize(&path, false).expect_err("exists");
        assert!(matches!(err, Error::StoreExists { .. }));
        assert!(StoreWriter::initialize(&path, true).is_ok());
    }

    #[test]
    fn test_duplicate_aborts_and_drop_removes_partial() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("iams.db");
        let mut writer = StoreWriter::initialize(&path, false).expect("init");
        writer.insert(&record("040-000000001")).expect("insert");
        let err = writer.insert(&record("040-000000001")).expect_err("duplicate");
        assert!(matches!(err, Error::DuplicateRecord { ref id } if id == "040-000000001"));
        drop(writer);
        assert!(!partial_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/iams.db")),
            PathBuf::from("/tmp/iams.db.partial")
        );
    }
}
