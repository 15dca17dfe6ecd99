//! Store schema: tables, indexes and build metadata.
//!
//! ```text
//! meta(key, value)
//! records(record_id, s_date1, s_date2, rf_<code> ...)
//! master_values(record_id, code, ordinal, value)
//! names(record_id, ordinal, value, dates, kind, role, isni, viaf)
//! titles(record_id, ordinal, value)
//! topics(record_id, ordinal, value, kind)
//! identifiers(record_id, ordinal, value, scheme)
//! languages(record_id, ordinal, value)
//! ```

use rusqlite::{params, Connection, OptionalExtension};

use crate::columns::Column;
use crate::error::Result;
use crate::record::Category;

/// Version written to `meta` and checked on open.
pub const SCHEMA_VERSION: &str = "2";

pub(crate) const KEY_VERSION: &str = "schema_version";
pub(crate) const KEY_STATE: &str = "state";
pub(crate) const KEY_RECORDS: &str = "record_count";

/// Whether a store file holds a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Ingestion in progress (or interrupted).
    Building,
    /// Ingestion finished and indexes built.
    Complete,
}

impl BuildState {
    /// Value stored under the `state` key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BuildState::Building => "building",
            BuildState::Complete => "complete",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "building" => Some(BuildState::Building),
            "complete" => Some(BuildState::Complete),
            _ => None,
        }
    }
}

/// Qualifier columns stored next to `value` in a category's child table.
#[must_use]
pub fn qualifier_columns(category: Category) -> &'static [&'static str] {
    match category {
        Category::Names => &["dates", "kind", "role", "isni", "viaf"],
        Category::Topics => &["kind"],
        Category::Identifiers => &["scheme"],
        Category::Titles | Category::Languages => &[],
    }
}

/// Quoted names of the master text columns, in catalogue order.
pub(crate) fn master_column_names() -> Vec<String> {
    Column::master_columns()
        .filter_map(Column::sql_name)
        .map(|name| format!("\"{name}\""))
        .collect()
}

/// Create every table in an empty database.
pub(crate) fn create(conn: &Connection) -> Result<()> {
    let mut ddl = String::from(
        "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);\n\
         CREATE TABLE records (record_id TEXT PRIMARY KEY, s_date1 INTEGER, s_date2 INTEGER",
    );
    for name in master_column_names() {
        ddl.push_str(", ");
        ddl.push_str(&name);
        ddl.push_str(" TEXT");
    }
    ddl.push_str(");\n");
    // One row per separate value of a master cell; the cell itself is the
    // joined display form and cannot be split back reliably.
    ddl.push_str(
        "CREATE TABLE master_values (record_id TEXT NOT NULL, code TEXT NOT NULL, \
         ordinal INTEGER NOT NULL, value TEXT NOT NULL, \
         PRIMARY KEY (record_id, code, ordinal));\n",
    );
    for category in Category::ALL {
        ddl.push_str(&format!(
            "CREATE TABLE {} (record_id TEXT NOT NULL, ordinal INTEGER NOT NULL, value TEXT NOT NULL",
            category.table()
        ));
        for qualifier in qualifier_columns(category) {
            ddl.push_str(&format!(", {qualifier} TEXT NOT NULL DEFAULT ''"));
        }
        ddl.push_str(", PRIMARY KEY (record_id, ordinal));\n");
    }
    conn.execute_batch(&ddl)?;
    set_meta(conn, KEY_VERSION, SCHEMA_VERSION)?;
    set_meta(conn, KEY_STATE, BuildState::Building.as_str())?;
    Ok(())
}

/// Build the lookup indexes. Done once, after the bulk load.
pub(crate) fn create_indexes(conn: &Connection) -> Result<()> {
    let mut ddl = String::from(
        "CREATE INDEX idx_records_s_date1 ON records (s_date1);\n\
         CREATE INDEX idx_records_s_date2 ON records (s_date2);\n\
         CREATE INDEX idx_master_values_code ON master_values (code, value);\n",
    );
    for category in Category::ALL {
        let table = category.table();
        ddl.push_str(&format!(
            "CREATE INDEX idx_{table}_value ON {table} (value);\n"
        ));
    }
    conn.execute_batch(&ddl)?;
    Ok(())
}

pub(crate) fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2) \
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

/// Build state of an open store, or `None` if the file has no usable
/// metadata (not a store, or a different schema version).
pub(crate) fn build_state(conn: &Connection) -> Option<BuildState> {
    let version = get_meta(conn, KEY_VERSION).ok()??;
    if version != SCHEMA_VERSION {
        return None;
    }
    get_meta(conn, KEY_STATE)
        .ok()?
        .as_deref()
        .and_then(BuildState::parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_state() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        create(&conn).expect("schema");
        assert_eq!(build_state(&conn), Some(BuildState::Building));
        set_meta(&conn, KEY_STATE, BuildState::Complete.as_str()).expect("meta");
        assert_eq!(build_state(&conn), Some(BuildState::Complete));
        create_indexes(&conn).expect("indexes");
    }

    #[test]
    fn test_master_columns_exist() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        create(&conn).expect("schema");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('records')",
                [],
                |row| row.get(0),
            )
            .expect("table info");
        assert_eq!(count as usize, 3 + Column::master_columns().count());
    }

    #[test]
    fn test_not_a_store() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert_eq!(build_state(&conn), None);
    }
}
