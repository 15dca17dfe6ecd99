//! The relational store.
//!
//! A store is one SQLite file: a `records` table with one row per record
//! (identifier, searchable years and one text column per master column) and
//! one child table per [`Category`](crate::record::Category), keyed by
//! `(record_id, ordinal)` so values come back in insertion order.
//!
//! - [`StoreWriter`] builds a store (write path, consumed by `finish`).
//! - [`Store`] opens a finished store read-only (read path).
//!
//! # Examples
//!
//! ```no_run
//! use iams2rf::record::Record;
//! use iams2rf::store::{Store, StoreWriter};
//!
//! let mut writer = StoreWriter::initialize("iams.db", true)?;
//! writer.insert(&Record::from_fields("040-000123456", [("Topics", "London")])?)?;
//! writer.finish()?;
//!
//! let store = Store::open("iams.db")?;
//! assert_eq!(store.len()?, 1);
//! # Ok::<(), iams2rf::Error>(())
//! ```

mod reader;
pub mod schema;
mod writer;

pub use reader::{MasterRow, Store};
pub use schema::{BuildState, SCHEMA_VERSION};
pub use writer::{partial_path, StoreWriter};
