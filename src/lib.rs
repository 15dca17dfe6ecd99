#![warn(missing_docs)]

//! # iams2rf: IAMS to Researcher Format
//!
//! Converts the IAMS Published Snapshot (the bulk export of the archives and
//! manuscripts catalogue) into a SQLite store, and extracts selected records
//! from that store as Researcher Format CSV files.
//!
//! ## Quick Start
//!
//! ### Building a store
//!
//! ```no_run
//! use iams2rf::ingest::{ingest, IngestConfig};
//!
//! let summary = ingest("snapshot.csv", "iams.db", &IngestConfig::default())?;
//! println!("{summary}");
//! # Ok::<(), iams2rf::Error>(())
//! ```
//!
//! ### Extracting records
//!
//! ```no_run
//! use iams2rf::criteria::{Criterion, Operator};
//! use iams2rf::extract::extract;
//! use iams2rf::request::RequestSpec;
//!
//! let mut request = RequestSpec::default();
//! request.criteria = request
//!     .criteria
//!     .with_criterion(Criterion::new("Topics", Operator::Contains, ["London"]));
//! let summary = extract("iams.db", &request, "out")?;
//! println!("{} records exported", summary.matched);
//! # Ok::<(), iams2rf::Error>(())
//! ```
//!
//! ### Reading a snapshot directly
//!
//! ```no_run
//! use iams2rf::parser::{parse, ParserConfig};
//! use iams2rf::record::Category;
//!
//! for record in parse("snapshot.csv", &ParserConfig::default())? {
//!     let record = record?;
//!     println!("{}: {:?}", record.id(), record.values(Category::Topics));
//! }
//! # Ok::<(), iams2rf::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`record`], [`record_id`], [`columns`], [`delimiters`]: the record model
//! - [`encoding`], [`reader`], [`cleaning`], [`authority`], [`formats`], [`iams`], [`parser`]: snapshot parsing
//! - [`store`]: the SQLite store
//! - [`criteria`], [`selector`], [`request`], [`prompt`]: choosing records
//! - [`exporter`]: Researcher Format CSV output
//! - [`ingest`], [`extract`]: the two pipelines behind `snapshot2sql` and `sql2rf`
//! - [`error`]: error types and result type

pub mod authority;
pub mod cleaning;
pub mod columns;
pub mod criteria;
pub mod delimiters;
pub mod encoding;
pub mod error;
pub mod exporter;
pub mod extract;
/// Pluggable snapshot grammars.
///
/// See the [`formats`] module documentation for the trait and the shipped
/// IAMS implementation.
pub mod formats;
pub mod iams;
pub mod ingest;
pub mod parser;
pub mod prompt;
pub mod reader;
/// Records, categories and their entries.
pub mod record;
pub mod record_id;
pub mod request;
pub mod selector;
pub mod store;

pub use authority::{Authority, AuthorityIndex, AuthorityKind};
pub use columns::{Column, ColumnSet};
pub use criteria::{Criteria, Criterion, DateRange, Operator};
pub use delimiters::{Delimiters, RESEARCHER_FORMAT};
pub use encoding::SourceEncoding;
pub use error::{Error, ErrorKind, Result};
pub use exporter::{ExportPlan, ExportSummary, Exporter};
pub use formats::SnapshotFormat;
pub use iams::IamsFormat;
pub use ingest::{ingest, IngestConfig, IngestSummary};
pub use parser::{parse, ParseStats, ParserConfig, SnapshotParser};
pub use record::{Category, Record, RecordBuilder};
pub use record_id::{RecordId, RecordStatus, RecordType};
pub use request::{OutputFile, RequestSpec};
pub use selector::Selector;
pub use store::{Store, StoreWriter};
