//! Pluggable snapshot grammars.
//!
//! The parser is written against the [`SnapshotFormat`] trait so that the
//! unit-splitting, statistics and delimiter checks are shared by every
//! source grammar.
//!
//! # Supported Formats
//!
//! | Format | Module | Description |
//! |--------|--------|-------------|
//! | IAMS Published Snapshot | `iams` | `{GUID},ID,…,STATUS,…<XML>` units, UTF-16LE |
//!
//! # Usage
//!
//! ```no_run
//! use iams2rf::formats::iams::IamsFormat;
//! use iams2rf::parser::{ParserConfig, SnapshotParser};
//! use std::fs::File;
//!
//! let file = File::open("snapshot.csv")?;
//! let parser = SnapshotParser::new(file, IamsFormat::default(), &ParserConfig::default())?;
//! for record in parser.filter_map(Result::ok) {
//!     println!("{}", record.id());
//! }
//! # Ok::<(), iams2rf::Error>(())
//! ```

mod traits;

pub use traits::{DecodeContext, SnapshotFormat};

/// IAMS Published Snapshot grammar.
pub mod iams {
    pub use crate::iams::IamsFormat;
}
