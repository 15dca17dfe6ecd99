//! Snapshot to store: the `snapshot2sql` pipeline.
//!
//! # Examples
//!
//! ```no_run
//! use iams2rf::ingest::{ingest, IngestConfig};
//!
//! let summary = ingest("snapshot.csv", "iams.db", &IngestConfig::default().with_overwrite(true))?;
//! println!("{} records, {} skipped", summary.records, summary.skipped);
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::parser::{parse, ParseStats, ParserConfig};
use crate::store::StoreWriter;

/// Ingestion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Snapshot parser settings.
    pub parser: ParserConfig,
    /// Replace an existing store.
    pub overwrite: bool,
    /// Log progress every this many records; zero disables progress logs.
    pub batch_log_interval: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            overwrite: false,
            batch_log_interval: 10_000,
        }
    }
}

impl IngestConfig {
    /// Set the parser settings.
    #[must_use]
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Allow replacing an existing store.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the progress log interval.
    #[must_use]
    pub fn with_batch_log_interval(mut self, interval: usize) -> Self {
        self.batch_log_interval = interval;
        self
    }
}

/// What an ingestion run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Description units in the snapshot.
    pub units: usize,
    /// Records stored.
    pub records: usize,
    /// Units skipped as malformed.
    pub skipped: usize,
    /// Authorities indexed.
    pub authorities: usize,
    /// Cleaning, encoding and delimiter warnings.
    pub warnings: usize,
}

impl From<ParseStats> for IngestSummary {
    fn from(stats: ParseStats) -> Self {
        IngestSummary {
            units: stats.units,
            records: stats.records,
            skipped: stats.malformed,
            authorities: stats.authorities,
            warnings: stats.cleaning_warnings + stats.encoding_warnings + stats.delimiter_warnings,
        }
    }
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units, {} records stored, {} skipped, {} authorities, {} warnings",
            self.units, self.records, self.skipped, self.authorities, self.warnings
        )
    }
}

/// Parse `snapshot` and build a store at `store_path`.
///
/// Malformed units are skipped and counted. The store only appears at
/// `store_path` once every record is in and indexed.
///
/// # Errors
///
/// Returns [`Error::StoreExists`](crate::Error::StoreExists) if a store is
/// already there and `overwrite` is off,
/// [`Error::DuplicateRecord`](crate::Error::DuplicateRecord) if an
/// identifier repeats, or an IO/store error. Any error leaves no store
/// behind.
pub fn ingest(
    snapshot: impl AsRef<Path>,
    store_path: impl AsRef<Path>,
    config: &IngestConfig,
) -> Result<IngestSummary> {
    let mut writer = StoreWriter::initialize(store_path, config.overwrite)?;
    let mut parser = parse(snapshot, &config.parser)?;

    tracing::info!("loading records");
    for result in parser.by_ref() {
        match result {
            Ok(record) => {
                writer.insert(&record)?;
                if config.batch_log_interval > 0 && writer.records() % config.batch_log_interval == 0 {
                    tracing::info!(records = writer.records(), "records stored");
                }
            },
            Err(e) if e.is_recoverable() => {},
            Err(e) => return Err(e),
        }
    }

    let summary = IngestSummary::from(parser.stats());
    let stored = writer.finish()?;
    debug_assert_eq!(stored, summary.records);
    tracing::info!(%summary, "ingestion complete");
    Ok(summary)
}
