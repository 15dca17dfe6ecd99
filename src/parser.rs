//! Streaming snapshot parser.
//!
//! [`parse`] opens a snapshot, indexes its authorities in a first pass, then
//! returns a [`SnapshotParser`]: a forward-only iterator that decodes one
//! description unit at a time in a second pass. Malformed units are yielded
//! as [`Error::MalformedRecord`] and iteration continues; only an I/O failure
//! ends the run early.
//!
//! # Examples
//!
//! ```no_run
//! use iams2rf::parser::{parse, ParserConfig};
//!
//! let mut parser = parse("snapshot.csv", &ParserConfig::default())?;
//! for result in parser.by_ref() {
//!     match result {
//!         Ok(record) => println!("{}", record.id()),
//!         Err(e) if e.is_recoverable() => eprintln!("skipped: {e}"),
//!         Err(e) => return Err(e),
//!     }
//! }
//! let stats = parser.stats();
//! assert_eq!(stats.records + stats.malformed, stats.units);
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::authority::AuthorityIndex;
use crate::cleaning::Cleaner;
use crate::delimiters::{Delimiters, RESEARCHER_FORMAT};
use crate::encoding::SourceEncoding;
use crate::error::Result;
use crate::formats::{DecodeContext, SnapshotFormat};
use crate::iams::IamsFormat;
use crate::reader::UnitReader;
use crate::record::Record;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Declared encoding of the snapshot; a byte-order mark overrides it.
    pub encoding: SourceEncoding,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            encoding: SourceEncoding::Utf16Le,
            buffer_size: 256 * 1024, // 256 KB
        }
    }
}

impl ParserConfig {
    /// Set the declared encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

/// Counters kept while parsing.
///
/// `records + malformed == units` holds at every point of the iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Description units encountered, plus authority units too truncated
    /// to index.
    pub units: usize,
    /// Units decoded into records.
    pub records: usize,
    /// Units skipped as malformed.
    pub malformed: usize,
    /// Authority units indexed in the first pass.
    pub authorities: usize,
    /// Values the cleaning rules left as-is.
    pub cleaning_warnings: usize,
    /// Description units containing undecodable bytes.
    pub encoding_warnings: usize,
    /// Category values with misplaced delimiter characters.
    pub delimiter_warnings: usize,
}

/// Open `path` and parse it as an IAMS Published Snapshot.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read during the
/// authority pass.
pub fn parse(path: impl AsRef<Path>, config: &ParserConfig) -> Result<SnapshotParser<File>> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "opening snapshot");
    SnapshotParser::new(File::open(path)?, IamsFormat::new(), config)
}

/// Iterator over the records of a snapshot.
#[derive(Debug)]
pub struct SnapshotParser<R: Read + Seek, F: SnapshotFormat = IamsFormat> {
    units: UnitReader<R, F>,
    format: F,
    authorities: AuthorityIndex,
    cleaner: Cleaner,
    delimiters: Delimiters,
    stats: ParseStats,
    finished: bool,
}

impl<R: Read + Seek, F: SnapshotFormat> SnapshotParser<R, F> {
    /// Index the authorities in `source`, rewind it and prepare to decode.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or rewinding the source fails.
    pub fn new(mut source: R, format: F, config: &ParserConfig) -> Result<Self> {
        let mut cleaner = Cleaner::new();
        let mut authorities = AuthorityIndex::new();
        let mut stats = ParseStats::default();

        tracing::info!("indexing authorities");
        {
            let mut units =
                UnitReader::new(&mut source, format.clone(), config.encoding, config.buffer_size);
            while let Some(unit) = units.read_unit()? {
                if let Some((id, authority)) = format.scan_authority(&unit, &mut cleaner) {
                    tracing::debug!(id = %id, heading = %authority.heading(), "indexed authority");
                    authorities.insert(id, authority);
                    stats.authorities += 1;
                }
            }
        }
        tracing::info!(authorities = stats.authorities, "authority index built");

        source.seek(SeekFrom::Start(0))?;
        Ok(SnapshotParser {
            units: UnitReader::new(source, format.clone(), config.encoding, config.buffer_size),
            format,
            authorities,
            cleaner,
            delimiters: RESEARCHER_FORMAT,
            stats,
            finished: false,
        })
    }

    /// Statistics so far.
    #[must_use]
    pub fn stats(&self) -> ParseStats {
        ParseStats {
            cleaning_warnings: self.cleaner.warnings(),
            ..self.stats
        }
    }

    /// The authority index built by the first pass.
    #[must_use]
    pub fn authorities(&self) -> &AuthorityIndex {
        &self.authorities
    }

    fn check_delimiters(&mut self, record: &Record) {
        let values = record
            .names()
            .iter()
            .map(|n| n.name.as_str())
            .chain(record.titles().iter().map(String::as_str))
            .chain(record.topics().iter().map(|t| t.topic.as_str()))
            .chain(record.identifiers().iter().map(|i| i.value.as_str()))
            .chain(record.languages().iter().map(String::as_str));
        for value in values {
            if let Err(anomaly) = self.delimiters.check_value(value) {
                self.stats.delimiter_warnings += 1;
                tracing::warn!(id = %record.id(), value, %anomaly, "delimiter anomaly kept for review");
            }
        }
        // Master cells are often prose, so these go to debug.
        for (code, values) in record.master_value_lists() {
            for value in values {
                if let Err(anomaly) = self.delimiters.check_value(value) {
                    self.stats.delimiter_warnings += 1;
                    tracing::debug!(id = %record.id(), column = code, value = %value, %anomaly, "delimiter anomaly in master cell kept for review");
                }
            }
        }
    }
}

impl<R: Read + Seek, F: SnapshotFormat> Iterator for SnapshotParser<R, F> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let unit = match self.units.read_unit() {
                Ok(Some(unit)) => unit,
                Ok(None) => {
                    self.finished = true;
                    return None;
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                },
            };
            let mut ctx = DecodeContext {
                authorities: &self.authorities,
                cleaner: &mut self.cleaner,
            };
            match self.format.decode_unit(&unit, &mut ctx) {
                Ok(None) => continue,
                Ok(Some(record)) => {
                    self.stats.units += 1;
                    self.stats.records += 1;
                    if unit.text.contains('\u{FFFD}') {
                        self.stats.encoding_warnings += 1;
                        tracing::warn!(id = %record.id(), "unit contains undecodable bytes");
                    }
                    self.check_delimiters(&record);
                    tracing::debug!(id = %record.id(), "decoded record");
                    return Some(Ok(record));
                },
                Err(e) => {
                    if !e.is_recoverable() {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    self.stats.units += 1;
                    self.stats.malformed += 1;
                    if unit.text.contains('\u{FFFD}') {
                        self.stats.encoding_warnings += 1;
                    }
                    tracing::warn!(error = %e, "skipping malformed unit");
                    return Some(Err(e));
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Category;
    use std::io::Cursor;

    fn snapshot(units: &[&str]) -> Cursor<Vec<u8>> {
        let text = units.join("\r\n");
        Cursor::new(text.encode_utf16().flat_map(u16::to_le_bytes).collect())
    }

    fn run(units: &[&str]) -> (Vec<Result<Record>>, ParseStats) {
        let mut parser =
            SnapshotParser::new(snapshot(units), IamsFormat::new(), &ParserConfig::default())
                .expect("parser");
        let results: Vec<_> = parser.by_ref().collect();
        (results, parser.stats())
    }

    const PLACE: &str = "{A},048-000000001,x,4,<Place><Name>London</Name></Place>";

    #[test]
    fn test_empty_snapshot() {
        let (results, stats) = run(&[]);
        assert!(results.is_empty());
        assert_eq!(stats, ParseStats::default());
    }

    #[test]
    fn test_counts_with_malformed_and_truncated_units() {
        let (results, stats) = run(&[
            "preamble",
            PLACE,
            "{B},040-000000001,x,4,<ArchiveDescription><Title>One</Title>",
            "<RelatedArchiveDescriptionPlace TargetNumber=\"048-000000001\"></RelatedArchiveDescriptionPlace>",
            "</ArchiveDescription>",
            "{C},not-an-id,x,4,<ArchiveDescription></ArchiveDescription>",
            "{D},040-000000002,x,4,<ArchiveDescription><Title>Two",
        ]);
        assert_eq!(results.len(), 3);
        assert_eq!(stats.units, 3);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.authorities, 1);
        assert_eq!(stats.records + stats.malformed, stats.units);

        let record = results[0].as_ref().expect("first unit decodes");
        assert_eq!(record.values(Category::Topics), vec!["London"]);
        assert!(results[1].is_err());
        assert!(results[2].is_err());
    }

    #[test]
    fn test_truncated_authority_is_counted() {
        let (results, stats) = run(&[
            PLACE,
            "{B},040-000000001,x,4,<ArchiveDescription><Title>One</Title></ArchiveDescription>",
            "{P},048-000000002,x,4,<Place><Name>Paris",
        ]);
        assert_eq!(stats.authorities, 1);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.records + stats.malformed, stats.units);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_master_cell_anomalies_are_counted() {
        let (results, stats) = run(&[
            "{B},040-000000001,x,4,<ArchiveDescription><Extent>2 volumes; 1 box</Extent></ArchiveDescription>",
        ]);
        assert_eq!(stats.delimiter_warnings, 1);
        let record = results[0].as_ref().expect("decodes");
        assert_eq!(record.master_values("DS"), ["2 volumes; 1 box"]);
    }

    #[test]
    fn test_delimiter_anomalies_are_counted_and_kept() {
        let (results, stats) = run(&[
            "{S},049-000000003,x,4,<Subject><Entry>Civil rights---History</Entry></Subject>",
            "{B},040-000000001,x,4,<ArchiveDescription>\
             <RelatedArchiveDescriptionSubject TargetNumber=\"049-000000003\"></RelatedArchiveDescriptionSubject>\
             </ArchiveDescription>",
        ]);
        assert_eq!(stats.delimiter_warnings, 1);
        let record = results[0].as_ref().expect("decodes");
        assert_eq!(record.values(Category::Topics), vec!["Civil rights---History"]);
    }

    #[test]
    fn test_encoding_warnings() {
        let mut bytes: Vec<u8> = "{B},040-000000001,x,4,<ArchiveDescription><Title>A"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        // Unpaired surrogate.
        bytes.extend_from_slice(&[0x00, 0xD8]);
        bytes.extend(
            "</Title></ArchiveDescription>"
                .encode_utf16()
                .flat_map(u16::to_le_bytes),
        );
        let mut parser =
            SnapshotParser::new(Cursor::new(bytes), IamsFormat::new(), &ParserConfig::default())
                .expect("parser");
        let results: Vec<_> = parser.by_ref().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        assert_eq!(parser.stats().encoding_warnings, 1);
    }

    #[test]
    fn test_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(
            "{B},040-000000001,x,4,<ArchiveDescription><Title>Caf\u{e9}</Title></ArchiveDescription>"
                .as_bytes(),
        );
        let mut parser =
            SnapshotParser::new(Cursor::new(bytes), IamsFormat::new(), &ParserConfig::default())
                .expect("parser");
        let record = parser.next().expect("one record").expect("decodes");
        assert_eq!(record.master("TT"), Some("Caf\u{e9}"));
    }
}
