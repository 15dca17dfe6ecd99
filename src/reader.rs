//! Splitting a decoded snapshot into units.
//!
//! A unit is one catalogue entity: a start line recognised by the
//! [`SnapshotFormat`] plus every continuation line up to the next start line.
//! Lines are trimmed and joined with a single space. Anything before the first
//! start line is preamble and is dropped.
//!
//! # Examples
//!
//! ```
//! use iams2rf::encoding::SourceEncoding;
//! use iams2rf::formats::iams::IamsFormat;
//! use iams2rf::reader::UnitReader;
//! use std::io::Cursor;
//!
//! let data = "preamble\n{A},041-000000001,x,4,<Item>\n</Item>\n";
//! let mut reader = UnitReader::new(
//!     Cursor::new(data.as_bytes().to_vec()),
//!     IamsFormat::default(),
//!     SourceEncoding::Utf8,
//!     4096,
//! );
//! let unit = reader.read_unit()?.expect("one unit");
//! assert_eq!(unit.text, "{A},041-000000001,x,4,<Item> </Item>");
//! assert!(reader.read_unit()?.is_none());
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::io::Read;

use crate::encoding::{LineDecoder, SourceEncoding};
use crate::error::Result;
use crate::formats::SnapshotFormat;

/// One undecoded unit of snapshot text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// One-based position of the unit in the file.
    pub position: usize,
    /// The unit's lines, trimmed and joined with spaces.
    pub text: String,
}

/// Streams [`RawUnit`]s out of an encoded snapshot.
#[derive(Debug)]
pub struct UnitReader<R: Read, F: SnapshotFormat> {
    lines: LineDecoder<R>,
    format: F,
    pending: Option<String>,
    units_read: usize,
    exhausted: bool,
}

impl<R: Read, F: SnapshotFormat> UnitReader<R, F> {
    /// Create a unit reader over `source`.
    pub fn new(source: R, format: F, encoding: SourceEncoding, buffer_size: usize) -> Self {
        UnitReader {
            lines: LineDecoder::new(source, encoding, buffer_size),
            format,
            pending: None,
            units_read: 0,
            exhausted: false,
        }
    }

    /// Read the next unit.
    ///
    /// Returns `Ok(None)` once the input is exhausted. The last unit of the
    /// file is returned even when it is truncated; recognising truncation is
    /// the format's job.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn read_unit(&mut self) -> Result<Option<RawUnit>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut text = match self.pending.take() {
            Some(start) => start,
            None => loop {
                match self.lines.read_line()? {
                    Some(line) => {
                        let line = line.trim();
                        if self.format.is_unit_start(line) {
                            break line.to_string();
                        }
                    },
                    None => {
                        self.exhausted = true;
                        return Ok(None);
                    },
                }
            },
        };
        loop {
            match self.lines.read_line()? {
                Some(line) => {
                    let line = line.trim();
                    if self.format.is_unit_start(line) {
                        self.pending = Some(line.to_string());
                        break;
                    }
                    if !line.is_empty() {
                        text.push(' ');
                        text.push_str(line);
                    }
                },
                None => {
                    self.exhausted = true;
                    break;
                },
            }
        }
        self.units_read += 1;
        Ok(Some(RawUnit {
            position: self.units_read,
            text,
        }))
    }

    /// Number of units read so far.
    #[must_use]
    pub fn units_read(&self) -> usize {
        self.units_read
    }
}
