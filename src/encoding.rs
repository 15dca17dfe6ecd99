//! Character encoding support for snapshot files.
//!
//! The IAMS Published Snapshot is exported as UTF-16LE. Some tool chains
//! re-save it as UTF-8, so the declared encoding is only a default: a
//! byte-order mark at the start of the file wins.
//!
//! Bytes that cannot be decoded become U+FFFD REPLACEMENT CHARACTER rather
//! than failing the run; the parser counts units containing replacements as
//! encoding warnings.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{Error, Result};

/// Character encoding of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    /// UTF-16 little endian (the IAMS default)
    #[default]
    Utf16Le,
    /// UTF-16 big endian
    Utf16Be,
    /// UTF-8
    Utf8,
}

impl SourceEncoding {
    /// The `encoding_rs` codec for this encoding.
    #[must_use]
    pub fn codec(self) -> &'static Encoding {
        match self {
            SourceEncoding::Utf16Le => UTF_16LE,
            SourceEncoding::Utf16Be => UTF_16BE,
            SourceEncoding::Utf8 => UTF_8,
        }
    }
}

impl FromStr for SourceEncoding {
    type Err = Error;

    /// Parse a WHATWG encoding label such as `utf-16le` or `utf8`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if the label is unknown or names an
    /// encoding the snapshot is never written in.
    fn from_str(label: &str) -> Result<Self> {
        let codec = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| Error::Encoding(format!("unknown encoding label '{label}'")))?;
        if codec == UTF_16LE {
            Ok(SourceEncoding::Utf16Le)
        } else if codec == UTF_16BE {
            Ok(SourceEncoding::Utf16Be)
        } else if codec == UTF_8 {
            Ok(SourceEncoding::Utf8)
        } else {
            Err(Error::Encoding(format!(
                "unsupported snapshot encoding {}",
                codec.name()
            )))
        }
    }
}

/// Streams decoded lines out of an encoded byte source.
///
/// Only one read buffer and the undelivered tail of decoded text are held in
/// memory, so arbitrarily large snapshots can be read line by line.
pub struct LineDecoder<R: Read> {
    inner: R,
    decoder: Decoder,
    buffer: Vec<u8>,
    text: String,
    pos: usize,
    eof: bool,
}

impl<R: Read> fmt::Debug for LineDecoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineDecoder")
            .field("encoding", &self.decoder.encoding().name())
            .field("buffered", &(self.text.len() - self.pos))
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl<R: Read> LineDecoder<R> {
    /// Create a line decoder. A byte-order mark in the input overrides
    /// `encoding`.
    pub fn new(inner: R, encoding: SourceEncoding, buffer_size: usize) -> Self {
        LineDecoder {
            inner,
            decoder: encoding.codec().new_decoder(),
            buffer: vec![0u8; buffer_size.max(64)],
            text: String::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Read the next line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `Ok(None)` at end of input. A final line without a terminator
    /// is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(offset) = memchr::memchr(b'\n', &self.text.as_bytes()[self.pos..]) {
                let end = self.pos + offset;
                let line = self.text[self.pos..end].trim_end_matches('\r').to_string();
                self.pos = end + 1;
                return Ok(Some(line));
            }
            if self.eof {
                if self.pos < self.text.len() {
                    let line = self.text[self.pos..].trim_end_matches('\r').to_string();
                    self.pos = self.text.len();
                    return Ok(Some(line));
                }
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        if self.pos > 0 {
            self.text.drain(..self.pos);
            self.pos = 0;
        }
        let n = loop {
            match self.inner.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
                Err(e) => return Err(Error::Io(e)),
            }
        };
        let last = n == 0;
        let needed = self
            .decoder
            .max_utf8_buffer_length(n)
            .ok_or_else(|| Error::Encoding("decoded chunk too large".to_string()))?;
        self.text.reserve(needed);
        let (result, read, replaced) =
            self.decoder
                .decode_to_string(&self.buffer[..n], &mut self.text, last);
        if result != CoderResult::InputEmpty || read != n {
            return Err(Error::Encoding(
                "decoder did not consume the whole chunk".to_string(),
            ));
        }
        if replaced {
            tracing::debug!("undecodable bytes replaced with U+FFFD");
        }
        self.eof = last;
        Ok(())
    }
}
