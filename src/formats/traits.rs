//! The snapshot grammar trait.
//!
//! A [`SnapshotFormat`] knows three things about a source export: where one
//! unit ends and the next begins, how to recognise and index authority units,
//! and how to turn a description unit into a [`Record`]. Everything else
//! (decoding, unit buffering, statistics, delimiter checks) is shared and
//! lives in [`crate::reader`] and [`crate::parser`].
//!
//! # Example
//!
//! ```ignore
//! use iams2rf::formats::{DecodeContext, SnapshotFormat};
//! use iams2rf::reader::RawUnit;
//!
//! fn decode_all<F: SnapshotFormat>(format: &F, units: &[RawUnit], ctx: &mut DecodeContext<'_>) {
//!     for unit in units {
//!         match format.decode_unit(unit, ctx) {
//!             Ok(Some(record)) => println!("{}", record.id()),
//!             Ok(None) => {},
//!             Err(e) => eprintln!("{e}"),
//!         }
//!     }
//! }
//! ```

use crate::authority::{Authority, AuthorityIndex};
use crate::cleaning::Cleaner;
use crate::error::Result;
use crate::reader::RawUnit;
use crate::record::Record;
use crate::record_id::RecordId;

/// Shared state handed to [`SnapshotFormat::decode_unit`].
#[derive(Debug)]
pub struct DecodeContext<'a> {
    /// Authorities indexed in the first pass.
    pub authorities: &'a AuthorityIndex,
    /// Value cleaner; its warning count ends up in the parse statistics.
    pub cleaner: &'a mut Cleaner,
}

/// A source grammar for snapshot exports.
///
/// Implementations must be cheap to clone: the parser hands a copy to each
/// pass over the file.
pub trait SnapshotFormat: std::fmt::Debug + Clone {
    /// Whether `line` begins a new unit. Lines before the first unit start
    /// are preamble and are skipped.
    fn is_unit_start(&self, line: &str) -> bool;

    /// Index pass: return the authority carried by `unit`, or `None` when the
    /// unit is not an authority (or cannot be read as one).
    fn scan_authority(&self, unit: &RawUnit, cleaner: &mut Cleaner)
        -> Option<(RecordId, Authority)>;

    /// Decode a unit into a record.
    ///
    /// Returns:
    /// - `Ok(Some(record))` for a description unit
    /// - `Ok(None)` for an authority unit, which is not a record
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedRecord`] when the unit cannot be
    /// decoded. The caller skips the unit and continues.
    fn decode_unit(&self, unit: &RawUnit, ctx: &mut DecodeContext<'_>) -> Result<Option<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// One value per line: `id|title`.
    #[derive(Debug, Clone)]
    struct PipeFormat;

    impl SnapshotFormat for PipeFormat {
        fn is_unit_start(&self, line: &str) -> bool {
            line.contains('|')
        }

        fn scan_authority(
            &self,
            _unit: &RawUnit,
            _cleaner: &mut Cleaner,
        ) -> Option<(RecordId, Authority)> {
            None
        }

        fn decode_unit(
            &self,
            unit: &RawUnit,
            ctx: &mut DecodeContext<'_>,
        ) -> Result<Option<Record>> {
            let (id, title) = unit
                .text
                .split_once('|')
                .ok_or_else(|| Error::malformed(unit.position, None, "no separator"))?;
            let title = ctx.cleaner.value(title);
            Record::builder(id)
                .field("TT", title)
                .build()
                .map(Some)
                .map_err(|e| e.in_unit(unit.position))
        }
    }

    #[test]
    fn test_custom_format_decodes() {
        let authorities = AuthorityIndex::new();
        let mut cleaner = Cleaner::new();
        let mut ctx = DecodeContext {
            authorities: &authorities,
            cleaner: &mut cleaner,
        };
        let unit = RawUnit {
            position: 1,
            text: "041-000000007|Diary.".to_string(),
        };
        let record = PipeFormat
            .decode_unit(&unit, &mut ctx)
            .expect("decodes")
            .expect("is a record");
        assert_eq!(record.master("TT"), Some("Diary"));
    }

    #[test]
    fn test_custom_format_reports_unit_position() {
        let authorities = AuthorityIndex::new();
        let mut cleaner = Cleaner::new();
        let mut ctx = DecodeContext {
            authorities: &authorities,
            cleaner: &mut cleaner,
        };
        let unit = RawUnit {
            position: 4,
            text: "bad|x".to_string(),
        };
        match PipeFormat.decode_unit(&unit, &mut ctx) {
            Err(Error::MalformedRecord { unit, .. }) => assert_eq!(unit, 4),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }
}
