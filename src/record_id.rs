//! IAMS record identifiers, record types and status codes.
//!
//! An identifier looks like `040-000123456`: a three-digit type prefix, a
//! hyphen and a zero-padded nine-digit serial. It is kept as text from the
//! snapshot to the CSV output and never converted to a number.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const PREFIX_LEN: usize = 3;
const SERIAL_LEN: usize = 9;

/// The kind of catalogue entity an identifier refers to, taken from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// 032
    Fonds,
    /// 033
    SubFonds,
    /// 034
    SubSubFonds,
    /// 035
    SubSubSubFonds,
    /// 036
    Series,
    /// 037
    SubSeries,
    /// 038
    SubSubSeries,
    /// 039
    SubSubSubSeries,
    /// 040
    File,
    /// 041
    Item,
    /// 042
    SubItem,
    /// 043
    SubSubItem,
    /// 044
    SubSubSubItem,
    /// 045 (authority)
    Corporation,
    /// 046 (authority)
    Family,
    /// 047 (authority)
    Person,
    /// 048 (authority)
    Place,
    /// 049 (authority)
    Subject,
}

impl RecordType {
    /// Look up the record type for a three-digit prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let ty = match prefix {
            "032" => RecordType::Fonds,
            "033" => RecordType::SubFonds,
            "034" => RecordType::SubSubFonds,
            "035" => RecordType::SubSubSubFonds,
            "036" => RecordType::Series,
            "037" => RecordType::SubSeries,
            "038" => RecordType::SubSubSeries,
            "039" => RecordType::SubSubSubSeries,
            "040" => RecordType::File,
            "041" => RecordType::Item,
            "042" => RecordType::SubItem,
            "043" => RecordType::SubSubItem,
            "044" => RecordType::SubSubSubItem,
            "045" => RecordType::Corporation,
            "046" => RecordType::Family,
            "047" => RecordType::Person,
            "048" => RecordType::Place,
            "049" => RecordType::Subject,
            _ => return None,
        };
        Some(ty)
    }

    /// Display name used in the "Type of resource" column.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RecordType::Fonds => "Fonds",
            RecordType::SubFonds => "SubFonds",
            RecordType::SubSubFonds => "SubSubFonds",
            RecordType::SubSubSubFonds => "SubSubSubFonds",
            RecordType::Series => "Series",
            RecordType::SubSeries => "SubSeries",
            RecordType::SubSubSeries => "SubSubSeries",
            RecordType::SubSubSubSeries => "SubSubSubSeries",
            RecordType::File => "File",
            RecordType::Item => "Item",
            RecordType::SubItem => "SubItem",
            RecordType::SubSubItem => "SubSubItem",
            RecordType::SubSubSubItem => "SubSubSubItem",
            RecordType::Corporation => "Corporation",
            RecordType::Family => "Family",
            RecordType::Person => "Person",
            RecordType::Place => "Place",
            RecordType::Subject => "Subject",
        }
    }

    /// Whether records of this type are authorities (names, places, subjects)
    /// rather than archive descriptions.
    #[must_use]
    pub fn is_authority(self) -> bool {
        matches!(
            self,
            RecordType::Corporation
                | RecordType::Family
                | RecordType::Person
                | RecordType::Place
                | RecordType::Subject
        )
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Publication status carried in the fourth header field of a snapshot unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// 1
    Draft,
    /// 3
    PendingDeletion,
    /// 4
    Published,
    /// 5
    Deleted,
    /// 6
    Loaded,
    /// 7
    Approved,
    /// 8
    ReadyForReview,
    /// 9
    Rejected,
}

impl RecordStatus {
    /// Decode a status code; unknown codes yield `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let status = match code.trim() {
            "1" => RecordStatus::Draft,
            "3" => RecordStatus::PendingDeletion,
            "4" => RecordStatus::Published,
            "5" => RecordStatus::Deleted,
            "6" => RecordStatus::Loaded,
            "7" => RecordStatus::Approved,
            "8" => RecordStatus::ReadyForReview,
            "9" => RecordStatus::Rejected,
            _ => return None,
        };
        Some(status)
    }

    /// Label written to the "Status" column.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RecordStatus::Draft => "Draft",
            RecordStatus::PendingDeletion => "Pending Deletion",
            RecordStatus::Published => "Published",
            RecordStatus::Deleted => "Deleted",
            RecordStatus::Loaded => "Loaded",
            RecordStatus::Approved => "Approved",
            RecordStatus::ReadyForReview => "Ready for Review",
            RecordStatus::Rejected => "Rejected",
        }
    }
}

/// A validated IAMS record identifier.
///
/// Ordering is plain string ordering, which for the fixed-width identifier
/// grammar is also the catalogue's natural order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] (unit 0) if the text is not a
    /// three-digit known type prefix, a hyphen and a nine-digit serial.
    pub fn parse(text: &str) -> Result<Self> {
        Self::check(text)
            .map(|()| RecordId(text.to_string()))
            .map_err(|reason| Error::malformed(0, Some(text), reason))
    }

    /// Whether `text` is a well-formed identifier.
    #[must_use]
    pub fn is_valid(text: &str) -> bool {
        Self::check(text).is_ok()
    }

    fn check(text: &str) -> std::result::Result<(), String> {
        if text.is_empty() {
            return Err("missing identifier".to_string());
        }
        let Some((prefix, serial)) = text.split_once('-') else {
            return Err(format!("identifier '{text}' has no type prefix"));
        };
        if prefix.len() != PREFIX_LEN || serial.len() != SERIAL_LEN {
            return Err(format!(
                "identifier '{text}' is not of the form NNN-NNNNNNNNN"
            ));
        }
        if !prefix.bytes().chain(serial.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(format!("identifier '{text}' contains non-digit characters"));
        }
        if RecordType::from_prefix(prefix).is_none() {
            return Err(format!("identifier '{text}' has unknown type prefix {prefix}"));
        }
        Ok(())
    }

    /// The identifier text exactly as it appeared in the source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The record type encoded in the prefix.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        // Prefix was checked in `parse`.
        RecordType::from_prefix(&self.0[..PREFIX_LEN]).unwrap_or(RecordType::Item)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::check(&value).map_err(|reason| Error::malformed(0, Some(&value), reason))?;
        Ok(RecordId(value))
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros_preserved() {
        let id = RecordId::parse("040-000123456").expect("valid id");
        assert_eq!(id.as_str(), "040-000123456");
        assert_eq!(id.to_string(), "040-000123456");
        assert_eq!(id.record_type(), RecordType::File);
    }

    #[test]
    fn test_rejects_wrong_length_class() {
        assert!(RecordId::parse("040-123456").is_err());
        assert!(RecordId::parse("0400-000123456").is_err());
        assert!(RecordId::parse("040000123456").is_err());
    }

    #[test]
    fn test_rejects_non_digits_and_unknown_prefix() {
        assert!(RecordId::parse("040-00012345X").is_err());
        assert!(RecordId::parse("050-000123456").is_err());
        assert!(RecordId::parse("").is_err());
    }

    #[test]
    fn test_authority_types() {
        let person = RecordId::parse("047-000000001").expect("valid id");
        assert!(person.record_type().is_authority());
        let file = RecordId::parse("032-000000001").expect("valid id");
        assert!(!file.record_type().is_authority());
        assert_eq!(file.record_type().name(), "Fonds");
    }

    #[test]
    fn test_ordering_is_textual() {
        let a = RecordId::parse("040-000000009").expect("valid id");
        let b = RecordId::parse("040-000000010").expect("valid id");
        let c = RecordId::parse("041-000000001").expect("valid id");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RecordStatus::from_code("4"), Some(RecordStatus::Published));
        assert_eq!(RecordStatus::from_code("2"), None);
        assert_eq!(RecordStatus::ReadyForReview.label(), "Ready for Review");
    }
}
