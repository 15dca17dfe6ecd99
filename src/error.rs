//! Error types for snapshot ingestion and Researcher Format extraction.
//!
//! This module provides the [`Error`] type for all library operations, the
//! [`ErrorKind`] classification reported to callers, and the [`Result`]
//! convenience type.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for all library operations.
///
/// Per-record errors ([`Error::MalformedRecord`]) are recoverable: the parser
/// yields them, ingestion counts them and carries on. Every other variant
/// aborts the operation in progress.
#[derive(Error, Debug)]
pub enum Error {
    /// A snapshot unit could not be decoded into a valid record.
    #[error("malformed record in unit {unit}{}: {reason}", id_context(.id))]
    MalformedRecord {
        /// One-based position of the unit in the snapshot.
        unit: usize,
        /// Identifier text, when one could be read from the unit.
        id: Option<String>,
        /// What was wrong with the unit.
        reason: String,
    },

    /// The identifier already exists in the store being built.
    #[error("duplicate record {id}: the snapshot is corrupt or already loaded")]
    DuplicateRecord {
        /// The repeated identifier.
        id: String,
    },

    /// A store already exists where a fresh one was requested.
    #[error("store already exists at {}", .path.display())]
    StoreExists {
        /// Store location.
        path: PathBuf,
    },

    /// No store exists at the given location.
    #[error("no store found at {}", .path.display())]
    StoreNotFound {
        /// Store location.
        path: PathBuf,
    },

    /// The file at the given location is not a completed store build.
    #[error("store at {} is incomplete; rebuild it with snapshot2sql", .path.display())]
    StoreIncomplete {
        /// Store location.
        path: PathBuf,
    },

    /// A request references an unknown field or a malformed operator or value.
    #[error("invalid criterion '{criterion}': {reason}")]
    InvalidCriteria {
        /// The offending criterion as written by the caller.
        criterion: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A request specification file could not be read or parsed.
    #[error("invalid request {}: {reason}", .path.display())]
    InvalidRequest {
        /// Request file location.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Source bytes could not be interpreted in the declared character set.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the SQLite store.
    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error writing CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn id_context(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" ({id})"),
        None => String::new(),
    }
}

/// Classification of an [`Error`], exposed to callers for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Recoverable per-record malformation.
    MalformedRecord,
    /// Duplicate identifier during ingestion.
    DuplicateRecord,
    /// Store location misconfiguration (exists, missing or incomplete).
    Store,
    /// Bad request specification or criteria.
    Request,
    /// Undecodable source data.
    Encoding,
    /// IO, database or CSV failure.
    Io,
}

impl ErrorKind {
    /// Process exit code used by the command-line tools for this kind.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::MalformedRecord => 65,
            ErrorKind::DuplicateRecord => 66,
            ErrorKind::Store => 67,
            ErrorKind::Request => 64,
            ErrorKind::Encoding => 68,
            ErrorKind::Io => 74,
        }
    }
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Error::DuplicateRecord { .. } => ErrorKind::DuplicateRecord,
            Error::StoreExists { .. }
            | Error::StoreNotFound { .. }
            | Error::StoreIncomplete { .. } => ErrorKind::Store,
            Error::InvalidCriteria { .. } | Error::InvalidRequest { .. } => ErrorKind::Request,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Io(_) | Error::Sqlite(_) | Error::Csv(_) => ErrorKind::Io,
        }
    }

    /// Whether ingestion may skip past this error and continue.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. })
    }

    pub(crate) fn malformed(unit: usize, id: Option<&str>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            unit,
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Attach the snapshot unit position to a malformed-record error.
    pub(crate) fn in_unit(self, position: usize) -> Self {
        match self {
            Error::MalformedRecord { id, reason, .. } => Error::MalformedRecord {
                unit: position,
                id,
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn invalid_criteria(criterion: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidCriteria {
            criterion: criterion.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_includes_id() {
        let err = Error::malformed(3, Some("040-000000001"), "payload is not closed");
        assert_eq!(
            err.to_string(),
            "malformed record in unit 3 (040-000000001): payload is not closed"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_malformed_message_without_id() {
        let err = Error::malformed(1, None, "missing identifier");
        assert_eq!(err.to_string(), "malformed record in unit 1: missing identifier");
    }

    #[test]
    fn test_kinds_and_exit_codes() {
        let dup = Error::DuplicateRecord {
            id: "040-000000001".to_string(),
        };
        assert_eq!(dup.kind(), ErrorKind::DuplicateRecord);
        assert!(!dup.is_recoverable());

        let missing = Error::StoreNotFound {
            path: PathBuf::from("iams.db"),
        };
        assert_eq!(missing.kind(), ErrorKind::Store);
        assert_eq!(missing.to_string(), "no store found at iams.db");

        let bad = Error::invalid_criteria("XX", "unknown field");
        assert_eq!(bad.kind(), ErrorKind::Request);
        assert_ne!(bad.kind().exit_code(), ErrorKind::Io.exit_code());
    }
}
