//! Store to Researcher Format: the `sql2rf` pipeline.
//!
//! # Examples
//!
//! ```no_run
//! use iams2rf::extract::extract;
//! use iams2rf::request::RequestSpec;
//!
//! let summary = extract("iams.db", &RequestSpec::export_all(), "out")?;
//! println!("{} records exported", summary.matched);
//! # Ok::<(), iams2rf::Error>(())
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::exporter::{ExportPlan, ExportSummary, Exporter};
use crate::record_id::RecordId;
use crate::request::RequestSpec;
use crate::selector::Selector;
use crate::store::Store;

/// Name of the exclusion list kept next to the store.
pub const EXCLUSION_LIST: &str = "List of IDs not to be exported.txt";

/// The exclusion list for the store at `store_path`.
#[must_use]
pub fn exclusion_list_path(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(EXCLUSION_LIST)
}

/// Read identifiers not to be exported. A missing file is an empty list;
/// lines that are not valid identifiers are ignored.
///
/// # Errors
///
/// Returns an IO error if the file exists but cannot be read.
pub fn read_exclusions(path: &Path) -> Result<BTreeSet<RecordId>> {
    if !path.is_file() {
        return Ok(BTreeSet::new());
    }
    let bytes = fs::read(path)?;
    let ids: BTreeSet<RecordId> = String::from_utf8_lossy(&bytes)
        .lines()
        .filter_map(|line| RecordId::parse(line.trim()).ok())
        .collect();
    tracing::info!(path = %path.display(), excluded = ids.len(), "read exclusion list");
    Ok(ids)
}

/// Select records from the store at `store_path` and write the requested
/// files to `out_dir`.
///
/// Criteria are validated before any output file is opened.
///
/// # Errors
///
/// Returns a store error if the store is missing or incomplete,
/// [`Error::InvalidCriteria`](crate::Error::InvalidCriteria) for a bad
/// request, or an IO/CSV error.
pub fn extract(
    store_path: impl AsRef<Path>,
    request: &RequestSpec,
    out_dir: impl AsRef<Path>,
) -> Result<ExportSummary> {
    let store_path = store_path.as_ref();
    request.criteria.validate()?;
    let store = Store::open(store_path)?;
    let exclusions = read_exclusions(&exclusion_list_path(store_path))?;

    tracing::info!("searching for matching records");
    let ids = Selector::new(&store)
        .with_exclusions(exclusions)
        .select(&request.criteria)?;

    let plan = ExportPlan::from_request(request);
    Exporter::new(&store).export(&ids, &plan, out_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_list_location() {
        assert_eq!(
            exclusion_list_path(Path::new("/data/iams.db")),
            PathBuf::from("/data/List of IDs not to be exported.txt")
        );
        assert_eq!(
            exclusion_list_path(Path::new("iams.db")),
            PathBuf::from("List of IDs not to be exported.txt")
        );
    }

    #[test]
    fn test_read_exclusions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(EXCLUSION_LIST);
        assert!(read_exclusions(&path).expect("missing is empty").is_empty());

        fs::write(&path, "040-000000001\r\nnot an id\n  041-000000002  \n\n").expect("write");
        let ids = read_exclusions(&path).expect("read");
        let ids: Vec<_> = ids.iter().map(RecordId::as_str).collect();
        assert_eq!(ids, vec!["040-000000001", "041-000000002"]);
    }
}
