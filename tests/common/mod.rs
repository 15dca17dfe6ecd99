//! Common test helpers shared across the integration suite.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use iams2rf::{Record, StoreWriter};

/// An authorised person authority.
pub const PERSON: &str = "{P},047-000000010,x,4,<Person><PersonName><Surname>Dickens</Surname>\
    <FirstName>Charles</FirstName><DateRange>1812-1870</DateRange>\
    <NameType>Authorised</NameType></PersonName></Person>";

/// Place authorities.
pub const LONDON: &str = "{L},048-000000020,x,4,<Place><Name>London</Name></Place>";
pub const NEW_YORK: &str = "{N},048-000000021,x,4,<Place><Name>New York</Name></Place>";

/// A faceted subject authority.
pub const SUBJECT: &str =
    "{S},049-000000030,x,4,<Subject><Entry>Civil rights--History</Entry></Subject>";

/// A description unit with the given identifier and payload body.
pub fn description(id: &str, body: &str) -> String {
    format!("{{{id}}},{id},x,4,<ArchiveDescription>{body}</ArchiveDescription>")
}

/// A reference from a description to a place authority.
pub fn place_ref(target: &str) -> String {
    format!("<RelatedArchiveDescriptionPlace TargetNumber=\"{target}\"></RelatedArchiveDescriptionPlace>")
}

/// A reference from a description to a subject authority.
pub fn subject_ref(target: &str) -> String {
    format!("<RelatedArchiveDescriptionSubject TargetNumber=\"{target}\"></RelatedArchiveDescriptionSubject>")
}

/// A reference from a description to a named authority.
pub fn name_ref(target: &str, relationship: &str) -> String {
    format!(
        "<RelatedArchiveDescriptionNamedAuthority TargetNumber=\"{target}\">\
         <RelationshipType>{relationship}</RelationshipType>\
         </RelatedArchiveDescriptionNamedAuthority>"
    )
}

/// Encode units the way the catalogue publishes them: UTF-16LE with a
/// byte-order mark and CRLF line ends.
pub fn snapshot_bytes(units: &[&str]) -> Vec<u8> {
    let text = units.join("\r\n");
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
    bytes
}

/// Write a snapshot file into `dir`.
pub fn write_snapshot(dir: &Path, units: &[&str]) -> PathBuf {
    let path = dir.join("snapshot.csv");
    fs::write(&path, snapshot_bytes(units)).expect("write snapshot");
    path
}

/// The standard fixture: authorities, one fully linked description, one
/// plain description and a preamble line.
pub fn standard_units() -> Vec<String> {
    let linked = description(
        "040-000123456",
        &format!(
            "<Title>Letters to the editor</Title><DateRange>1850-1860</DateRange>\
             <StartDate>1850</StartDate><EndDate>1860</EndDate>{}{}{}{}",
            name_ref("047-000000010", "Author"),
            place_ref("048-000000020"),
            place_ref("048-000000021"),
            subject_ref("049-000000030"),
        ),
    );
    let plain = description(
        "041-000000002",
        "<Title>Diary, \"private\"</Title><StartDate>1901</StartDate><EndDate>1902</EndDate>",
    );
    vec![
        "Published snapshot".to_string(),
        PERSON.to_string(),
        LONDON.to_string(),
        NEW_YORK.to_string(),
        SUBJECT.to_string(),
        linked,
        plain,
    ]
}

/// Build a store at `dir/iams.db` directly from records.
pub fn build_store(dir: &Path, records: &[Record]) -> PathBuf {
    let path = dir.join("iams.db");
    let mut writer = StoreWriter::initialize(&path, true).expect("initialize store");
    for record in records {
        writer.insert(record).expect("insert record");
    }
    writer.finish().expect("finish store");
    path
}

/// Read an output file as text.
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read output")
}
