//! The IAMS Published Snapshot grammar.
//!
//! Each unit of the snapshot is one catalogue entity:
//!
//! ```text
//! {GUID},041-000123456,<field>,4,...<ArchiveDescription>...</ArchiveDescription>
//! ```
//!
//! The second header field is the record identifier and the fourth the
//! publication status code. The XML payload is not parsed as a tree: the
//! snapshot is not reliably well-formed, so individual elements are picked
//! out by name and by pattern, the same way the catalogue's own reports do.
//!
//! Authority units (prefixes 045 to 049) are read in the index pass and
//! skipped in the decode pass. Description units become [`Record`]s, with
//! related names, places and subjects resolved through the
//! [`AuthorityIndex`](crate::authority::AuthorityIndex).

use lazy_static::lazy_static;
use regex::Regex;

use crate::authority::{Authority, AuthorityKind, EXTERNAL_IDENTIFIER, ISNI_BASE, VIAF_BASE};
use crate::cleaning::Cleaner;
use crate::error::{Error, Result};
use crate::formats::{DecodeContext, SnapshotFormat};
use crate::reader::RawUnit;
use crate::record::Record;
use crate::record_id::{RecordId, RecordStatus};

lazy_static! {
    static ref TAGS: Regex = Regex::new(r"<[^>]*>").expect("valid regex");
    static ref YEAR: Regex = Regex::new(r"[0-9]{4}").expect("valid regex");
    static ref ADDITIONAL_TITLES: Regex =
        Regex::new(r"<AdditionalTitles?>.*?</AdditionalTitles?>").expect("valid regex");
    static ref TITLE: Regex =
        Regex::new(r"<Title(?:\s[^>]*)?>(.*?)</Title>").expect("valid regex");
    static ref VARIANT_TITLE: Regex = Regex::new(
        r"<AdditionalTitle>[^<>]*?<Title(?:\s[^>]*)?>(.*?)</Title>.*?</AdditionalTitle>"
    )
    .expect("valid regex");
    static ref NAMED_AUTHORITY: Regex = Regex::new(
        r#"<RelatedArchiveDescriptionNamedAuthority TargetNumber=["']+([0-9]{3}-[0-9]{9})["']+>\s*<RelationshipType>(.*?)</RelationshipType>"#
    )
    .expect("valid regex");
    static ref RELATED_TOPIC: Regex = Regex::new(
        r#"<RelatedArchiveDescription(?:Place|Subject) TargetNumber=["']+([0-9]{3}-[0-9]{9})["']+>"#
    )
    .expect("valid regex");
    static ref LANGUAGE: Regex =
        Regex::new(r"<MaterialLanguage\s+[^>]*>(.*?)</MaterialLanguage>").expect("valid regex");
    static ref LANGUAGE_CODE: Regex =
        Regex::new(r#"<MaterialLanguage\s[^>]*?LanguageIsoCode=["']([a-z]+)["']"#)
            .expect("valid regex");
}

/// Master columns filled from the first occurrence of one or more elements.
const ELEMENT_COLUMNS: &[(&str, &[&str])] = &[
    ("AK", &["MDARK"]),
    ("TT", &["Title"]),
    ("PP", &["PlaceOfOrigin"]),
    ("PD", &["DateRange"]),
    ("PU", &["DateRange"]),
    ("PG", &["DateRange"]),
    ("DS", &["Extent", "PhysicalCharacteristics"]),
    ("SC", &["Scale", "ScaleDesignator"]),
    ("JK", &["Projection"]),
    ("CD", &["DecimalCoordinates", "DegreeCoordinates"]),
    ("NN", &["ScopeContent"]),
    (
        "CA",
        &[
            "DecimalLatitude",
            "DecimalLongitude",
            "Latitude",
            "Longitude",
            "Orientation",
        ],
    ),
    (
        "PV",
        &[
            "ImmSourceAcquisition",
            "CustodialHistory",
            "AdministrativeContext",
        ],
    ),
    ("RF", &["PublicationNote"]),
];

const IGNORED_LANGUAGES: &[&str] = &[
    "multiple languages",
    "not applicable",
    "undetermined",
    "unknown",
    "unspecified",
];

const IGNORED_LANGUAGE_CODES: &[&str] = &["mul", "und", "zxx"];

const FIRST_AUTHOR_ROLES: &[&str] = &["author", "creator"];

const MIN_HEADER_FIELDS: usize = 4;

/// The IAMS Published Snapshot grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct IamsFormat;

impl IamsFormat {
    /// Create the grammar.
    #[must_use]
    pub fn new() -> Self {
        IamsFormat
    }
}

/// The comma-separated fields before the XML payload.
struct Header<'a> {
    id: &'a str,
    status: &'a str,
}

fn header(text: &str) -> Option<Header<'_>> {
    let end = text.find('<').unwrap_or(text.len());
    let fields: Vec<&str> = text[..end].split(',').collect();
    if fields.len() < MIN_HEADER_FIELDS {
        return None;
    }
    Some(Header {
        id: fields[1].trim(),
        status: fields[3].trim(),
    })
}

/// Content of the first `<name>` element, without checking nesting.
fn element<'t>(text: &'t str, name: &str) -> Option<&'t str> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let mut from = 0;
    while let Some(found) = text[from..].find(&open) {
        let start = from + found + open.len();
        let rest = &text[start..];
        let body_start = match rest.chars().next() {
            Some('>') => 1,
            Some(c) if c.is_whitespace() => match rest.find('>') {
                Some(gt) if !rest[..gt].ends_with('/') => gt + 1,
                _ => {
                    from = start;
                    continue;
                },
            },
            _ => {
                from = start;
                continue;
            },
        };
        let body = &rest[body_start..];
        return body.find(&close).map(|end| &body[..end]);
    }
    None
}

/// Name of the payload's root element, if the payload starts with a tag.
fn root_element(payload: &str) -> Option<&str> {
    let name = payload.strip_prefix('<')?;
    let end = name
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')))
        .unwrap_or(name.len());
    (end > 0).then(|| &name[..end])
}

/// The root element of the unit's payload when its closing tag is missing.
fn unclosed_root(text: &str) -> Option<&str> {
    let payload = &text[text.find('<')?..];
    let root = root_element(payload)?;
    (!payload.contains(&format!("</{root}>"))).then_some(root)
}

fn first_year(text: &str) -> Option<i32> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

fn element_value(text: &str, name: &str, cleaner: &mut Cleaner) -> Option<String> {
    let raw = element(text, name)?;
    let value = cleaner.value(&TAGS.replace_all(raw, " "));
    (!value.is_empty()).then_some(value)
}

impl SnapshotFormat for IamsFormat {
    fn is_unit_start(&self, line: &str) -> bool {
        line.trim_start().starts_with('{')
    }

    fn scan_authority(
        &self,
        unit: &RawUnit,
        cleaner: &mut Cleaner,
    ) -> Option<(RecordId, Authority)> {
        let id = RecordId::parse(header(&unit.text)?.id).ok()?;
        let kind = AuthorityKind::from_record_type(id.record_type())?;
        if unclosed_root(&unit.text).is_some() {
            tracing::warn!(id = %id, "truncated authority unit not indexed");
            return None;
        }
        let text = cleaner.unit(&unit.text);
        let authority = Authority::from_unit(kind, &text, cleaner);
        Some((id, authority))
    }

    fn decode_unit(&self, unit: &RawUnit, ctx: &mut DecodeContext<'_>) -> Result<Option<Record>> {
        let position = unit.position;
        let Some(head) = header(&unit.text) else {
            return Err(Error::malformed(
                position,
                None,
                "header has fewer than four fields",
            ));
        };
        let id = RecordId::parse(head.id).map_err(|e| e.in_unit(position))?;
        let malformed = |reason: String| Error::malformed(position, Some(id.as_str()), reason);
        if id.record_type().is_authority() {
            // Indexed in the first pass unless truncated.
            return match unclosed_root(&unit.text) {
                Some(root) => Err(malformed(format!(
                    "authority root element <{root}> is not closed; the unit is truncated"
                ))),
                None => Ok(None),
            };
        }
        let Some(start) = unit.text.find('<') else {
            return Err(malformed("unit has no XML payload".to_string()));
        };
        if root_element(&unit.text[start..]).is_none() {
            return Err(malformed("payload has no root element".to_string()));
        }
        if let Some(root) = unclosed_root(&unit.text) {
            return Err(malformed(format!(
                "root element <{root}> is not closed; the unit is truncated"
            )));
        }

        let cleaner = &mut *ctx.cleaner;
        let text = cleaner.unit(&unit.text);
        let body = text.find('<').map_or("", |i| &text[i..]);
        let main = ADDITIONAL_TITLES.replace_all(body, "");

        let mut builder = Record::builder(id.as_str())
            .status(RecordStatus::from_code(head.status))
            .years(
                element(&main, "StartDate").and_then(first_year),
                element(&main, "EndDate").and_then(first_year),
            );

        for (code, names) in ELEMENT_COLUMNS {
            for name in *names {
                if let Some(value) = element_value(&main, name, cleaner) {
                    builder = builder.field(code, value);
                }
            }
        }

        let resource_type = match element_value(&main, "MaterialType", cleaner) {
            Some(material) => cleaner.value(&format!("{}. {material}", id.record_type())),
            None => id.record_type().to_string(),
        };
        builder = builder.field("RT", resource_type);

        let shelfmark: Vec<String> = ["CollectionArea", "Reference"]
            .iter()
            .filter_map(|name| element_value(&main, name, cleaner))
            .collect();
        if !shelfmark.is_empty() {
            builder = builder.field("SM", cleaner.value(&shelfmark.join(". ")));
        }

        if let Some(status) = RecordStatus::from_code(head.status) {
            builder = builder.field("SX", status.label());
        }

        for caps in EXTERNAL_IDENTIFIER.captures_iter(body) {
            let value = cleaner.value(caps.get(1).map_or("", |m| m.as_str()));
            let scheme = caps.get(2).map_or("", |m| m.as_str().trim());
            if value.is_empty() {
                continue;
            }
            builder = if scheme.contains("VIAF") {
                builder.field("VF", format!("{VIAF_BASE}{value}"))
            } else if scheme.contains("ISNI") {
                builder.field("II", format!("{ISNI_BASE}{value}"))
            } else if scheme.contains("LCCN") {
                builder.field("LC", value)
            } else {
                builder.identifier(value, scheme)
            };
        }

        if let Some(format) = element_value(body, "DigitalFormatName", cleaner) {
            builder = builder.field("DS", format!("Digital file format: {format}."));
        }

        for caps in TITLE.captures_iter(&main) {
            let title = cleaner.value(caps.get(1).map_or("", |m| m.as_str()));
            builder = builder.title(title);
        }
        for caps in VARIANT_TITLE.captures_iter(body) {
            let title = cleaner.value(caps.get(1).map_or("", |m| m.as_str()));
            builder = builder.field("TV", title.clone()).title(title);
        }

        for caps in LANGUAGE.captures_iter(body) {
            let language = caps.get(1).map_or("", |m| m.as_str().trim());
            if !IGNORED_LANGUAGES.contains(&language.to_lowercase().as_str()) {
                builder = builder.language(cleaner.value(language));
            }
        }
        for caps in LANGUAGE_CODE.captures_iter(body) {
            let code = caps.get(1).map_or("", |m| m.as_str());
            if !IGNORED_LANGUAGE_CODES.contains(&code) {
                builder = builder.field("S_LANGUAGES", code);
            }
        }

        let mut places = 0usize;
        for caps in RELATED_TOPIC.captures_iter(body) {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let Some(authority) = ctx.authorities.get(target).filter(|a| !a.is_empty()) else {
                tracing::debug!(id = %id, target, "unresolved place or subject reference");
                continue;
            };
            let heading = authority.heading();
            if authority.kind() == AuthorityKind::Place {
                places += 1;
                match places {
                    1 => builder = builder.field("G1", heading.clone()),
                    2 => builder = builder.field("G2", heading.clone()),
                    _ => {},
                }
            }
            builder = builder.topic(heading, authority.type_label());
        }

        for caps in NAMED_AUTHORITY.captures_iter(body) {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let role = caps.get(2).map_or("", |m| m.as_str().trim()).to_lowercase();
            let Some(authority) = ctx.authorities.get(target).filter(|a| !a.is_empty()) else {
                tracing::debug!(id = %id, target, "unresolved named authority reference");
                continue;
            };
            if role == "subject" {
                builder = builder.topic(authority.heading(), authority.type_label());
            } else if !role.is_empty() {
                if FIRST_AUTHOR_ROLES.contains(&role.as_str())
                    && !builder.has_field("AA")
                    && !authority.name().is_empty()
                {
                    builder = builder
                        .field("AA", authority.name())
                        .field("AD", authority.dates())
                        .field("AT", authority.type_label())
                        .field("AR", role.as_str())
                        .field("II", authority.isni())
                        .field("VF", authority.viaf());
                }
                builder = builder.name(authority.to_name_entry(&role));
            }
        }

        builder
            .build()
            .map(Some)
            .map_err(|e| e.in_unit(position))
    }
}
