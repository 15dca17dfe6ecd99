//! Authority records and the in-memory authority index.
//!
//! Descriptions in the snapshot refer to people, families, corporations,
//! places and subjects by identifier. The parser reads every authority unit
//! once, renders its heading here, and resolves the references from the
//! index while decoding descriptions.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::cleaning::Cleaner;
use crate::record::NameEntry;
use crate::record_id::{RecordId, RecordType};

lazy_static! {
    static ref ADDITIONAL_TITLES: Regex =
        Regex::new(r"<AdditionalTitles>.*?</AdditionalTitles>").expect("valid regex");
    static ref CORPORATION_NAME: Regex = element("CorporationName");
    static ref FAMILY_NAME: Regex = element("FamilyName");
    static ref PERSON_NAME: Regex = element("PersonName");
    static ref C_NAME: Regex = element("CorporateName");
    static ref C_QUALIFIERS: Regex = element("AdditionalQualifiers");
    static ref C_JURISDICTION: Regex = element("Jurisdiction");
    static ref F_SURNAME: Regex = element("FamilySurname");
    static ref F_EPITHET: Regex = element("FamilyEpithet");
    static ref P_SURNAME: Regex = element("Surname");
    static ref P_FORENAME: Regex = element("FirstName");
    static ref P_TITLE: Regex = element("Title");
    static ref P_EPITHET: Regex = element("Epithet");
    static ref DATE_RANGE: Regex = element("DateRange");
    static ref PL_NAME: Regex = element("Name");
    static ref PL_LOCAL_UNIT: Regex = element("LocalAdminUnit");
    static ref PL_WIDER_UNIT: Regex = element("WiderAdminUnit");
    static ref PL_COUNTRY: Regex = element("Country");
    static ref S_TEXT: Regex = element("Entry");
    static ref S_TYPE: Regex = element("Type");
    /// `<ExternalIdentifier>`: value and type.
    pub(crate) static ref EXTERNAL_IDENTIFIER: Regex = Regex::new(
        r"<ExternalIdentifier>[^<>]*?<Value>(.*?)</Value>.*?<Type(?:\s[^>]*)?>(.*?)</Type>.*?</ExternalIdentifier>"
    )
    .expect("valid regex");
}

fn element(name: &str) -> Regex {
    Regex::new(&format!(r"<{name}(?:\s[^>]*)?>(.*?)</{name}>")).expect("valid regex")
}

const AUTHORISED: &str = "<NameType>Authorised</NameType>";

const IGNORED_VALUES: &[&str] = &["-", "not applicable", "undetermined", "unknown", "unspecified"];

/// Base URI for ISNI identifiers.
pub const ISNI_BASE: &str = "http://isni.org/isni/";
/// Base URI for VIAF identifiers.
pub const VIAF_BASE: &str = "http://viaf.org/viaf/";

/// The kind of entity an authority describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityKind {
    /// 045
    Corporation,
    /// 046
    Family,
    /// 047
    Person,
    /// 048
    Place,
    /// 049
    Subject,
}

impl AuthorityKind {
    /// The authority kind for an authority record type.
    #[must_use]
    pub fn from_record_type(record_type: RecordType) -> Option<Self> {
        match record_type {
            RecordType::Corporation => Some(AuthorityKind::Corporation),
            RecordType::Family => Some(AuthorityKind::Family),
            RecordType::Person => Some(AuthorityKind::Person),
            RecordType::Place => Some(AuthorityKind::Place),
            RecordType::Subject => Some(AuthorityKind::Subject),
            _ => None,
        }
    }

    /// Lower-case label used for "Type of name" and "Type of topic".
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AuthorityKind::Corporation => "corporation",
            AuthorityKind::Family => "family",
            AuthorityKind::Person => "person",
            AuthorityKind::Place => "place",
            AuthorityKind::Subject => "general term",
        }
    }

    /// The element holding the authorised form of the heading, for kinds
    /// that record name variants.
    fn name_block(self) -> Option<&'static Regex> {
        match self {
            AuthorityKind::Corporation => Some(&*CORPORATION_NAME),
            AuthorityKind::Family => Some(&*FAMILY_NAME),
            AuthorityKind::Person => Some(&*PERSON_NAME),
            AuthorityKind::Place | AuthorityKind::Subject => None,
        }
    }

    fn parts(self) -> &'static [(Part, &'static Regex)] {
        lazy_static! {
            static ref CORPORATION: Vec<(Part, &'static Regex)> = vec![
                (Part::Name, &*C_NAME),
                (Part::Name, &*C_QUALIFIERS),
                (Part::Name, &*C_JURISDICTION),
                (Part::Dates, &*DATE_RANGE),
            ];
            static ref FAMILY: Vec<(Part, &'static Regex)> = vec![
                (Part::Name, &*F_SURNAME),
                (Part::Name, &*F_EPITHET),
                (Part::Dates, &*DATE_RANGE),
            ];
            static ref PERSON: Vec<(Part, &'static Regex)> = vec![
                (Part::Name, &*P_SURNAME),
                (Part::Name, &*P_FORENAME),
                (Part::Name, &*P_TITLE),
                (Part::Name, &*P_EPITHET),
                (Part::Dates, &*DATE_RANGE),
            ];
            static ref PLACE: Vec<(Part, &'static Regex)> = vec![
                (Part::Name, &*PL_NAME),
                (Part::Name, &*PL_LOCAL_UNIT),
                (Part::Name, &*PL_WIDER_UNIT),
                (Part::Name, &*PL_COUNTRY),
            ];
            static ref SUBJECT: Vec<(Part, &'static Regex)> = vec![(Part::Name, &*S_TEXT)];
        }
        match self {
            AuthorityKind::Corporation => CORPORATION.as_slice(),
            AuthorityKind::Family => FAMILY.as_slice(),
            AuthorityKind::Person => PERSON.as_slice(),
            AuthorityKind::Place => PLACE.as_slice(),
            AuthorityKind::Subject => SUBJECT.as_slice(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Name,
    Dates,
}

/// A resolved authority heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    kind: AuthorityKind,
    type_label: String,
    name: String,
    dates: String,
    isni: String,
    viaf: String,
}

fn first_capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty() && !IGNORED_VALUES.contains(&v.to_lowercase().as_str()))
}

impl Authority {
    /// Read an authority heading out of a cleaned authority unit.
    pub fn from_unit(kind: AuthorityKind, text: &str, cleaner: &mut Cleaner) -> Self {
        let text = ADDITIONAL_TITLES.replace_all(text, "");
        let scope = match kind.name_block() {
            Some(block) => block
                .captures_iter(&text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .find(|body| body.contains(AUTHORISED))
                .unwrap_or(""),
            None => text.as_ref(),
        };
        let mut name_parts = Vec::new();
        let mut date_parts = Vec::new();
        for (part, regex) in kind.parts() {
            if let Some(value) = first_capture(regex, scope) {
                match part {
                    Part::Name => name_parts.push(value),
                    Part::Dates => date_parts.push(value),
                }
            }
        }
        let mut isni = Vec::new();
        let mut viaf = Vec::new();
        for caps in EXTERNAL_IDENTIFIER.captures_iter(&text) {
            let value = caps.get(1).map_or("", |m| m.as_str().trim());
            let scheme = caps.get(2).map_or("", |m| m.as_str());
            if value.is_empty() {
                continue;
            }
            if scheme.contains("ISNI") {
                isni.push(format!("{ISNI_BASE}{value}"));
            } else if scheme.contains("VIAF") {
                viaf.push(format!("{VIAF_BASE}{value}"));
            }
        }
        let type_label = match kind {
            AuthorityKind::Subject => first_capture(&S_TYPE, &text)
                .map_or_else(|| kind.label().to_string(), str::to_lowercase),
            _ => kind.label().to_string(),
        };
        let name = if name_parts.is_empty() {
            String::new()
        } else {
            cleaner.authority(&name_parts.join(", "))
        };
        let dates = if date_parts.is_empty() {
            String::new()
        } else {
            cleaner.authority(&date_parts.join(", "))
        };
        Authority {
            kind,
            type_label,
            name,
            dates,
            isni: isni.join(", "),
            viaf: viaf.join(", "),
        }
    }

    /// The kind of entity.
    #[must_use]
    pub fn kind(&self) -> AuthorityKind {
        self.kind
    }

    /// Type label: the kind label, or the subject's own `<Type>`.
    #[must_use]
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// Heading without dates.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dates associated with the heading.
    #[must_use]
    pub fn dates(&self) -> &str {
        &self.dates
    }

    /// ISNI URI(s).
    #[must_use]
    pub fn isni(&self) -> &str {
        &self.isni
    }

    /// VIAF URI(s).
    #[must_use]
    pub fn viaf(&self) -> &str {
        &self.viaf
    }

    /// Full heading: name and dates.
    #[must_use]
    pub fn heading(&self) -> String {
        match (self.name.is_empty(), self.dates.is_empty()) {
            (_, true) => self.name.clone(),
            (true, false) => self.dates.clone(),
            (false, false) => format!("{}, {}", self.name, self.dates),
        }
    }

    /// Whether the authority yielded any heading text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.dates.is_empty()
    }

    /// A name entry for this authority in the given role.
    #[must_use]
    pub fn to_name_entry(&self, role: &str) -> NameEntry {
        NameEntry {
            name: self.name.clone(),
            dates: self.dates.clone(),
            kind: self.type_label.clone(),
            role: role.to_string(),
            isni: self.isni.clone(),
            viaf: self.viaf.clone(),
        }
    }
}

/// Authorities keyed by identifier.
#[derive(Debug, Default)]
pub struct AuthorityIndex {
    entries: HashMap<RecordId, Authority>,
}

impl AuthorityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an authority.
    pub fn insert(&mut self, id: RecordId, authority: Authority) {
        self.entries.insert(id, authority);
    }

    /// Look an authority up by identifier text.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Authority> {
        RecordId::parse(id).ok().and_then(|id| self.entries.get(&id))
    }

    /// Number of indexed authorities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Authority {
        let text = "{G},047-000000001,x,4,<Person><PersonName><Surname>Dickens</Surname>\
            <FirstName>Charles</FirstName><DateRange>1812-1870</DateRange>\
            <NameType>Authorised</NameType></PersonName>\
            <ExternalIdentifier><Value>0000000121</Value><Type Source='x'>ISNI</Type></ExternalIdentifier>\
            <ExternalIdentifier><Value>88</Value><Type Source='x'>VIAF</Type></ExternalIdentifier></Person>";
        Authority::from_unit(AuthorityKind::Person, text, &mut Cleaner::new())
    }

    #[test]
    fn test_person_heading() {
        let a = person();
        assert_eq!(a.name(), "Dickens, Charles");
        assert_eq!(a.dates(), "1812-1870");
        assert_eq!(a.heading(), "Dickens, Charles, 1812-1870");
        assert_eq!(a.type_label(), "person");
        assert_eq!(a.isni(), "http://isni.org/isni/0000000121");
        assert_eq!(a.viaf(), "http://viaf.org/viaf/88");
    }

    #[test]
    fn test_variant_names_are_skipped() {
        let text = "<Person><PersonName><Surname>Boz</Surname><NameType>Variant</NameType></PersonName>\
            <PersonName><Surname>Dickens</Surname><NameType>Authorised</NameType></PersonName></Person>";
        let a = Authority::from_unit(AuthorityKind::Person, text, &mut Cleaner::new());
        assert_eq!(a.name(), "Dickens");
    }

    #[test]
    fn test_place_and_ignored_values() {
        let text = "<Place><Name>London</Name><LocalAdminUnit>unknown</LocalAdminUnit>\
            <Country>England</Country></Place>";
        let a = Authority::from_unit(AuthorityKind::Place, text, &mut Cleaner::new());
        assert_eq!(a.heading(), "London, England");
        assert_eq!(a.type_label(), "place");
    }

    #[test]
    fn test_subject_type() {
        let text = "<Subject><Entry>Civil rights--History</Entry><Type>Topic</Type></Subject>";
        let a = Authority::from_unit(AuthorityKind::Subject, text, &mut Cleaner::new());
        assert_eq!(a.heading(), "Civil rights--History");
        assert_eq!(a.type_label(), "topic");

        let text = "<Subject><Entry>Whaling</Entry></Subject>";
        let a = Authority::from_unit(AuthorityKind::Subject, text, &mut Cleaner::new());
        assert_eq!(a.type_label(), "general term");
    }

    #[test]
    fn test_family_abbreviation() {
        let text = "<Family><FamilyName><FamilySurname>Howard</FamilySurname>\
            <FamilyEpithet>Family</FamilyEpithet><DateRange>fl 1850</DateRange>\
            <NameType>Authorised</NameType></FamilyName></Family>";
        let a = Authority::from_unit(AuthorityKind::Family, text, &mut Cleaner::new());
        assert_eq!(a.name(), "Howard family");
        assert_eq!(a.dates(), "active 1850");
    }

    #[test]
    fn test_index_lookup() {
        let mut index = AuthorityIndex::new();
        let id = RecordId::parse("047-000000001").expect("valid id");
        index.insert(id, person());
        assert_eq!(index.len(), 1);
        assert!(index.get("047-000000001").is_some());
        assert!(index.get("047-000000002").is_none());
        assert!(index.get("garbage").is_none());
    }

    #[test]
    fn test_name_entry() {
        let entry = person().to_name_entry("author");
        assert_eq!(entry.render(), "Dickens, Charles, 1812-1870 [author]");
        assert_eq!(entry.kind, "person");
    }
}
