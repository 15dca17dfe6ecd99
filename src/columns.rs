//! The Researcher Format column catalogue.
//!
//! Every column has a two-character code (used in request specifications and
//! as the basis of the store's column names) and a header label (written to
//! the CSV header row). Catalogue order is the column order of every output
//! file.

use std::fmt;

use crate::record::Category;

/// Where the value of a column comes from when a record is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSource {
    /// The record identifier itself.
    Identifier,
    /// A text cell on the record's master row.
    Master,
    /// Re-aggregated from the child rows of a category.
    Category(Category),
}

/// One Researcher Format column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    /// Short code, e.g. `TT`.
    pub code: &'static str,
    /// Header label, e.g. `Title`.
    pub label: &'static str,
    /// Hidden columns are stored for searching but never exported.
    pub hidden: bool,
    /// Value source.
    pub source: ColumnSource,
}

const fn master(code: &'static str, label: &'static str) -> Column {
    Column {
        code,
        label,
        hidden: false,
        source: ColumnSource::Master,
    }
}

const fn derived(code: &'static str, label: &'static str, category: Category) -> Column {
    Column {
        code,
        label,
        hidden: false,
        source: ColumnSource::Category(category),
    }
}

/// The complete catalogue, in output order.
pub static COLUMNS: &[Column] = &[
    Column {
        code: "S_LANGUAGES",
        label: "Language codes",
        hidden: true,
        source: ColumnSource::Master,
    },
    Column {
        code: "ID",
        label: "BL record ID",
        hidden: false,
        source: ColumnSource::Identifier,
    },
    master("RT", "Type of resource"),
    master("CT", "Content type"),
    master("MT", "Material type"),
    master("BN", "BNB number"),
    master("LC", "LC number"),
    master("OC", "OCLC number"),
    master("ES", "ESTC citation number"),
    master("AK", "Archival Resource Key"),
    master("IB", "ISBN"),
    master("IS", "ISSN"),
    master("IL", "ISSN-L"),
    master("IM", "International Standard Music Number (ISMN)"),
    master("IR", "International Standard Recording Code (ISRC)"),
    master("IA", "International Article Number (EAN)"),
    master("PN", "Publisher number"),
    derived("OI", "Other identifier", Category::Identifiers),
    master("AA", "Name"),
    master("AD", "Dates associated with name"),
    master("AT", "Type of name"),
    master("AR", "Role"),
    master("II", "ISNI"),
    master("VF", "VIAF"),
    derived("AN", "All names", Category::Names),
    master("TT", "Title"),
    master("TU", "Uniform title"),
    master("TK", "Key title"),
    master("TV", "Variant titles"),
    master("S1", "Preceding titles"),
    master("S2", "Succeeding titles"),
    master("SE", "Series title"),
    master("SN", "Number within series"),
    master("PC", "Country of publication"),
    master("PP", "Place of creation/publication"),
    master("PB", "Publisher"),
    master("PD", "Date of creation/publication"),
    master("PU", "Date of creation/publication (not standardised)"),
    master("PJ", "Projected date of publication"),
    master("PG", "Publication date range"),
    master("P1", "Publication date one"),
    master("P2", "Publication date two"),
    master("FA", "Free text information about dates of publication"),
    master("HF", "First date held"),
    master("HL", "Last date held"),
    master("HA", "Free text information about holdings"),
    master("FC", "Current publication frequency"),
    master("FF", "Former publication frequency"),
    master("ED", "Edition"),
    master("DS", "Physical description"),
    master("SC", "Scale"),
    master("JK", "Projection"),
    master("CD", "Coordinates"),
    master("MF", "Musical form"),
    master("MG", "Musical format"),
    master("PR", "Price"),
    master("DW", "Dewey classification"),
    master("LN", "Library of Congress classification"),
    master("SM", "BL shelfmark"),
    master("SD", "DSC shelfmark"),
    master("SO", "Other shelfmark"),
    master("BU", "Burney?"),
    master("IO", "India Office?"),
    master("CL", "Formerly held at Colindale?"),
    derived("SU", "Topics", Category::Topics),
    master("G1", "First geographical subject heading"),
    master("G2", "Subsequent geographical subject headings"),
    master("CG", "General area of coverage"),
    master("CC", "Coverage: Country"),
    master("CF", "Coverage: Region"),
    master("CY", "Coverage: City"),
    master("GE", "Genre"),
    master("TA", "Target audience"),
    master("LF", "Literary form"),
    derived("LA", "Languages", Category::Languages),
    master("CO", "Contents"),
    master("AB", "Abstract"),
    master("NN", "Notes"),
    master("CA", "Additional notes for cartographic materials"),
    master("MA", "Additional notes for music"),
    master("PV", "Provenance"),
    master("RF", "Referenced in"),
    master("NL", "Link to digitised resource"),
    master("8F", "852 holdings flag"),
    master("ND", "NID"),
    master("EL", "Encoding level"),
    master("SX", "Status"),
];

const DEFAULT_CODES: &[&str] = &[
    "ID", "RT", "BN", "IB", "AA", "AD", "AT", "AR", "AN", "TT", "TV", "SE", "SN", "PC", "PP",
    "PB", "PD", "ED", "DS", "DW", "SM", "SU", "GE", "LA", "NN", "AK", "PV", "RF",
];

const CONTEXT_SPECIFIC_CODES: &[&str] = &[
    "ES", "8F", "BU", "CG", "CL", "EL", "FA", "G1", "G2", "HA", "HF", "HL", "IO", "ND", "NL",
    "P1", "P2", "PJ", "SD", "SO", "SX",
];

/// Columns searched by free-text criteria.
pub const FREE_TEXT_CODES: &[&str] = &["AA", "AN", "TT", "DS", "SM", "SU", "NN", "PV", "RF"];

impl Column {
    /// Find a column by its code, ignoring ASCII case.
    #[must_use]
    pub fn by_code(code: &str) -> Option<Column> {
        let code = code.trim();
        COLUMNS
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .copied()
    }

    /// Find a column by its header label, ignoring case.
    #[must_use]
    pub fn by_label(label: &str) -> Option<Column> {
        let label = label.trim().to_lowercase();
        COLUMNS
            .iter()
            .find(|c| c.label.to_lowercase() == label)
            .copied()
    }

    /// Find a column by code first, then by label.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Column> {
        Self::by_code(name).or_else(|| Self::by_label(name))
    }

    /// Name of the text column on the store's master table, or `None` for
    /// columns that are not stored there.
    #[must_use]
    pub fn sql_name(&self) -> Option<String> {
        match self.source {
            ColumnSource::Master => Some(format!("rf_{}", self.code.to_ascii_lowercase())),
            ColumnSource::Identifier | ColumnSource::Category(_) => None,
        }
    }

    /// Position of this column in the catalogue.
    #[must_use]
    pub fn position(&self) -> usize {
        COLUMNS
            .iter()
            .position(|c| c.code == self.code)
            .unwrap_or(usize::MAX)
    }

    /// All columns stored on the master table, in catalogue order.
    pub fn master_columns() -> impl Iterator<Item = &'static Column> {
        COLUMNS
            .iter()
            .filter(|c| matches!(c.source, ColumnSource::Master))
    }

    /// All columns that may appear in an output file.
    pub fn exportable() -> impl Iterator<Item = &'static Column> {
        COLUMNS.iter().filter(|c| !c.hidden)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

/// A choice of columns for an export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSet {
    /// The standard researcher selection.
    #[default]
    Default,
    /// Every exportable column except those only meaningful for particular
    /// material (newspapers, holdings flags and similar).
    All,
    /// An explicit list of columns.
    Explicit(Vec<Column>),
}

impl ColumnSet {
    /// Resolve to concrete columns in catalogue order, without duplicates.
    #[must_use]
    pub fn resolve(&self) -> Vec<Column> {
        let wanted = |c: &Column| -> bool {
            match self {
                ColumnSet::Default => DEFAULT_CODES.contains(&c.code),
                ColumnSet::All => !CONTEXT_SPECIFIC_CODES.contains(&c.code),
                ColumnSet::Explicit(cols) => cols.iter().any(|x| x.code == c.code),
            }
        };
        Column::exportable().filter(|c| wanted(c)).copied().collect()
    }
}
