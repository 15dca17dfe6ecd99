//! Selection criteria.
//!
//! A [`Criteria`] value is what a request asks for: field/value criteria
//! (AND across criteria, OR across the values of one criterion), an optional
//! [`DateRange`] and optional free-text terms. Everything is checked by
//! [`Criteria::validate`] before the store is queried.
//!
//! # Examples
//!
//! ```
//! use iams2rf::criteria::{Criteria, Criterion, Operator};
//!
//! let criteria = Criteria::new()
//!     .with_criterion(Criterion::new("Country of publication", Operator::Exact, ["England"]))
//!     .with_criterion(Criterion::new("Topics", Operator::Contains, ["history"]));
//! assert!(criteria.validate().is_ok());
//!
//! let bad = Criteria::new().with_criterion(Criterion::new("XX", Operator::Exact, ["x"]));
//! assert!(bad.validate().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::columns::{Column, ColumnSource, FREE_TEXT_CODES};
use crate::delimiters::Delimiters;
use crate::error::{Error, Result};
use crate::record::Category;

/// How a criterion value is compared with stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Case-sensitive equality with the whole value or one of its facets.
    #[default]
    Exact,
    /// Case-insensitive substring of one facet, or the whole value ignoring
    /// case. A partial match never spans a facet delimiter.
    Contains,
}

impl Operator {
    /// Compare one stored value (a single repeat, possibly faceted) with a
    /// criterion value.
    #[must_use]
    pub fn matches(self, delimiters: &Delimiters, stored: &str, wanted: &str) -> bool {
        match self {
            Operator::Exact => {
                stored == wanted
                    || (stored.contains(delimiters.facet)
                        && delimiters.split_facets(stored).iter().any(|f| *f == wanted))
            },
            Operator::Contains => {
                let wanted = wanted.to_lowercase();
                stored.to_lowercase() == wanted
                    || delimiters
                        .split_facets(stored)
                        .iter()
                        .any(|f| f.to_lowercase().contains(&wanted))
            },
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" | "equals" | "=" | "==" => Ok(Operator::Exact),
            "contains" | "like" | "~" => Ok(Operator::Contains),
            other => Err(Error::invalid_criteria(
                other,
                "operator must be 'exact' or 'contains'",
            )),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Exact => f.write_str("exact"),
            Operator::Contains => f.write_str("contains"),
        }
    }
}

/// What a criterion is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The record identifier.
    Identifier,
    /// A master column; multi-valued cells are split on the repeat delimiter.
    Column(Column),
    /// The values of a category.
    Category(Category),
}

impl Field {
    /// Resolve a field name: a column code, a header label or a category
    /// name. Columns derived from a category resolve to that category.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Field> {
        let by_column = |column: Column| match column.source {
            ColumnSource::Identifier => Field::Identifier,
            ColumnSource::Master => Field::Column(column),
            ColumnSource::Category(category) => Field::Category(category),
        };
        Column::by_code(name)
            .or_else(|| Column::by_label(name))
            .map(by_column)
            .or_else(|| Category::from_name(name).map(Field::Category))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Identifier => f.write_str("ID"),
            Field::Column(column) => write!(f, "{column}"),
            Field::Category(category) => write!(f, "{category}"),
        }
    }
}

/// One field/operator/values condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Column code, header label or category name.
    pub field: String,
    /// Comparison.
    #[serde(default, rename = "op")]
    pub operator: Operator,
    /// Accepted values; any one may match.
    pub values: Vec<String>,
}

impl Criterion {
    /// Create a criterion.
    pub fn new<I, S>(field: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Criterion {
            field: field.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The resolved field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCriteria`] if the field name is unknown.
    pub fn resolve_field(&self) -> Result<Field> {
        Field::resolve(&self.field)
            .ok_or_else(|| Error::invalid_criteria(self.to_string(), "unknown field"))
    }

    fn validate(&self) -> Result<Field> {
        let field = self.resolve_field()?;
        if self.values.iter().all(|v| v.trim().is_empty()) {
            return Err(Error::invalid_criteria(self.to_string(), "no values given"));
        }
        Ok(field)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.values.join(" | "))
    }
}

/// Records whose years overlap `from..=to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest year, inclusive.
    #[serde(default)]
    pub from: Option<i32>,
    /// Latest year, inclusive.
    #[serde(default)]
    pub to: Option<i32>,
}

impl DateRange {
    /// Create a date range.
    #[must_use]
    pub fn new(from: Option<i32>, to: Option<i32>) -> Self {
        DateRange { from, to }
    }

    /// Check that the bounds are four-digit years in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCriteria`] otherwise.
    pub fn validate(&self) -> Result<()> {
        for year in [self.from, self.to].into_iter().flatten() {
            if !(1000..=9999).contains(&year) {
                return Err(Error::invalid_criteria(
                    self.to_string(),
                    format!("{year} is not a four-digit year"),
                ));
            }
        }
        match (self.from, self.to) {
            (None, None) => Err(Error::invalid_criteria(self.to_string(), "no bounds given")),
            (Some(from), Some(to)) if from > to => Err(Error::invalid_criteria(
                self.to_string(),
                "start year is after end year",
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_default();
        write!(f, "dates {}-{}", bound(self.from), bound(self.to))
    }
}

/// Everything a request selects on. Empty criteria select every record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criteria {
    /// Field criteria, combined with AND.
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    /// Optional year range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Free-text terms, searched case-insensitively across the free-text
    /// columns; any term in any column matches.
    #[serde(default)]
    pub text: Vec<String>,
}

impl Criteria {
    /// No criteria.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Set the year range.
    #[must_use]
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Add free-text terms.
    #[must_use]
    pub fn with_text<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Whether nothing restricts the selection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty() && self.date_range.is_none() && self.text.is_empty()
    }

    /// Check every criterion and resolve its field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCriteria`] for an unknown field, an empty
    /// value list, empty free text or a malformed date range.
    pub fn validate(&self) -> Result<Vec<(Field, &Criterion)>> {
        let resolved = self
            .criteria
            .iter()
            .map(|c| c.validate().map(|field| (field, c)))
            .collect::<Result<Vec<_>>>()?;
        if let Some(range) = &self.date_range {
            range.validate()?;
        }
        if !self.text.is_empty() && self.text.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::invalid_criteria("text", "no search terms given"));
        }
        Ok(resolved)
    }

    /// Fields searched by free-text terms.
    #[must_use]
    pub fn free_text_fields() -> Vec<Field> {
        FREE_TEXT_CODES.iter().filter_map(|code| Field::resolve(code)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiters::RESEARCHER_FORMAT;

    #[test]
    fn test_field_resolution() {
        assert!(matches!(Field::resolve("PC"), Some(Field::Column(c)) if c.code == "PC"));
        assert!(matches!(
            Field::resolve("Country of publication"),
            Some(Field::Column(c)) if c.code == "PC"
        ));
        assert_eq!(Field::resolve("SU"), Some(Field::Category(Category::Topics)));
        assert_eq!(Field::resolve("Topics"), Some(Field::Category(Category::Topics)));
        assert_eq!(Field::resolve("ID"), Some(Field::Identifier));
        assert!(matches!(Field::resolve("Title"), Some(Field::Column(c)) if c.code == "TT"));
        assert_eq!(Field::resolve("Titles"), Some(Field::Category(Category::Titles)));
        assert_eq!(Field::resolve("nonsense"), None);
    }

    #[test]
    fn test_operator_matching() {
        let d = RESEARCHER_FORMAT;
        assert!(Operator::Exact.matches(&d, "Civil rights--History", "History"));
        assert!(Operator::Exact.matches(&d, "Civil rights--History", "Civil rights--History"));
        assert!(!Operator::Exact.matches(&d, "Civil rights--History", "history"));
        assert!(!Operator::Exact.matches(&d, "Civil rights--History", "rights"));
        assert!(Operator::Contains.matches(&d, "Civil rights--History", "RIGHTS"));
        assert!(Operator::Contains.matches(&d, "Civil rights--History", "civil rights--history"));
        assert!(!Operator::Contains.matches(&d, "Civil rights--History", "rights--hist"));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("Exact".parse::<Operator>().ok(), Some(Operator::Exact));
        assert_eq!("contains".parse::<Operator>().ok(), Some(Operator::Contains));
        assert!("between".parse::<Operator>().is_err());
    }

    #[test]
    fn test_validation_failures() {
        let unknown = Criteria::new().with_criterion(Criterion::new("XX", Operator::Exact, ["a"]));
        assert!(matches!(unknown.validate(), Err(Error::InvalidCriteria { .. })));

        let empty = Criteria::new().with_criterion(Criterion::new("PC", Operator::Exact, [""]));
        assert!(empty.validate().is_err());

        let reversed = Criteria::new().with_date_range(DateRange::new(Some(1900), Some(1800)));
        assert!(reversed.validate().is_err());

        let short = Criteria::new().with_date_range(DateRange::new(Some(99), None));
        assert!(short.validate().is_err());

        assert!(Criteria::new().validate().expect("empty is valid").is_empty());
    }

    #[test]
    fn test_free_text_fields() {
        let fields = Criteria::free_text_fields();
        assert_eq!(fields.len(), FREE_TEXT_CODES.len());
        assert!(fields.contains(&Field::Category(Category::Names)));
        assert!(fields.contains(&Field::Category(Category::Topics)));
    }

    #[test]
    fn test_json_shape() {
        let criterion: Criterion =
            serde_json::from_str(r#"{"field": "PC", "op": "contains", "values": ["eng"]}"#)
                .expect("valid json");
        assert_eq!(criterion.operator, Operator::Contains);
        let default_op: Criterion =
            serde_json::from_str(r#"{"field": "PC", "values": ["England"]}"#).expect("valid json");
        assert_eq!(default_op.operator, Operator::Exact);
    }
}
