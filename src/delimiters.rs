//! Repeat and facet delimiters.
//!
//! Researcher Format packs several values into one cell with a repeat
//! delimiter (`London ; New York`) and packs a hierarchy into one value with a
//! facet delimiter (`Civil rights--History`). Neither convention has an escape
//! mechanism, so values are checked at ingestion and anything that would make
//! a later split ambiguous is reported as a [`DelimiterAnomaly`] instead of
//! being rewritten.

use std::fmt;

/// The delimiter pair used by one output convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    /// Separates independent values within one cell.
    pub repeat: char,
    /// Separates hierarchical sub-values within one value.
    pub facet: &'static str,
}

/// The Researcher Format delimiters: `;` and `--`.
pub const RESEARCHER_FORMAT: Delimiters = Delimiters {
    repeat: ';',
    facet: "--",
};

impl Default for Delimiters {
    fn default() -> Self {
        RESEARCHER_FORMAT
    }
}

/// A value whose delimiter characters do not fit the expected structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelimiterAnomaly {
    /// The repeat delimiter occurs inside a single category value.
    RepeatInsideValue,
    /// The value has an empty facet (leading, trailing or doubled delimiter).
    EmptyFacet,
    /// A run of hyphens longer than the facet delimiter.
    OverlongFacetDelimiter,
}

impl fmt::Display for DelimiterAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelimiterAnomaly::RepeatInsideValue => f.write_str("repeat delimiter inside value"),
            DelimiterAnomaly::EmptyFacet => f.write_str("empty facet"),
            DelimiterAnomaly::OverlongFacetDelimiter => {
                f.write_str("hyphen run longer than the facet delimiter")
            },
        }
    }
}

impl Delimiters {
    /// Join values into one cell: `a ; b ; c`. Empty values are dropped.
    #[must_use]
    pub fn join_repeats<S: AsRef<str>>(&self, values: &[S]) -> String {
        let sep = format!(" {} ", self.repeat);
        values
            .iter()
            .map(AsRef::as_ref)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(&sep)
    }

    /// Split a cell into its values, trimming whitespace and dropping empties.
    #[must_use]
    pub fn split_repeats<'a>(&self, cell: &'a str) -> Vec<&'a str> {
        cell.split(self.repeat)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Join facets into one value: `a--b`.
    #[must_use]
    pub fn join_facets<S: AsRef<str>>(&self, facets: &[S]) -> String {
        facets
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(self.facet)
    }

    /// Split a value into facets, trimming each one.
    ///
    /// A value without the facet delimiter is a single facet.
    #[must_use]
    pub fn split_facets<'a>(&self, value: &'a str) -> Vec<&'a str> {
        value.split(self.facet).map(str::trim).collect()
    }

    /// Check a category value for delimiter characters in positions that a
    /// later split would misread.
    ///
    /// # Errors
    ///
    /// Returns the first [`DelimiterAnomaly`] found. The caller keeps the
    /// value unchanged and flags it for review.
    pub fn check_value(&self, value: &str) -> Result<(), DelimiterAnomaly> {
        if value.contains(self.repeat) {
            return Err(DelimiterAnomaly::RepeatInsideValue);
        }
        if !value.contains(self.facet) {
            return Ok(());
        }
        let facet_len = self.facet.chars().count();
        let mut run = 0usize;
        for ch in value.chars() {
            if self.facet.starts_with(ch) {
                run += 1;
                if run > facet_len {
                    return Err(DelimiterAnomaly::OverlongFacetDelimiter);
                }
            } else {
                run = 0;
            }
        }
        if self.split_facets(value).iter().any(|f| f.is_empty()) {
            return Err(DelimiterAnomaly::EmptyFacet);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_join_repeats() {
        let d = Delimiters::default();
        assert_eq!(d.join_repeats(&["London", "New York"]), "London ; New York");
        assert_eq!(d.join_repeats(&["", "Paris", ""]), "Paris");
        assert_eq!(d.join_repeats::<&str>(&[]), "");
    }

    #[test]
    fn test_split_repeats() {
        let d = Delimiters::default();
        assert_eq!(d.split_repeats("London ; New York"), vec!["London", "New York"]);
        assert!(d.split_repeats("").is_empty());
    }

    #[test]
    fn test_split_facets() {
        let d = Delimiters::default();
        assert_eq!(
            d.split_facets("Civil rights--History"),
            vec!["Civil rights", "History"]
        );
        assert_eq!(d.split_facets("History"), vec!["History"]);
        assert_eq!(d.join_facets(&["Civil rights", "History"]), "Civil rights--History");
    }

    #[test]
    fn test_hyphenated_words_are_not_facets() {
        let d = Delimiters::default();
        assert_eq!(d.split_facets("Stratford-upon-Avon"), vec!["Stratford-upon-Avon"]);
        assert_eq!(d.check_value("Stratford-upon-Avon"), Ok(()));
    }

    #[test]
    fn test_check_value_anomalies() {
        let d = Delimiters::default();
        assert_eq!(d.check_value("Civil rights--History"), Ok(()));
        assert_eq!(
            d.check_value("Letters; diaries"),
            Err(DelimiterAnomaly::RepeatInsideValue)
        );
        assert_eq!(d.check_value("--History"), Err(DelimiterAnomaly::EmptyFacet));
        assert_eq!(d.check_value("History--"), Err(DelimiterAnomaly::EmptyFacet));
        assert_eq!(
            d.check_value("Civil rights---History"),
            Err(DelimiterAnomaly::OverlongFacetDelimiter)
        );
        assert_eq!(
            d.check_value("Civil rights----History"),
            Err(DelimiterAnomaly::OverlongFacetDelimiter)
        );
    }

    proptest! {
        #[test]
        fn prop_well_formed_facets_split_back(facets in prop::collection::vec("[A-Za-z][A-Za-z ]{0,10}[A-Za-z]", 1..5)) {
            let d = Delimiters::default();
            let value = d.join_facets(&facets);
            prop_assert_eq!(d.check_value(&value), Ok(()));
            prop_assert_eq!(d.split_facets(&value), facets.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
