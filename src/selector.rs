//! Resolving [`Criteria`] to a set of record identifiers.
//!
//! The store narrows each condition to candidate rows with an indexed or
//! `LIKE` query; the exact comparison (facets, case rules) happens here,
//! one stored value at a time.

use std::collections::BTreeSet;

use crate::criteria::{Criteria, Criterion, Field, Operator};
use crate::delimiters::{Delimiters, RESEARCHER_FORMAT};
use crate::error::Result;
use crate::record::Category;
use crate::record_id::RecordId;
use crate::store::Store;

/// Selects records from a [`Store`].
///
/// # Examples
///
/// ```no_run
/// use iams2rf::criteria::{Criteria, Criterion, Operator};
/// use iams2rf::selector::Selector;
/// use iams2rf::store::Store;
///
/// let store = Store::open("iams.db")?;
/// let criteria = Criteria::new()
///     .with_criterion(Criterion::new("PC", Operator::Exact, ["England"]));
/// let ids = Selector::new(&store).select(&criteria)?;
/// println!("{} matching records", ids.len());
/// # Ok::<(), iams2rf::Error>(())
/// ```
#[derive(Debug)]
pub struct Selector<'a> {
    store: &'a Store,
    delimiters: Delimiters,
    excluded: BTreeSet<RecordId>,
}

impl<'a> Selector<'a> {
    /// Create a selector over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Selector {
            store,
            delimiters: RESEARCHER_FORMAT,
            excluded: BTreeSet::new(),
        }
    }

    /// Never select these records.
    #[must_use]
    pub fn with_exclusions(mut self, excluded: BTreeSet<RecordId>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Identifiers of the records matching `criteria`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCriteria`](crate::Error::InvalidCriteria) if
    /// validation fails, or a store error.
    pub fn select(&self, criteria: &Criteria) -> Result<BTreeSet<RecordId>> {
        let resolved = criteria.validate()?;
        let mut selected: Option<BTreeSet<RecordId>> = None;
        let mut narrow = |ids: BTreeSet<RecordId>| {
            selected = Some(match selected.take() {
                Some(current) => current.intersection(&ids).cloned().collect(),
                None => ids,
            });
        };

        for (field, criterion) in resolved {
            let ids = self.matching(field, criterion)?;
            tracing::debug!(criterion = %criterion, matches = ids.len(), "criterion evaluated");
            narrow(ids);
        }
        if let Some(range) = &criteria.date_range {
            let ids = self.store.ids_in_date_range(range.from, range.to)?;
            tracing::debug!(range = %range, matches = ids.len(), "date range evaluated");
            narrow(ids);
        }
        if !criteria.text.is_empty() {
            let ids = self.free_text(&criteria.text)?;
            tracing::debug!(matches = ids.len(), "free text evaluated");
            narrow(ids);
        }

        let mut ids = match selected {
            Some(ids) => ids,
            None => self.store.record_ids()?,
        };
        let before = ids.len();
        ids.retain(|id| !self.excluded.contains(id));
        if ids.len() < before {
            tracing::info!(removed = before - ids.len(), "excluded records removed");
        }
        tracing::info!(matches = ids.len(), "selection complete");
        Ok(ids)
    }

    /// Records matching any value of one criterion.
    fn matching(&self, field: Field, criterion: &Criterion) -> Result<BTreeSet<RecordId>> {
        let mut ids = BTreeSet::new();
        for value in criterion.values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            ids.extend(self.matching_value(field, criterion.operator, value)?);
        }
        Ok(ids)
    }

    fn matching_value(
        &self,
        field: Field,
        operator: Operator,
        value: &str,
    ) -> Result<BTreeSet<RecordId>> {
        match field {
            Field::Identifier => {
                let ids = self.store.record_ids()?;
                Ok(ids
                    .into_iter()
                    .filter(|id| operator.matches(&self.delimiters, id.as_str(), value))
                    .collect())
            },
            Field::Category(category) => self.category_matches(category, operator, value),
            Field::Column(column) => {
                let candidates = self.store.column_candidates(&column, value)?;
                Ok(candidates
                    .into_iter()
                    .filter(|(_, stored)| operator.matches(&self.delimiters, stored, value))
                    .map(|(id, _)| id)
                    .collect())
            },
        }
    }

    fn category_matches(
        &self,
        category: Category,
        operator: Operator,
        value: &str,
    ) -> Result<BTreeSet<RecordId>> {
        let mut ids = match operator {
            // Whole-value hits come straight off the value index.
            Operator::Exact => self.store.ids_with_value(category, value)?,
            Operator::Contains => BTreeSet::new(),
        };
        for (id, stored) in self.store.category_candidates(category, value)? {
            if ids.contains(&id) {
                continue;
            }
            if operator.matches(&self.delimiters, &stored, value) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    fn free_text(&self, terms: &[String]) -> Result<BTreeSet<RecordId>> {
        let mut ids = BTreeSet::new();
        for field in Criteria::free_text_fields() {
            for term in terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                if field == Field::Category(Category::Names) {
                    ids.extend(self.rendered_name_matches(term)?);
                } else {
                    ids.extend(self.matching_value(field, Operator::Contains, term)?);
                }
            }
        }
        Ok(ids)
    }

    /// Names are searched in their exported `Name, dates [role]` form.
    fn rendered_name_matches(&self, term: &str) -> Result<BTreeSet<RecordId>> {
        Ok(self
            .store
            .rendered_name_candidates(term)?
            .into_iter()
            .filter(|(_, rendered)| Operator::Contains.matches(&self.delimiters, rendered, term))
            .map(|(id, _)| id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::DateRange;
    use crate::record::Record;
    use crate::store::StoreWriter;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, Store) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("iams.db");
        let mut writer = StoreWriter::initialize(&path, false).expect("init");
        let records = [
            Record::builder("040-000000001")
                .field("PC", "England")
                .field("TT", "Letters from London")
                .topic("Civil rights--History", "general term")
                .years(Some(1850), Some(1860))
                .build(),
            Record::builder("040-000000002")
                .field("PC", "England")
                .field("PC", "Scotland")
                .topic("London", "place")
                .years(Some(1900), Some(1910))
                .build(),
            Record::builder("040-000000003")
                .field("PC", "France")
                .topic("Art history", "general term")
                .language("French")
                .build(),
        ];
        for record in records {
            writer.insert(&record.expect("valid")).expect("insert");
        }
        writer.finish().expect("finish");
        (dir, Store::open(&path).expect("open"))
    }

    fn ids(set: &BTreeSet<RecordId>) -> Vec<&str> {
        set.iter().map(RecordId::as_str).collect()
    }

    #[test]
    fn test_empty_criteria_selects_everything() {
        let (_dir, store) = store();
        let all = Selector::new(&store).select(&Criteria::new()).expect("select");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_and_across_fields_equals_intersection() {
        let (_dir, store) = store();
        let selector = Selector::new(&store);
        let country = Criterion::new("Country of publication", Operator::Exact, ["England"]);
        let topic = Criterion::new("Topics", Operator::Contains, ["History"]);

        let a = selector
            .select(&Criteria::new().with_criterion(country.clone()))
            .expect("select");
        let b = selector
            .select(&Criteria::new().with_criterion(topic.clone()))
            .expect("select");
        let both = selector
            .select(&Criteria::new().with_criterion(country).with_criterion(topic))
            .expect("select");

        assert_eq!(ids(&a), vec!["040-000000001", "040-000000002"]);
        assert_eq!(ids(&b), vec!["040-000000001", "040-000000003"]);
        let expected: BTreeSet<_> = a.intersection(&b).cloned().collect();
        assert_eq!(both, expected);
    }

    #[test]
    fn test_or_within_values_and_facets() {
        let (_dir, store) = store();
        let selector = Selector::new(&store);
        let facet = Criteria::new().with_criterion(Criterion::new(
            "Topics",
            Operator::Exact,
            ["History", "London"],
        ));
        assert_eq!(
            ids(&selector.select(&facet).expect("select")),
            vec!["040-000000001", "040-000000002"]
        );
        let case = Criteria::new().with_criterion(Criterion::new("SU", Operator::Exact, ["london"]));
        assert!(selector.select(&case).expect("select").is_empty());
    }

    #[test]
    fn test_contains_stays_within_one_facet() {
        let (_dir, store) = store();
        let selector = Selector::new(&store);
        let across = Criteria::new().with_criterion(Criterion::new(
            "Topics",
            Operator::Contains,
            ["rights--hist"],
        ));
        assert!(selector.select(&across).expect("select").is_empty());

        let within = Criteria::new().with_criterion(Criterion::new(
            "Topics",
            Operator::Contains,
            ["RIGHTS"],
        ));
        assert_eq!(ids(&selector.select(&within).expect("select")), vec!["040-000000001"]);
    }

    #[test]
    fn test_repeated_master_cells_split() {
        let (_dir, store) = store();
        let scotland =
            Criteria::new().with_criterion(Criterion::new("PC", Operator::Exact, ["Scotland"]));
        assert_eq!(
            ids(&Selector::new(&store).select(&scotland).expect("select")),
            vec!["040-000000002"]
        );
    }

    #[test]
    fn test_date_range_and_free_text() {
        let (_dir, store) = store();
        let selector = Selector::new(&store);
        let dates = Criteria::new().with_date_range(DateRange::new(Some(1855), Some(1899)));
        assert_eq!(ids(&selector.select(&dates).expect("select")), vec!["040-000000001"]);

        let text = Criteria::new().with_text(["london"]);
        assert_eq!(
            ids(&selector.select(&text).expect("select")),
            vec!["040-000000001", "040-000000002"]
        );
    }

    #[test]
    fn test_free_text_searches_rendered_names() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("iams.db");
        let mut writer = StoreWriter::initialize(&path, false).expect("init");
        let record = Record::builder("040-000000009")
            .name(crate::record::NameEntry {
                name: "Dickens, Charles".to_string(),
                dates: "1812-1870".to_string(),
                role: "author".to_string(),
                ..Default::default()
            })
            .build()
            .expect("valid");
        writer.insert(&record).expect("insert");
        writer.finish().expect("finish");
        let store = Store::open(&path).expect("open");
        let selector = Selector::new(&store);

        for term in ["1812-1870", "[author]", "charles"] {
            let text = Criteria::new().with_text([term]);
            assert_eq!(ids(&selector.select(&text).expect("select")), vec!["040-000000009"], "{term}");
        }
        let by_field =
            Criteria::new().with_criterion(Criterion::new("Names", Operator::Contains, ["1812"]));
        assert!(selector.select(&by_field).expect("select").is_empty());
    }

    #[test]
    fn test_exclusions_and_invalid_criteria() {
        let (_dir, store) = store();
        let excluded: BTreeSet<_> = [RecordId::parse("040-000000002").expect("id")].into();
        let selector = Selector::new(&store).with_exclusions(excluded);
        assert_eq!(selector.select(&Criteria::new()).expect("select").len(), 2);

        let bad = Criteria::new().with_criterion(Criterion::new("Nope", Operator::Exact, ["x"]));
        assert!(selector.select(&bad).is_err());
    }
}
