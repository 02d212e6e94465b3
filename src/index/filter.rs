//! Metadata filter evaluation for index queries.
//!
//! Filters restrict query results by exact-match, numeric-range, and
//! list-membership predicates on named metadata fields. A record that
//! lacks a field referenced by the filter is excluded, never matched.

use crate::types::{MetadataMap, MetadataValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single predicate on one metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    /// Field value equals this value exactly
    Equals(MetadataValue),

    /// Numeric field falls within the (inclusive) bounds; open bounds
    /// are allowed on either side
    Range { min: Option<f64>, max: Option<f64> },

    /// List field contains this item, or text field equals it
    Contains(String),
}

impl FilterPredicate {
    fn matches(&self, value: &MetadataValue) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Range { min, max } => match value {
                MetadataValue::Number(n) => {
                    min.is_none_or(|lo| *n >= lo) && max.is_none_or(|hi| *n <= hi)
                }
                _ => false,
            },
            Self::Contains(item) => match value {
                MetadataValue::List(items) => items.iter().any(|i| i == item),
                MetadataValue::Text(text) => text == item,
                _ => false,
            },
        }
    }
}

/// Conjunction of per-field predicates.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    predicates: HashMap<String, FilterPredicate>,
}

impl MetadataFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary predicate on `field`.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, predicate: FilterPredicate) -> Self {
        self.predicates.insert(field.into(), predicate);
        self
    }

    /// Require `field` to equal `value` exactly.
    #[must_use]
    pub fn equals(self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.field(field, FilterPredicate::Equals(value.into()))
    }

    /// Require a numeric `field` within the inclusive bounds.
    #[must_use]
    pub fn range(self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.field(field, FilterPredicate::Range { min, max })
    }

    /// Require a list `field` to contain `item`.
    #[must_use]
    pub fn contains(self, field: impl Into<String>, item: impl Into<String>) -> Self {
        self.field(field, FilterPredicate::Contains(item.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether a record's metadata satisfies every predicate.
    pub fn matches(&self, metadata: &MetadataMap) -> bool {
        self.predicates.iter().all(|(field, predicate)| {
            metadata
                .get(field)
                .is_some_and(|value| predicate.matches(value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_metadata() -> MetadataMap {
        let mut map = MetadataMap::new();
        map.insert("location".to_string(), "Tokyo".into());
        map.insert("experience_years".to_string(), 5.0.into());
        map.insert("remote".to_string(), true.into());
        map.insert(
            "skills".to_string(),
            vec!["python".to_string(), "aws".to_string()].into(),
        );
        map
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetadataFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&job_metadata()));
        assert!(filter.matches(&MetadataMap::new()));
    }

    #[test]
    fn test_equals_predicate() {
        let filter = MetadataFilter::new().equals("location", "Tokyo");
        assert!(filter.matches(&job_metadata()));

        let filter = MetadataFilter::new().equals("location", "Berlin");
        assert!(!filter.matches(&job_metadata()));

        let filter = MetadataFilter::new().equals("remote", true);
        assert!(filter.matches(&job_metadata()));
    }

    #[test]
    fn test_range_predicate() {
        let meta = job_metadata();

        assert!(
            MetadataFilter::new()
                .range("experience_years", Some(3.0), Some(8.0))
                .matches(&meta)
        );
        assert!(
            MetadataFilter::new()
                .range("experience_years", Some(5.0), None)
                .matches(&meta),
            "bounds are inclusive"
        );
        assert!(
            !MetadataFilter::new()
                .range("experience_years", Some(6.0), None)
                .matches(&meta)
        );
        assert!(
            !MetadataFilter::new()
                .range("location", Some(0.0), None)
                .matches(&meta),
            "range on a non-numeric field never matches"
        );
    }

    #[test]
    fn test_contains_predicate() {
        let meta = job_metadata();

        assert!(MetadataFilter::new().contains("skills", "python").matches(&meta));
        assert!(!MetadataFilter::new().contains("skills", "cobol").matches(&meta));
        assert!(
            MetadataFilter::new().contains("location", "Tokyo").matches(&meta),
            "contains on a text field degrades to equality"
        );
    }

    #[test]
    fn test_absent_field_excludes_record() {
        let filter = MetadataFilter::new().equals("salary_band", "senior");
        assert!(
            !filter.matches(&job_metadata()),
            "records missing a filtered field are excluded"
        );
    }

    #[test]
    fn test_conjunction() {
        let filter = MetadataFilter::new()
            .equals("location", "Tokyo")
            .contains("skills", "aws")
            .range("experience_years", None, Some(10.0));
        assert!(filter.matches(&job_metadata()));

        let filter = filter.equals("remote", false);
        assert!(!filter.matches(&job_metadata()), "one failing predicate fails the filter");
    }
}
