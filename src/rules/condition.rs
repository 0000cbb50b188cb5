//! Rule conditions.

use serde::{Deserialize, Serialize};

use crate::request::FacetFilter;

/// How a `query` condition compares against the request text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Exact,
    Prefix,
    Contains,
}

/// Attribute/value pair that must be among the active filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValue {
    pub attribute: String,
    pub value: String,
}

/// A single condition of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "camelCase")]
pub enum Condition {
    /// Compare the free-text query, ignoring case.
    Query {
        value: String,
        #[serde(default)]
        match_type: MatchType,
    },
    /// Every listed pair must be an active facet filter.
    FilterPresent { values: Vec<FilterValue> },
}

impl Condition {
    /// Evaluate against the request's query text and positive facet filters.
    pub fn is_satisfied(&self, query: &str, active_filters: &[FacetFilter]) -> bool {
        match self {
            Condition::Query { value, match_type } => {
                let query = query.to_lowercase();
                let value = value.to_lowercase();
                match match_type {
                    MatchType::Exact => query == value,
                    MatchType::Prefix => query.starts_with(&value),
                    MatchType::Contains => query.contains(&value),
                }
            }
            Condition::FilterPresent { values } => values.iter().all(|expected| {
                active_filters.iter().any(|filter| {
                    filter.attribute == expected.attribute && filter.value == expected.value
                })
            }),
        }
    }
}
