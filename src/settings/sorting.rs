//! Named sort orders and index-name resolution.
//!
//! A client may select a sort order either explicitly (`sortBy`) or by
//! addressing a "replica" index whose name is the base index followed by a
//! sort key, e.g. `movies_price_desc` for the sort key `_price_desc`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Sort key used when a request does not name one.
pub const DEFAULT_SORT_KEY: &str = "default";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// A named sort order: a single criterion or a list of tie-breakers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortOption {
    Single(SortField),
    Multiple(Vec<SortField>),
}

impl SortOption {
    /// Engine `sort` clause.
    pub fn to_engine_sort(&self) -> Value {
        let fields: &[SortField] = match self {
            SortOption::Single(field) => std::slice::from_ref(field),
            SortOption::Multiple(fields) => fields,
        };

        Value::Array(
            fields
                .iter()
                .map(|sort| json!({ sort.field.as_str(): { "order": sort.order.as_str() } }))
                .collect(),
        )
    }
}

/// Engine index and sort key derived from a client index name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndex {
    pub index: String,
    pub sort_key: Option<String>,
}

/// Split a client index name into the engine index and an optional sort key.
///
/// The longest matching sort-key suffix wins; a name that is exactly a sort
/// key is left untouched.
pub fn resolve_index(index_name: &str, sorting: &BTreeMap<String, SortOption>) -> ResolvedIndex {
    let suffix = sorting
        .keys()
        .filter(|key| key.as_str() != DEFAULT_SORT_KEY)
        .filter(|key| index_name.len() > key.len() && index_name.ends_with(key.as_str()))
        .max_by_key(|key| key.len());

    match suffix {
        Some(key) => ResolvedIndex {
            index: index_name[..index_name.len() - key.len()].to_string(),
            sort_key: Some(key.clone()),
        },
        None => ResolvedIndex {
            index: index_name.to_string(),
            sort_key: None,
        },
    }
}

/// Pick the sort option named by `sort_key`, falling back to the default.
pub fn resolve_sort<'a>(
    sort_key: Option<&str>,
    sorting: &'a BTreeMap<String, SortOption>,
) -> Option<&'a SortOption> {
    if let Some(key) = sort_key {
        if let Some(option) = sorting.get(key) {
            return Some(option);
        }
        log::warn!("unknown sort option '{key}', using default");
    }
    sorting.get(DEFAULT_SORT_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorting() -> BTreeMap<String, SortOption> {
        serde_json::from_value(json!({
            "default": {"field": "_score", "order": "desc"},
            "_price_desc": {"field": "price", "order": "desc"},
            "_price_asc": [{"field": "price", "order": "asc"}, {"field": "title", "order": "asc"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_index_with_sort_suffix() {
        let resolved = resolve_index("movies_price_desc", &sorting());
        assert_eq!(resolved.index, "movies");
        assert_eq!(resolved.sort_key.as_deref(), Some("_price_desc"));

        let plain = resolve_index("movies", &sorting());
        assert_eq!(plain.index, "movies");
        assert!(plain.sort_key.is_none());
    }

    #[test]
    fn test_resolve_sort_falls_back_to_default() {
        let sorting = sorting();
        let sort = resolve_sort(Some("_missing"), &sorting).unwrap();
        assert_eq!(sort.to_engine_sort(), json!([{"_score": {"order": "desc"}}]));

        assert!(resolve_sort(None, &BTreeMap::new()).is_none());
    }

    #[test]
    fn test_multi_field_sort() {
        let sorting = sorting();
        let sort = resolve_sort(Some("_price_asc"), &sorting).unwrap();
        assert_eq!(
            sort.to_engine_sort(),
            json!([{"price": {"order": "asc"}}, {"title": {"order": "asc"}}])
        );
    }
}
