//! Client search requests and their filter parameters.
//!
//! Requests follow the instant-search wire format: an index name plus a
//! `params` object with camelCase keys. Facet and numeric filters accept a
//! single string or a list whose items are strings (all must hold) or lists
//! of strings (any may hold).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{HopliteError, Result};

/// Page size used when a request does not set `hitsPerPage`.
pub const DEFAULT_HITS_PER_PAGE: i64 = 20;
/// Bucket count used when a request does not set `maxValuesPerFacet`.
pub const DEFAULT_MAX_VALUES_PER_FACET: usize = 10;
/// Bucket count used when a request does not set `maxFacetHits`.
pub const DEFAULT_MAX_FACET_HITS: usize = 10;
/// Highlight tags used when a request does not set its own.
pub const DEFAULT_HIGHLIGHT_PRE_TAG: &str = "<ais-highlight-0000000000>";
pub const DEFAULT_HIGHLIGHT_POST_TAG: &str = "</ais-highlight-0000000000>";

/// One search request of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub index_name: String,
    #[serde(default)]
    pub params: SearchParams,
}

impl SearchRequest {
    pub fn new<S: Into<String>>(index_name: S, params: SearchParams) -> Self {
        SearchRequest {
            index_name: index_name.into(),
            params,
        }
    }

    /// Whether the request searches within one facet's values.
    pub fn is_facet_values_request(&self) -> bool {
        self.params.facet_name.is_some()
    }
}

/// Request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet_filters: Option<FilterList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_filters: Option<FilterList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_pre_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_post_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<StringOrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values_per_facet: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_facet_hits: Option<usize>,
    /// Parameters this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SearchParams {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(0)
    }

    pub fn hits_per_page(&self) -> i64 {
        self.hits_per_page.unwrap_or(DEFAULT_HITS_PER_PAGE)
    }

    pub fn max_values_per_facet(&self) -> usize {
        self.max_values_per_facet
            .unwrap_or(DEFAULT_MAX_VALUES_PER_FACET)
    }

    pub fn max_facet_hits(&self) -> usize {
        self.max_facet_hits.unwrap_or(DEFAULT_MAX_FACET_HITS)
    }

    pub fn highlight_pre_tag(&self) -> &str {
        self.highlight_pre_tag
            .as_deref()
            .unwrap_or(DEFAULT_HIGHLIGHT_PRE_TAG)
    }

    pub fn highlight_post_tag(&self) -> &str {
        self.highlight_post_tag
            .as_deref()
            .unwrap_or(DEFAULT_HIGHLIGHT_POST_TAG)
    }

    /// Facets the client asked for; `None` means every declared facet.
    pub fn requested_facets(&self) -> Option<Vec<&str>> {
        let facets = self.facets.as_ref()?.as_slice();
        if facets.iter().any(|facet| facet == "*") {
            return None;
        }
        Some(facets.iter().map(String::as_str).collect())
    }

    /// Parsed facet filters, preserving AND/OR grouping.
    pub fn facet_filter_groups(&self) -> Result<Vec<FilterGroup<FacetFilter>>> {
        match &self.facet_filters {
            Some(list) => list.parse_with(FacetFilter::parse),
            None => Ok(Vec::new()),
        }
    }

    /// Parsed numeric filters, preserving AND/OR grouping.
    pub fn numeric_filter_groups(&self) -> Result<Vec<FilterGroup<NumericFilter>>> {
        match &self.numeric_filters {
            Some(list) => list.parse_with(NumericFilter::parse),
            None => Ok(Vec::new()),
        }
    }

    /// Positive `attribute:value` facet filters currently applied.
    ///
    /// Entries that do not parse are skipped.
    pub fn active_facet_filters(&self) -> Vec<FacetFilter> {
        let Some(list) = &self.facet_filters else {
            return Vec::new();
        };

        list.raw_filters()
            .filter_map(|raw| FacetFilter::parse(raw).ok())
            .filter(|filter| !filter.negated)
            .collect()
    }

    /// URL-encoded form of the parameters.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Ok(Value::Object(map)) = serde_json::to_value(self) {
            for (key, value) in &map {
                serializer.append_pair(key, &flatten_param(value));
            }
        }
        serializer.finish()
    }
}

fn flatten_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(flatten_param)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            StringOrList::One(value) => std::slice::from_ref(value),
            StringOrList::Many(values) => values,
        }
    }
}

/// Item of a filter list: a single filter or a disjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterEntry {
    Filter(String),
    AnyOf(Vec<String>),
}

/// Filter parameter as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterList {
    Single(String),
    List(Vec<FilterEntry>),
}

impl FilterList {
    fn parse_with<T, F>(&self, parse: F) -> Result<Vec<FilterGroup<T>>>
    where
        F: Fn(&str) -> Result<T>,
    {
        match self {
            FilterList::Single(raw) => Ok(vec![FilterGroup::One(parse(raw)?)]),
            FilterList::List(entries) => entries
                .iter()
                .map(|entry| match entry {
                    FilterEntry::Filter(raw) => Ok(FilterGroup::One(parse(raw)?)),
                    FilterEntry::AnyOf(raws) => Ok(FilterGroup::AnyOf(
                        raws.iter().map(|raw| parse(raw)).collect::<Result<Vec<_>>>()?,
                    )),
                })
                .collect(),
        }
    }

    fn raw_filters(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            FilterList::Single(raw) => Box::new(std::iter::once(raw.as_str())),
            FilterList::List(entries) => Box::new(entries.iter().flat_map(|entry| {
                let raws: Vec<&str> = match entry {
                    FilterEntry::Filter(raw) => vec![raw.as_str()],
                    FilterEntry::AnyOf(raws) => raws.iter().map(String::as_str).collect(),
                };
                raws
            })),
        }
    }
}

/// Filters combined conjunctively at the top level.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterGroup<T> {
    /// A single filter that must hold.
    One(T),
    /// At least one of the filters must hold.
    AnyOf(Vec<T>),
}

/// `attribute:value`, negated with a leading `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFilter {
    pub attribute: String,
    pub value: String,
    pub negated: bool,
}

impl FacetFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        let (negated, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (attribute, value) = body.split_once(':').ok_or_else(|| {
            HopliteError::query_compile(format!("facet filter '{raw}' is not attribute:value"))
        })?;

        if attribute.is_empty() {
            return Err(HopliteError::query_compile(format!(
                "facet filter '{raw}' has no attribute"
            )));
        }

        Ok(FacetFilter {
            attribute: attribute.to_string(),
            value: value.to_string(),
            negated,
        })
    }
}

/// Numeric comparison against a facet attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericComparison {
    Gt(Number),
    Gte(Number),
    Lt(Number),
    Lte(Number),
    Eq(Number),
    NotEq(Number),
    Between(Number, Number),
}

/// Parsed numeric filter such as `price>=10` or `price:10 TO 20`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericFilter {
    pub attribute: String,
    pub comparison: NumericComparison,
}

impl NumericFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = || HopliteError::query_compile(format!("invalid numeric filter '{raw}'"));

        if let Some((attribute, range)) = trimmed.split_once(':') {
            let (lower, upper) = range.split_once(" TO ").ok_or_else(invalid)?;
            return Ok(NumericFilter {
                attribute: attribute.trim().to_string(),
                comparison: NumericComparison::Between(
                    parse_number(lower.trim()).ok_or_else(invalid)?,
                    parse_number(upper.trim()).ok_or_else(invalid)?,
                ),
            });
        }

        for op in [">=", "<=", "!=", ">", "<", "="] {
            let Some(pos) = trimmed.find(op) else {
                continue;
            };
            let attribute = trimmed[..pos].trim();
            if attribute.is_empty() {
                return Err(invalid());
            }
            let number = parse_number(trimmed[pos + op.len()..].trim()).ok_or_else(invalid)?;
            let comparison = match op {
                ">=" => NumericComparison::Gte(number),
                "<=" => NumericComparison::Lte(number),
                "!=" => NumericComparison::NotEq(number),
                ">" => NumericComparison::Gt(number),
                "<" => NumericComparison::Lt(number),
                _ => NumericComparison::Eq(number),
            };
            return Ok(NumericFilter {
                attribute: attribute.to_string(),
                comparison,
            });
        }

        Err(invalid())
    }
}

/// Parse an integer or a finite float.
pub fn parse_number(text: &str) -> Option<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> SearchParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let params = SearchParams::default();
        assert_eq!(params.query(), "");
        assert_eq!(params.page(), 0);
        assert_eq!(params.hits_per_page(), 20);
        assert_eq!(params.highlight_pre_tag(), DEFAULT_HIGHLIGHT_PRE_TAG);
        assert!(params.requested_facets().is_none());
    }

    #[test]
    fn test_facet_filter_groups() {
        let params = params(json!({
            "facetFilters": [["type:movie", "type:series"], "-rated:R", "actors:Tom Hanks"]
        }));
        let groups = params.facet_filter_groups().unwrap();
        assert_eq!(groups.len(), 3);
        match &groups[0] {
            FilterGroup::AnyOf(filters) => assert_eq!(filters[1].value, "series"),
            other => panic!("expected disjunction, got {other:?}"),
        }
        match &groups[1] {
            FilterGroup::One(filter) => {
                assert!(filter.negated);
                assert_eq!(filter.attribute, "rated");
            }
            other => panic!("expected single filter, got {other:?}"),
        }

        let active = params.active_facet_filters();
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|f| !f.negated));
    }

    #[test]
    fn test_facet_filter_value_with_colon() {
        let filter = FacetFilter::parse("categories.lvl1:TV & Home Theater > TVs: 4K").unwrap();
        assert_eq!(filter.attribute, "categories.lvl1");
        assert_eq!(filter.value, "TV & Home Theater > TVs: 4K");

        assert!(FacetFilter::parse("no-separator").is_err());
    }

    #[test]
    fn test_numeric_filters() {
        let filter = NumericFilter::parse("price>=10").unwrap();
        assert_eq!(filter.attribute, "price");
        assert_eq!(filter.comparison, NumericComparison::Gte(Number::from(10)));

        let filter = NumericFilter::parse("rating != 2.5").unwrap();
        assert_eq!(
            filter.comparison,
            NumericComparison::NotEq(Number::from_f64(2.5).unwrap())
        );

        let filter = NumericFilter::parse("year:1990 TO 2000").unwrap();
        assert_eq!(
            filter.comparison,
            NumericComparison::Between(Number::from(1990), Number::from(2000))
        );

        assert!(NumericFilter::parse("price>>cheap").is_err());
        assert!(NumericFilter::parse(">=5").is_err());
    }

    #[test]
    fn test_requested_facets() {
        let all = params(json!({"facets": ["*"]}));
        assert!(all.requested_facets().is_none());

        let some = params(json!({"facets": "type"}));
        assert_eq!(some.requested_facets().unwrap(), vec!["type"]);
    }

    #[test]
    fn test_query_string() {
        let params = params(json!({"query": "tom hanks", "page": 1, "facets": ["type", "rated"]}));
        let encoded = params.to_query_string();
        assert!(encoded.contains("query=tom+hanks"));
        assert!(encoded.contains("page=1"));
        assert!(encoded.contains("facets=type%2Crated"));
    }

    #[test]
    fn test_unknown_params_are_kept() {
        let params = params(json!({"query": "a", "clickAnalytics": true}));
        assert_eq!(params.extra["clickAnalytics"], json!(true));
    }
}
