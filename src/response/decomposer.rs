//! Assembly of client results from raw engine responses.

use std::collections::BTreeMap;

use regex::{Captures, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::request::SearchRequest;
use crate::response::aggregation::{flatten_aggregations, parse_aggregations};
use crate::response::facets::{FacetStats, collect_facets};
use crate::response::hits::project_hits;
use crate::rules::QueryRuleActions;
use crate::settings::{FacetBuckets, SearchSettings};

/// Facet ordering hint for the client UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingContent {
    pub facet_ordering: FacetOrdering,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetOrdering {
    pub facets: FacetOrder,
    pub values: BTreeMap<String, ValueOrdering>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetOrder {
    pub order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueOrdering {
    pub sort_remaining_by: String,
}

impl Default for ValueOrdering {
    fn default() -> Self {
        ValueOrdering {
            sort_remaining_by: "count".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exhaustive {
    pub facets_count: bool,
    pub nb_hits: bool,
    pub typo: bool,
}

impl Default for Exhaustive {
    fn default() -> Self {
        Exhaustive {
            facets_count: true,
            nb_hits: true,
            typo: true,
        }
    }
}

/// Result of a full search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hits: Vec<Value>,
    pub facets: BTreeMap<String, FacetBuckets>,
    #[serde(rename = "facets_stats")]
    pub facets_stats: BTreeMap<String, FacetStats>,
    pub nb_hits: u64,
    pub nb_pages: u64,
    pub page: u64,
    pub hits_per_page: i64,
    #[serde(rename = "processingTimeMS")]
    pub processing_time_ms: u64,
    pub rendering_content: RenderingContent,
    pub applied_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_data: Vec<Value>,
    pub index: String,
    pub query: String,
    pub params: String,
    pub exhaustive_nb_hits: bool,
    pub exhaustive_facets_count: bool,
    pub exhaustive_typo: bool,
    pub exhaustive: Exhaustive,
}

/// One facet value returned by a facet value search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetHit {
    pub value: String,
    pub highlighted: String,
    pub count: u64,
}

/// Result of a facet value search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValuesResult {
    pub facet_hits: Vec<FacetHit>,
    pub exhaustive_facets_count: bool,
    #[serde(rename = "processingTimeMS")]
    pub processing_time_ms: u64,
}

/// Either kind of client result, serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientResult {
    Search(Box<SearchResult>),
    FacetValues(FacetValuesResult),
}

/// Decompose the engine response for one request.
///
/// Facet value requests take the facet hits path; everything else becomes a
/// [`SearchResult`].
pub fn decompose(
    raw: &Value,
    request: &SearchRequest,
    settings: &SearchSettings,
    actions: &QueryRuleActions,
) -> Result<ClientResult> {
    if request.is_facet_values_request() {
        return Ok(ClientResult::FacetValues(decompose_facet_values(raw, request)));
    }
    Ok(ClientResult::Search(Box::new(decompose_search(
        raw, request, settings, actions,
    )?)))
}

/// Decompose a full search response.
pub fn decompose_search(
    raw: &Value,
    request: &SearchRequest,
    settings: &SearchSettings,
    actions: &QueryRuleActions,
) -> Result<SearchResult> {
    let params = &request.params;
    let facets = match raw.get("aggregations") {
        Some(aggregations) => {
            let flat = flatten_aggregations(&parse_aggregations(aggregations)?);
            collect_facets(&flat, settings)?
        }
        None => Default::default(),
    };

    let nb_hits = total_hits(raw);
    let hits_per_page = params.hits_per_page();

    Ok(SearchResult {
        hits: project_hits(raw, settings, params),
        facets: facets.facets,
        facets_stats: facets.facets_stats,
        nb_hits,
        nb_pages: page_count(nb_hits, hits_per_page),
        page: params.page(),
        hits_per_page,
        processing_time_ms: took(raw),
        rendering_content: rendering_content(settings, actions),
        applied_rules: actions.rule_ids.clone(),
        user_data: actions.user_data.clone(),
        index: request.index_name.clone(),
        query: actions.effective_query(params.query()).to_string(),
        params: params.to_query_string(),
        exhaustive_nb_hits: true,
        exhaustive_facets_count: true,
        exhaustive_typo: true,
        exhaustive: Exhaustive::default(),
    })
}

/// Decompose a facet value search response.
///
/// Reads the first top-level aggregation, descending one level when it holds
/// a child named after the facet.
pub fn decompose_facet_values(raw: &Value, request: &SearchRequest) -> FacetValuesResult {
    let params = &request.params;
    let facet_name = params.facet_name.as_deref().unwrap_or_default();

    let aggregation = raw
        .get("aggregations")
        .and_then(Value::as_object)
        .and_then(|aggregations| aggregations.values().next())
        .map(|aggregation| aggregation.get(facet_name).unwrap_or(aggregation));

    let buckets = aggregation
        .and_then(|aggregation| aggregation.get("buckets"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let facet_query = params.facet_query.as_deref().unwrap_or_default();
    let facet_hits = buckets
        .iter()
        .map(|bucket| {
            let value = match bucket.get("key") {
                Some(Value::String(key)) => key.clone(),
                Some(key) => key.to_string(),
                None => String::new(),
            };
            FacetHit {
                highlighted: highlight_term(
                    &value,
                    facet_query,
                    params.highlight_pre_tag(),
                    params.highlight_post_tag(),
                ),
                count: bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0),
                value,
            }
        })
        .collect();

    FacetValuesResult {
        facet_hits,
        exhaustive_facets_count: true,
        processing_time_ms: took(raw),
    }
}

/// Wrap every case-insensitive occurrence of `term` in the highlight tags.
pub fn highlight_term(value: &str, term: &str, pre_tag: &str, post_tag: &str) -> String {
    if term.is_empty() {
        return value.to_string();
    }
    match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re
            .replace_all(value, |caps: &Captures| format!("{pre_tag}{}{post_tag}", &caps[0]))
            .into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Number of pages for `total` hits; zero when the page size is not positive.
pub fn page_count(total: u64, hits_per_page: i64) -> u64 {
    if hits_per_page <= 0 {
        return 0;
    }
    total.div_ceil(hits_per_page as u64)
}

fn total_hits(raw: &Value) -> u64 {
    match raw.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    }
}

fn took(raw: &Value) -> u64 {
    raw.get("took").and_then(Value::as_u64).unwrap_or(0)
}

fn rendering_content(settings: &SearchSettings, actions: &QueryRuleActions) -> RenderingContent {
    let explicit = actions.facet_attributes_order.as_ref();
    let order = match explicit {
        Some(order) => order.clone(),
        None => settings
            .facet_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let values = settings
        .facet_names()
        .into_iter()
        .filter(|name| explicit.is_none_or(|order| order.iter().any(|o| o == name)))
        .map(|name| (name.to_string(), ValueOrdering::default()))
        .collect();

    RenderingContent {
        facet_ordering: FacetOrdering {
            facets: FacetOrder { order },
            values,
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Number, json};

    use super::*;
    use crate::request::SearchParams;
    use crate::settings::FacetAttributeConfig;

    fn settings() -> SearchSettings {
        SearchSettings {
            facet_attributes: vec![
                FacetAttributeConfig::string("type"),
                FacetAttributeConfig::string("actors").with_nested_path("cast"),
                FacetAttributeConfig::numeric("imdbrating", "imdbrating"),
            ],
            ..Default::default()
        }
    }

    fn raw() -> Value {
        json!({
            "took": 7,
            "hits": {"total": {"value": 105}, "hits": []},
            "aggregations": {
                "type": {"buckets": [{"key": "movie", "doc_count": 90}]},
                "cast.": {
                    "doc_count": 300,
                    "actors": {"buckets": [{"key": "Morgan Freeman", "doc_count": 4}]}
                },
                "imdbrating$_stats": {"min": 1.0, "max": 9.0, "avg": 5.0, "sum": 50.0},
                "imdbrating$_entries": {"buckets": []}
            }
        })
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(105, 20), 6);
        assert_eq!(page_count(100, 20), 5);
        assert_eq!(page_count(105, 0), 0);
        assert_eq!(page_count(105, -1), 0);
    }

    #[test]
    fn test_decompose_search() {
        let request = SearchRequest::new(
            "movies",
            SearchParams {
                query: Some("shawshank".to_string()),
                hits_per_page: Some(20),
                ..Default::default()
            },
        );
        let actions = QueryRuleActions {
            rule_ids: vec!["pin-shawshank".to_string()],
            ..Default::default()
        };

        let result = decompose_search(&raw(), &request, &settings(), &actions).unwrap();
        assert_eq!(result.nb_hits, 105);
        assert_eq!(result.nb_pages, 6);
        assert_eq!(result.processing_time_ms, 7);
        assert_eq!(result.facets["type"]["movie"], 90);
        assert_eq!(result.facets["actors"]["Morgan Freeman"], 4);
        assert_eq!(result.facets_stats["imdbrating"].max, Number::from_f64(9.0));
        assert_eq!(result.applied_rules, vec!["pin-shawshank"]);
        assert_eq!(result.query, "shawshank");
        assert_eq!(
            result.rendering_content.facet_ordering.facets.order,
            vec!["type", "actors", "imdbrating"]
        );

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("userData").is_none());
        assert_eq!(value["processingTimeMS"], 7);
        assert_eq!(value["nbPages"], 6);
        assert!(value.get("facets_stats").is_some());
    }

    #[test]
    fn test_explicit_facet_order_omits_unlisted_values() {
        let actions = QueryRuleActions {
            facet_attributes_order: Some(vec!["imdbrating".to_string(), "type".to_string()]),
            user_data: vec![json!({"banner": "sale"})],
            ..Default::default()
        };
        let request = SearchRequest::new("movies", SearchParams::default());

        let result = decompose_search(&raw(), &request, &settings(), &actions).unwrap();
        let ordering = &result.rendering_content.facet_ordering;
        assert_eq!(ordering.facets.order, vec!["imdbrating", "type"]);
        assert!(ordering.values.contains_key("type"));
        assert!(!ordering.values.contains_key("actors"));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["userData"], json!([{"banner": "sale"}]));
        assert_eq!(
            value["renderingContent"]["facetOrdering"]["values"]["type"]["sortRemainingBy"],
            "count"
        );
    }

    #[test]
    fn test_empty_nested_group_yields_no_facet() {
        let raw = json!({
            "took": 1,
            "hits": {"total": {"value": 0}, "hits": []},
            "aggregations": {"type": {"buckets": []}, "kw.": {"doc_count": 0}}
        });
        let request = SearchRequest::new("movies", SearchParams::default());

        let result =
            decompose_search(&raw, &request, &settings(), &QueryRuleActions::default()).unwrap();
        assert_eq!(result.facets.keys().collect::<Vec<_>>(), vec!["type"]);
    }

    #[test]
    fn test_missing_stats_propagates() {
        let mut raw = raw();
        raw["aggregations"]
            .as_object_mut()
            .unwrap()
            .remove("imdbrating$_stats");
        let request = SearchRequest::new("movies", SearchParams::default());

        assert!(
            decompose_search(&raw, &request, &settings(), &QueryRuleActions::default()).is_err()
        );
    }

    #[test]
    fn test_decompose_facet_values() {
        let raw = json!({
            "took": 3,
            "aggregations": {
                "cast.": {
                    "doc_count": 12,
                    "actors": {"buckets": [
                        {"key": "Morgan Freeman", "doc_count": 4},
                        {"key": "Tim Robbins", "doc_count": 1}
                    ]}
                }
            }
        });
        let request = SearchRequest::new(
            "movies",
            SearchParams {
                facet_name: Some("actors".to_string()),
                facet_query: Some("mor".to_string()),
                highlight_pre_tag: Some("<b>".to_string()),
                highlight_post_tag: Some("</b>".to_string()),
                ..Default::default()
            },
        );

        let result = match decompose(&raw, &request, &settings(), &QueryRuleActions::default()) {
            Ok(ClientResult::FacetValues(result)) => result,
            other => panic!("unexpected result: {other:?}"),
        };
        assert_eq!(result.facet_hits.len(), 2);
        assert_eq!(result.facet_hits[0].highlighted, "<b>Mor</b>gan Freeman");
        assert_eq!(result.facet_hits[1].highlighted, "Tim Robbins");
        assert_eq!(result.facet_hits[0].count, 4);
        assert_eq!(result.processing_time_ms, 3);
    }

    #[test]
    fn test_highlight_term_escapes_pattern() {
        assert_eq!(highlight_term("a+b", "+", "[", "]"), "a[+]b");
        assert_eq!(highlight_term("abc", "", "[", "]"), "abc");
    }
}
