//! Request compilation.

use serde_json::{Map, Value, json};

use crate::client::hooks::{OrganicQuery, SearchHooks};
use crate::error::{HopliteError, Result};
use crate::query::aggregations::{build_aggregations, build_facet_values_aggregation};
use crate::query::filter::FilterExpr;
use crate::query::highlight::build_highlight;
use crate::request::{FacetFilter, FilterGroup, NumericComparison, NumericFilter, SearchRequest};
use crate::rules::QueryRuleActions;
use crate::settings::sorting::{resolve_index, resolve_sort};
use crate::settings::{FacetAttributeConfig, SearchSettings};

/// Compile one request into an engine query body.
pub fn compile_request(
    request: &SearchRequest,
    settings: &SearchSettings,
    actions: &QueryRuleActions,
    hooks: Option<&dyn SearchHooks>,
) -> Result<Value> {
    let params = &request.params;
    let mut body = Map::new();
    body.insert("query".to_string(), build_query(request, settings, actions, hooks)?);

    if let Some(facet_name) = params.facet_name.as_deref() {
        body.insert(
            "aggs".to_string(),
            Value::Object(build_facet_values_aggregation(settings, params, facet_name)?),
        );
        body.insert("size".to_string(), json!(0));
        return Ok(Value::Object(body));
    }

    let aggs = build_aggregations(settings, params);
    if !aggs.is_empty() {
        body.insert("aggs".to_string(), Value::Object(aggs));
    }

    let hits_per_page = params.hits_per_page().max(0) as u64;
    body.insert("size".to_string(), json!(hits_per_page));
    let from = params.page().checked_mul(hits_per_page).ok_or_else(|| {
        HopliteError::query_compile(format!(
            "page {} with {} hits per page is out of range",
            params.page(),
            hits_per_page
        ))
    })?;
    body.insert("from".to_string(), json!(from));

    let sort_key = params
        .sort_by
        .clone()
        .or_else(|| resolve_index(&request.index_name, &settings.sorting).sort_key);
    if let Some(sort) = resolve_sort(sort_key.as_deref(), &settings.sorting) {
        body.insert("sort".to_string(), sort.to_engine_sort());
    }

    if let Some(highlight) = build_highlight(settings, params) {
        body.insert("highlight".to_string(), highlight);
    }

    if !settings.result_attributes.is_empty() {
        body.insert(
            "_source".to_string(),
            json!({ "includes": settings.result_attributes }),
        );
    }

    Ok(Value::Object(body))
}

/// Built-in organic clause: fuzzy and prefix multi-field matching.
pub fn default_organic_query(query: &str, search_fields: &[String]) -> Value {
    json!({
        "bool": {
            "should": [
                {
                    "multi_match": {
                        "query": query,
                        "fields": search_fields,
                        "fuzziness": "AUTO:4,8"
                    }
                },
                {
                    "multi_match": {
                        "query": query,
                        "fields": search_fields,
                        "type": "bool_prefix"
                    }
                }
            ]
        }
    })
}

fn build_query(
    request: &SearchRequest,
    settings: &SearchSettings,
    actions: &QueryRuleActions,
    hooks: Option<&dyn SearchHooks>,
) -> Result<Value> {
    let mut filters = build_filters(request, settings)?;
    for expression in &actions.filters {
        filters.push(FilterExpr::parse(expression)?.to_query(settings));
    }

    let text = actions.effective_query(request.params.query());
    let mut query = organic_clause(text, settings, hooks);

    if !actions.pinned_ids.is_empty() {
        query = json!({
            "pinned": {
                "ids": actions.pinned_ids,
                "organic": query
            }
        });
    }

    if !actions.boosts.is_empty() || !actions.pinned_ids.is_empty() {
        let functions = actions
            .boosts
            .iter()
            .map(|boost| {
                Ok(json!({
                    "filter": FilterExpr::parse(&boost.query)?.to_query(settings),
                    "weight": boost.weight
                }))
            })
            .collect::<Result<Vec<Value>>>()?;

        query = json!({
            "function_score": {
                "query": query,
                "functions": functions
            }
        });
    }

    let mut clause = Map::new();
    if !filters.is_empty() {
        clause.insert("filter".to_string(), Value::Array(filters));
    }
    clause.insert("must".to_string(), query);
    Ok(json!({ "bool": clause }))
}

fn organic_clause(text: &str, settings: &SearchSettings, hooks: Option<&dyn SearchHooks>) -> Value {
    if text.is_empty() {
        return match_all();
    }

    let search_fields = settings.search_fields();
    let choice = hooks
        .map(|hooks| hooks.get_query(text, &search_fields))
        .unwrap_or(OrganicQuery::Default);

    match choice {
        OrganicQuery::Default => default_organic_query(text, &search_fields),
        OrganicQuery::Custom(clause) => clause,
        OrganicQuery::MatchAll => match_all(),
    }
}

fn match_all() -> Value {
    json!({ "match_all": {} })
}

fn build_filters(request: &SearchRequest, settings: &SearchSettings) -> Result<Vec<Value>> {
    let mut filters = Vec::new();

    for group in request.params.facet_filter_groups()? {
        filters.push(match group {
            FilterGroup::One(filter) => facet_filter_clause(&filter, settings)?,
            FilterGroup::AnyOf(any) => json!({
                "bool": {
                    "should": any
                        .iter()
                        .map(|filter| facet_filter_clause(filter, settings))
                        .collect::<Result<Vec<_>>>()?
                }
            }),
        });
    }

    for group in request.params.numeric_filter_groups()? {
        filters.push(match group {
            FilterGroup::One(filter) => numeric_filter_clause(&filter, settings)?,
            FilterGroup::AnyOf(any) => json!({
                "bool": {
                    "should": any
                        .iter()
                        .map(|filter| numeric_filter_clause(filter, settings))
                        .collect::<Result<Vec<_>>>()?
                }
            }),
        });
    }

    Ok(filters)
}

fn lookup_facet<'a>(settings: &'a SearchSettings, attribute: &str) -> Result<&'a FacetAttributeConfig> {
    settings.facet_config(attribute).ok_or_else(|| {
        HopliteError::query_compile(format!("no facet or filter attribute named '{attribute}'"))
    })
}

fn facet_filter_clause(filter: &FacetFilter, settings: &SearchSettings) -> Result<Value> {
    let config = lookup_facet(settings, &filter.attribute)?;
    let clause = config
        .handler()
        .filter_query(&config.engine_field(), &filter.value);

    Ok(if filter.negated {
        json!({ "bool": { "must_not": [clause] } })
    } else {
        clause
    })
}

fn numeric_filter_clause(filter: &NumericFilter, settings: &SearchSettings) -> Result<Value> {
    let field = lookup_facet(settings, &filter.attribute)?.engine_field();
    let range = |bounds: Value| json!({ "range": { field.as_str(): bounds } });

    Ok(match &filter.comparison {
        NumericComparison::Gt(n) => range(json!({ "gt": n })),
        NumericComparison::Gte(n) => range(json!({ "gte": n })),
        NumericComparison::Lt(n) => range(json!({ "lt": n })),
        NumericComparison::Lte(n) => range(json!({ "lte": n })),
        NumericComparison::Between(lower, upper) => range(json!({ "gte": lower, "lte": upper })),
        NumericComparison::Eq(n) => json!({ "term": { field.as_str(): n } }),
        NumericComparison::NotEq(n) => {
            json!({ "bool": { "must_not": [{ "term": { field.as_str(): n } }] } })
        }
    })
}
