//! Facet aggregations of the compiled body.
//!
//! String facets aggregate under their attribute name. Numeric facets emit a
//! `<attribute>$_stats` and `<attribute>$_entries` pair. Facets under a
//! nested path are grouped beneath `<path>.`, which the response side
//! recognises and unwraps.

use serde_json::{Map, Value, json};

use crate::error::{HopliteError, Result};
use crate::request::SearchParams;
use crate::settings::{FacetAttributeConfig, SearchSettings};

/// Suffix of the stats aggregation of a numeric facet.
pub const STATS_SUFFIX: &str = "$_stats";
/// Suffix of the value-count aggregation of a numeric facet.
pub const ENTRIES_SUFFIX: &str = "$_entries";

/// Aggregations for every facet the request asks for.
pub fn build_aggregations(settings: &SearchSettings, params: &SearchParams) -> Map<String, Value> {
    let requested = params.requested_facets();
    let size = params.max_values_per_facet();

    let mut aggs = Map::new();
    for facet in &settings.facet_attributes {
        if let Some(requested) = &requested {
            if !requested.contains(&facet.attribute.as_str()) {
                continue;
            }
        }
        insert_facet(&mut aggs, facet, facet_aggregations(facet, size, None));
    }
    aggs
}

/// Single aggregation used to search within one facet's values.
pub fn build_facet_values_aggregation(
    settings: &SearchSettings,
    params: &SearchParams,
    facet_name: &str,
) -> Result<Map<String, Value>> {
    let facet = settings
        .facet_attributes
        .iter()
        .find(|facet| facet.attribute == facet_name)
        .ok_or_else(|| HopliteError::query_compile(format!("unknown facet '{facet_name}'")))?;

    let search = params.facet_query.as_deref();
    let aggregation = facet
        .handler()
        .facet_query(&facet.engine_field(), params.max_facet_hits(), search);

    let mut aggs = Map::new();
    insert_facet(&mut aggs, facet, vec![(facet.attribute.clone(), aggregation)]);
    Ok(aggs)
}

fn facet_aggregations(
    facet: &FacetAttributeConfig,
    size: usize,
    search: Option<&str>,
) -> Vec<(String, Value)> {
    let field = facet.engine_field();
    let entries = facet.handler().facet_query(&field, size, search);

    if facet.is_numeric() {
        vec![
            (
                format!("{}{STATS_SUFFIX}", facet.attribute),
                json!({ "stats": { "field": field } }),
            ),
            (format!("{}{ENTRIES_SUFFIX}", facet.attribute), entries),
        ]
    } else {
        vec![(facet.attribute.clone(), entries)]
    }
}

fn insert_facet(
    aggs: &mut Map<String, Value>,
    facet: &FacetAttributeConfig,
    entries: Vec<(String, Value)>,
) {
    let (Some(path), Some(group_key)) = (&facet.nested_path, facet.nested_group_key()) else {
        aggs.extend(entries);
        return;
    };

    let group = aggs
        .entry(group_key)
        .or_insert_with(|| json!({ "nested": { "path": path }, "aggs": {} }));

    if let Some(children) = group.get_mut("aggs").and_then(Value::as_object_mut) {
        children.extend(entries);
    }
}
