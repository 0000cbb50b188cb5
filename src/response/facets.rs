//! Facet bucket maps and numeric facet statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};

use crate::error::{HopliteError, Result};
use crate::query::aggregations::{ENTRIES_SUFFIX, STATS_SUFFIX};
use crate::response::aggregation::Aggregations;
use crate::settings::{FacetBuckets, FacetHandler, FacetType, SearchSettings, TermsFacetHandler};

/// Statistics of a numeric facet, copied as the engine reported them.
///
/// Values are absent when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetStats {
    pub min: Option<Number>,
    pub max: Option<Number>,
    pub avg: Option<Number>,
    pub sum: Option<Number>,
}

impl FacetStats {
    fn from_value(value: &Value) -> Self {
        let read = |name: &str| match value.get(name) {
            Some(Value::Number(n)) => Some(n.clone()),
            _ => None,
        };
        FacetStats {
            min: read("min"),
            max: read("max"),
            avg: read("avg"),
            sum: read("sum"),
        }
    }
}

/// Facet counts and numeric statistics of one response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetsResult {
    pub facets: BTreeMap<String, FacetBuckets>,
    pub facets_stats: BTreeMap<String, FacetStats>,
}

/// Reduce flattened aggregations to facet bucket maps and statistics.
///
/// Aggregation names map to facets by dropping any `$` suffix. Facets that
/// are not declared are treated as string facets with the default reducer.
///
/// Only facets present in the response are reduced: a declared facet with no
/// aggregation at all is skipped, so a numeric facet fails with
/// [`HopliteError::MissingStatsAggregation`] only when its `$_entries`
/// aggregation came back without the `$_stats` twin.
pub fn collect_facets(flat: &Aggregations, settings: &SearchSettings) -> Result<FacetsResult> {
    let mut result = FacetsResult::default();
    let default_handler = TermsFacetHandler;

    for key in flat.keys() {
        let facet = key.split('$').next().unwrap_or(key.as_str());
        if result.facets.contains_key(facet) {
            continue;
        }

        let handler: &dyn FacetHandler = match settings.facet_config(facet) {
            Some(config) => config.handler(),
            None => &default_handler,
        };

        match settings.facet_type(facet) {
            FacetType::Numeric => {
                let stats = flat
                    .get(&format!("{facet}{STATS_SUFFIX}"))
                    .ok_or_else(|| HopliteError::missing_stats(facet))?;
                let entries = flat
                    .get(&format!("{facet}{ENTRIES_SUFFIX}"))
                    .map(|node| node.to_value())
                    .unwrap_or_else(|| json!({ "buckets": [] }));

                result
                    .facets
                    .insert(facet.to_string(), handler.facet_response(&entries));
                result
                    .facets_stats
                    .insert(facet.to_string(), FacetStats::from_value(&stats.to_value()));
            }
            FacetType::String => {
                let Some(node) = flat.get(facet) else {
                    log::warn!("aggregation '{key}' does not belong to a known facet");
                    continue;
                };
                result
                    .facets
                    .insert(facet.to_string(), handler.facet_response(&node.to_value()));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::response::aggregation::{flatten_aggregations, parse_aggregations};
    use crate::settings::{CallbackFacetHandler, FacetAttributeConfig};

    fn settings() -> SearchSettings {
        SearchSettings {
            facet_attributes: vec![
                FacetAttributeConfig::string("type"),
                FacetAttributeConfig::numeric("price", "price"),
            ],
            ..Default::default()
        }
    }

    fn collect(raw: Value, settings: &SearchSettings) -> Result<FacetsResult> {
        collect_facets(&flatten_aggregations(&parse_aggregations(&raw).unwrap()), settings)
    }

    #[test]
    fn test_numeric_stats_round_trip() {
        let result = collect(
            json!({
                "price$_stats": {"count": 10, "min": 1, "max": 9, "avg": 5, "sum": 50},
                "price$_entries": {"buckets": [{"key": 1, "doc_count": 2}, {"key": 9.0, "doc_count": 1}]}
            }),
            &settings(),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&result.facets_stats["price"]).unwrap(),
            json!({"min": 1, "max": 9, "avg": 5, "sum": 50})
        );
        assert_eq!(result.facets["price"]["1"], 2);
        assert_eq!(result.facets["price"]["9"], 1);
    }

    #[test]
    fn test_float_stats_are_kept() {
        let stats = json!({"min": 1.5, "max": 9, "avg": 4.25, "sum": 17});
        let result = collect(
            json!({"price$_stats": stats.clone(), "price$_entries": {"buckets": []}}),
            &settings(),
        )
        .unwrap();
        assert_eq!(serde_json::to_value(&result.facets_stats["price"]).unwrap(), stats);
    }

    #[test]
    fn test_declared_facet_without_aggregations_is_skipped() {
        let result = collect(json!({"type": {"buckets": []}}), &settings()).unwrap();
        assert!(!result.facets.contains_key("price"));
        assert!(result.facets_stats.is_empty());
    }

    #[test]
    fn test_missing_stats_aggregation() {
        let result = collect(
            json!({"price$_entries": {"buckets": []}}),
            &settings(),
        );
        assert!(matches!(result, Err(HopliteError::MissingStatsAggregation(f)) if f == "price"));
    }

    #[test]
    fn test_empty_stats_are_null() {
        let result = collect(
            json!({"price$_stats": {"count": 0, "min": null, "max": null, "avg": null, "sum": 0.0}}),
            &settings(),
        )
        .unwrap();
        assert_eq!(result.facets_stats["price"].min, None);
        assert_eq!(result.facets_stats["price"].sum, Number::from_f64(0.0));
        assert!(result.facets["price"].is_empty());
    }

    #[test]
    fn test_custom_facet_response() {
        let mut settings = settings();
        settings.facet_attributes[0] = FacetAttributeConfig::string("type").with_handler(Arc::new(
            CallbackFacetHandler::new().with_facet_response(|aggregation| {
                let mut buckets = FacetBuckets::new();
                let total = aggregation["buckets"].as_array().map(|b| b.len()).unwrap_or(0);
                buckets.insert("total".to_string(), total as u64);
                buckets
            }),
        ));

        let result = collect(
            json!({"type": {"buckets": [{"key": "movie", "doc_count": 3}, {"key": "series", "doc_count": 1}]}}),
            &settings,
        )
        .unwrap();
        assert_eq!(result.facets["type"]["total"], 2);
    }

    #[test]
    fn test_undeclared_aggregation_uses_default_reducer() {
        let result = collect(
            json!({"genre": {"buckets": [{"key": "drama", "doc_count": 7}]}}),
            &settings(),
        )
        .unwrap();
        assert_eq!(result.facets["genre"]["drama"], 7);
    }
}
