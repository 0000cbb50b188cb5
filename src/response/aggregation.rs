//! Raw aggregation trees and their flattening.
//!
//! The engine answers nested-path facets inside aggregation groups whose name
//! ends with [`NESTED_GROUP_SUFFIX`]. Flattening hoists every facet found
//! below such a group to the top level under its own name, however deep it
//! is buried, so the rest of the response code only deals with a flat map.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{HopliteError, Result};
use crate::settings::facet::NESTED_GROUP_SUFFIX;

/// Flat or nested aggregations keyed by name.
pub type Aggregations = BTreeMap<String, AggregationNode>;

/// One node of a raw aggregation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationNode {
    /// Terminal node: exposes `buckets`, or carries metric values only.
    Leaf(Value),
    /// Node with sub-aggregations (nested, filter and similar wrappers).
    Group {
        /// Scalar entries such as `doc_count`.
        fields: Map<String, Value>,
        children: Aggregations,
    },
}

impl AggregationNode {
    /// Classify a raw aggregation value.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return AggregationNode::Leaf(value.clone());
        };

        if object.contains_key("buckets") || !object.values().any(Value::is_object) {
            return AggregationNode::Leaf(value.clone());
        }

        let mut fields = Map::new();
        let mut children = Aggregations::new();
        for (key, child) in object {
            if child.is_object() {
                children.insert(key.clone(), AggregationNode::from_value(child));
            } else {
                fields.insert(key.clone(), child.clone());
            }
        }
        AggregationNode::Group { fields, children }
    }

    /// Rebuild the raw value.
    pub fn to_value(&self) -> Value {
        match self {
            AggregationNode::Leaf(value) => value.clone(),
            AggregationNode::Group { fields, children } => {
                let mut object = fields.clone();
                for (key, child) in children {
                    object.insert(key.clone(), child.to_value());
                }
                Value::Object(object)
            }
        }
    }
}

/// Parse the `aggregations` object of a raw response.
pub fn parse_aggregations(value: &Value) -> Result<Aggregations> {
    let object = value
        .as_object()
        .ok_or_else(|| HopliteError::other("aggregations must be an object"))?;

    Ok(object
        .iter()
        .map(|(key, child)| (key.clone(), AggregationNode::from_value(child)))
        .collect())
}

/// Whether `key` names a nested aggregation group.
pub fn is_nested_group(key: &str) -> bool {
    key.ends_with(NESTED_GROUP_SUFFIX)
}

/// Hoist facets out of nested groups; other top-level entries pass through.
///
/// A nested group never survives under its own name, even when it came back
/// with nothing but a document count.
pub fn flatten_aggregations(aggregations: &Aggregations) -> Aggregations {
    let mut flat = Aggregations::new();
    for (key, node) in aggregations {
        match node {
            AggregationNode::Group { children, .. } if is_nested_group(key) => {
                hoist_children(children, &mut flat);
            }
            AggregationNode::Leaf(_) if is_nested_group(key) => {}
            _ => {
                flat.insert(key.clone(), node.clone());
            }
        }
    }
    flat
}

fn hoist_children(children: &Aggregations, out: &mut Aggregations) {
    for (key, child) in children {
        match child {
            AggregationNode::Leaf(_) if is_nested_group(key) => {}
            AggregationNode::Leaf(_) => {
                out.insert(key.clone(), child.clone());
            }
            AggregationNode::Group {
                children: grandchildren,
                ..
            } => {
                let mut inner = Aggregations::new();
                hoist_children(grandchildren, &mut inner);

                if is_nested_group(key) {
                    out.extend(inner);
                } else if let Some(same_name) = inner.remove(key) {
                    out.insert(key.clone(), same_name);
                    out.extend(inner);
                } else if inner.len() == 1 {
                    if let Some((_, only)) = inner.pop_first() {
                        out.insert(key.clone(), only);
                    }
                } else {
                    out.extend(inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn flatten(value: Value) -> Value {
        let flat = flatten_aggregations(&parse_aggregations(&value).unwrap());
        Value::Object(flat.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn brand_buckets() -> Value {
        json!({"buckets": [{"key": "Apple", "doc_count": 20}, {"key": "LG", "doc_count": 4}]})
    }

    #[test]
    fn test_flat_input_passes_through() {
        let raw = json!({
            "type": {"doc_count_error_upper_bound": 0, "buckets": [{"key": "movie", "doc_count": 3}]},
            "price$_stats": {"count": 3, "min": 1.0, "max": 9.0, "avg": 5.0, "sum": 15.0},
            "filtered": {"doc_count": 3, "inner": {"buckets": []}}
        });
        assert_eq!(flatten(raw.clone()), raw);
    }

    #[test]
    fn test_nested_group_is_unwrapped() {
        let raw = json!({
            "keyword_facets.": {
                "doc_count": 42,
                "keyword_facets.brand": brand_buckets(),
                "price$_stats": {"min": 1.0, "max": 2.0, "avg": 1.5, "sum": 3.0}
            },
            "type": {"buckets": []}
        });

        let flat = flatten(raw);
        assert_eq!(flat["keyword_facets.brand"], brand_buckets());
        assert!(flat.get("price$_stats").is_some());
        assert!(flat.get("type").is_some());
        assert!(flat.get("keyword_facets.").is_none());
        assert!(flat.get("doc_count").is_none());
    }

    #[test]
    fn test_childless_nested_group_is_dropped() {
        let raw = json!({
            "type": {"buckets": []},
            "kw.": {"doc_count": 0},
            "outer.": {"doc_count": 5, "inner.": {"doc_count": 0}, "brand": brand_buckets()}
        });

        let flat = flatten(raw);
        let keys: Vec<&String> = flat.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["brand", "type"]);
    }

    #[test]
    fn test_filter_wrapper_is_hoisted_under_own_name() {
        let raw = json!({
            "keyword_facets.": {
                "doc_count": 42,
                "keyword_facets.brand": {
                    "doc_count": 20,
                    "keyword_facets.brand": brand_buckets()
                }
            }
        });
        assert_eq!(flatten(raw)["keyword_facets.brand"], brand_buckets());
    }

    #[test]
    fn test_depth_invariance() {
        let one_level = json!({"a.": {"doc_count": 1, "brand": brand_buckets()}});
        let three_levels = json!({
            "a.": {"doc_count": 1, "b.": {"doc_count": 1, "c.": {"doc_count": 1, "brand": brand_buckets()}}}
        });
        let wrapped = json!({
            "a.": {"doc_count": 1, "brand": {"doc_count": 1, "brand": {"doc_count": 1, "brand": brand_buckets()}}}
        });

        let expected = flatten(one_level);
        assert_eq!(flatten(three_levels), expected);
        assert_eq!(flatten(wrapped), expected);
        assert_eq!(expected["brand"], brand_buckets());
    }

    #[test]
    fn test_single_differently_named_result_takes_wrapper_name() {
        let raw = json!({
            "keyword_facets.": {
                "doc_count": 5,
                "keyword_facets.color": {"doc_count": 5, "values": brand_buckets()}
            }
        });
        assert_eq!(flatten(raw)["keyword_facets.color"], brand_buckets());
    }

    #[test]
    fn test_aggregations_must_be_an_object() {
        assert!(parse_aggregations(&json!([1, 2])).is_err());
    }
}
