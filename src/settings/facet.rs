//! Facet attribute configuration and per-facet query/response overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Suffix marking an aggregation name as a nested-document group.
pub const NESTED_GROUP_SUFFIX: char = '.';

/// Bucket key to document count.
pub type FacetBuckets = BTreeMap<String, u64>;

/// Value type of a facet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetType {
    /// Categorical values counted per term.
    #[default]
    String,
    /// Numeric values with min/max/avg/sum statistics.
    Numeric,
}

/// Capability set attached to a facet.
///
/// Every method has a default used when a facet does not override it, so an
/// implementation only needs to provide the pieces it customises.
pub trait FacetHandler: Send + Sync {
    /// Build the aggregation for `field` with at most `size` buckets.
    ///
    /// `search` is set when the client is searching within the facet values.
    fn facet_query(&self, field: &str, size: usize, search: Option<&str>) -> Value {
        default_facet_query(field, size, search)
    }

    /// Build the filter selecting documents whose `field` equals `value`.
    fn filter_query(&self, field: &str, value: &str) -> Value {
        default_filter_query(field, value)
    }

    /// Reduce an aggregation node to a bucket map.
    fn facet_response(&self, aggregation: &Value) -> FacetBuckets {
        default_facet_response(aggregation)
    }
}

/// Handler using the default terms aggregation and term filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermsFacetHandler;

impl FacetHandler for TermsFacetHandler {}

type FacetQueryFn = dyn Fn(&str, usize, Option<&str>) -> Value + Send + Sync;
type FilterQueryFn = dyn Fn(&str, &str) -> Value + Send + Sync;
type FacetResponseFn = dyn Fn(&Value) -> FacetBuckets + Send + Sync;

/// Handler assembled from closures; missing closures fall back to the defaults.
#[derive(Default)]
pub struct CallbackFacetHandler {
    facet_query: Option<Box<FacetQueryFn>>,
    filter_query: Option<Box<FilterQueryFn>>,
    facet_response: Option<Box<FacetResponseFn>>,
}

impl CallbackFacetHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the aggregation builder.
    pub fn with_facet_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.facet_query = Some(Box::new(f));
        self
    }

    /// Override the filter builder.
    pub fn with_filter_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Value + Send + Sync + 'static,
    {
        self.filter_query = Some(Box::new(f));
        self
    }

    /// Override the bucket reducer.
    pub fn with_facet_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> FacetBuckets + Send + Sync + 'static,
    {
        self.facet_response = Some(Box::new(f));
        self
    }
}

impl FacetHandler for CallbackFacetHandler {
    fn facet_query(&self, field: &str, size: usize, search: Option<&str>) -> Value {
        match &self.facet_query {
            Some(f) => f(field, size, search),
            None => default_facet_query(field, size, search),
        }
    }

    fn filter_query(&self, field: &str, value: &str) -> Value {
        match &self.filter_query {
            Some(f) => f(field, value),
            None => default_filter_query(field, value),
        }
    }

    fn facet_response(&self, aggregation: &Value) -> FacetBuckets {
        match &self.facet_response {
            Some(f) => f(aggregation),
            None => default_facet_response(aggregation),
        }
    }
}

impl fmt::Debug for CallbackFacetHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackFacetHandler")
            .field("facet_query", &self.facet_query.is_some())
            .field("filter_query", &self.filter_query.is_some())
            .field("facet_response", &self.facet_response.is_some())
            .finish()
    }
}

/// Terms aggregation, restricted to values containing `search` when given.
pub fn default_facet_query(field: &str, size: usize, search: Option<&str>) -> Value {
    let mut terms = json!({ "field": field, "size": size });
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        terms["include"] = Value::String(format!(".*{}.*", case_insensitive_pattern(search)));
    }
    json!({ "terms": terms })
}

/// Exact term filter.
pub fn default_filter_query(field: &str, value: &str) -> Value {
    json!({ "term": { field: value } })
}

/// Collect `bucket.key -> bucket.doc_count`; later buckets overwrite earlier ones.
pub fn default_facet_response(aggregation: &Value) -> FacetBuckets {
    let mut buckets = FacetBuckets::new();
    let Some(entries) = aggregation.get("buckets").and_then(Value::as_array) else {
        return buckets;
    };

    for bucket in entries {
        let Some(key) = bucket.get("key").and_then(bucket_key_to_string) else {
            continue;
        };
        let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
        buckets.insert(key, count);
    }
    buckets
}

/// Render a bucket key as a facet value; whole floats lose their fraction.
pub fn bucket_key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

/// Lucene regular expression matching `text` regardless of case.
fn case_insensitive_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() * 4);
    for c in text.chars() {
        if c.is_alphabetic() {
            let lower: String = c.to_lowercase().collect();
            let upper: String = c.to_uppercase().collect();
            if lower == upper {
                pattern.push(c);
            } else {
                pattern.push('[');
                pattern.push_str(&lower);
                pattern.push_str(&upper);
                pattern.push(']');
            }
        } else if ".?+*|{}[]()\"\\#@&<>~".contains(c) {
            pattern.push('\\');
            pattern.push(c);
        } else {
            pattern.push(c);
        }
    }
    pattern
}

/// Configuration of one facet (or filter-only) attribute.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "FacetAttributeRepr", into = "FacetAttributeRepr")]
pub struct FacetAttributeConfig {
    /// Client-facing name.
    pub attribute: String,
    /// Engine field name, relative to `nested_path` when set.
    pub field: String,
    /// Value type.
    pub facet_type: FacetType,
    /// Nested document path the field lives under.
    pub nested_path: Option<String>,
    handler: Arc<dyn FacetHandler>,
}

impl FacetAttributeConfig {
    /// Create a facet with the default handler.
    pub fn new<A: Into<String>, F: Into<String>>(attribute: A, field: F, facet_type: FacetType) -> Self {
        FacetAttributeConfig {
            attribute: attribute.into(),
            field: field.into(),
            facet_type,
            nested_path: None,
            handler: Arc::new(TermsFacetHandler),
        }
    }

    /// String facet whose engine field has the same name.
    pub fn string<A: Into<String>>(attribute: A) -> Self {
        let attribute = attribute.into();
        Self::new(attribute.clone(), attribute, FacetType::String)
    }

    /// Numeric facet.
    pub fn numeric<A: Into<String>, F: Into<String>>(attribute: A, field: F) -> Self {
        Self::new(attribute, field, FacetType::Numeric)
    }

    /// Place the facet under a nested document path.
    pub fn with_nested_path<P: Into<String>>(mut self, path: P) -> Self {
        self.nested_path = Some(path.into());
        self
    }

    /// Attach custom query/filter/response behaviour.
    pub fn with_handler(mut self, handler: Arc<dyn FacetHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn handler(&self) -> &dyn FacetHandler {
        self.handler.as_ref()
    }

    pub fn is_numeric(&self) -> bool {
        self.facet_type == FacetType::Numeric
    }

    /// Fully qualified engine field.
    pub fn engine_field(&self) -> String {
        match &self.nested_path {
            Some(path) if !self.field.starts_with(&format!("{path}.")) => {
                format!("{path}.{}", self.field)
            }
            _ => self.field.clone(),
        }
    }

    /// Aggregation name of the nested group this facet belongs to.
    pub fn nested_group_key(&self) -> Option<String> {
        self.nested_path
            .as_ref()
            .map(|path| format!("{path}{NESTED_GROUP_SUFFIX}"))
    }
}

impl fmt::Debug for FacetAttributeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetAttributeConfig")
            .field("attribute", &self.attribute)
            .field("field", &self.field)
            .field("facet_type", &self.facet_type)
            .field("nested_path", &self.nested_path)
            .finish_non_exhaustive()
    }
}

/// Wire form: either a bare attribute name or a full object.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FacetAttributeRepr {
    Name(String),
    Config {
        attribute: String,
        field: String,
        #[serde(rename = "type", default)]
        facet_type: FacetType,
        #[serde(rename = "nestedPath", default, skip_serializing_if = "Option::is_none")]
        nested_path: Option<String>,
    },
}

impl From<FacetAttributeRepr> for FacetAttributeConfig {
    fn from(repr: FacetAttributeRepr) -> Self {
        match repr {
            FacetAttributeRepr::Name(name) => FacetAttributeConfig::string(name),
            FacetAttributeRepr::Config {
                attribute,
                field,
                facet_type,
                nested_path,
            } => FacetAttributeConfig {
                nested_path,
                ..FacetAttributeConfig::new(attribute, field, facet_type)
            },
        }
    }
}

impl From<FacetAttributeConfig> for FacetAttributeRepr {
    fn from(config: FacetAttributeConfig) -> Self {
        FacetAttributeRepr::Config {
            attribute: config.attribute,
            field: config.field,
            facet_type: config.facet_type,
            nested_path: config.nested_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_facet_response_last_bucket_wins() {
        let aggregation = json!({
            "buckets": [
                {"key": "movie", "doc_count": 10},
                {"key": "series", "doc_count": 3},
                {"key": "movie", "doc_count": 7}
            ]
        });
        let buckets = default_facet_response(&aggregation);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets["movie"], 7);
        assert_eq!(buckets["series"], 3);
    }

    #[test]
    fn test_default_facet_response_without_buckets() {
        assert!(default_facet_response(&json!({"doc_count": 4})).is_empty());
    }

    #[test]
    fn test_numeric_bucket_keys() {
        assert_eq!(bucket_key_to_string(&json!(10)).unwrap(), "10");
        assert_eq!(bucket_key_to_string(&json!(10.0)).unwrap(), "10");
        assert_eq!(bucket_key_to_string(&json!(2.5)).unwrap(), "2.5");
        assert!(bucket_key_to_string(&json!(null)).is_none());
    }

    #[test]
    fn test_facet_query_with_search() {
        let query = default_facet_query("actors.keyword", 10, Some("Tom H."));
        assert_eq!(query["terms"]["field"], "actors.keyword");
        assert_eq!(query["terms"]["size"], 10);
        assert_eq!(query["terms"]["include"], ".*[tT][oO][mM] [hH]\\..*");

        let plain = default_facet_query("type", 5, None);
        assert!(plain["terms"].get("include").is_none());
    }

    #[test]
    fn test_nested_engine_field() {
        let facet = FacetAttributeConfig::new("keyword_facets.brand", "facet_value", FacetType::String)
            .with_nested_path("keyword_facets");
        assert_eq!(facet.engine_field(), "keyword_facets.facet_value");
        assert_eq!(facet.nested_group_key().unwrap(), "keyword_facets.");

        let qualified = FacetAttributeConfig::new("brand", "keyword_facets.facet_value", FacetType::String)
            .with_nested_path("keyword_facets");
        assert_eq!(qualified.engine_field(), "keyword_facets.facet_value");
    }

    #[test]
    fn test_callback_handler_falls_back_to_defaults() {
        let handler = CallbackFacetHandler::new()
            .with_filter_query(|field, value| json!({"match": {field: value}}));

        assert_eq!(
            handler.filter_query("brand", "LG"),
            json!({"match": {"brand": "LG"}})
        );
        assert_eq!(handler.facet_query("brand", 3, None), default_facet_query("brand", 3, None));
    }

    #[test]
    fn test_deserialize_shorthand_and_object() {
        let facets: Vec<FacetAttributeConfig> = serde_json::from_value(json!([
            "type",
            {"attribute": "price", "field": "price", "type": "numeric"},
            {"attribute": "brand", "field": "facet_value", "type": "string", "nestedPath": "keyword_facets"}
        ]))
        .unwrap();

        assert_eq!(facets[0].field, "type");
        assert_eq!(facets[0].facet_type, FacetType::String);
        assert!(facets[1].is_numeric());
        assert_eq!(facets[2].nested_path.as_deref(), Some("keyword_facets"));
    }
}
