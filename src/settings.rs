//! Static search settings shared by every transformation call.
//!
//! [`SearchSettings`] is loaded once (usually from a JSON file) and passed by
//! reference into the rule engine, the query compiler and the response
//! decomposer. It never changes after construction.
//!
//! # Examples
//!
//! ```
//! use hoplite::settings::{FacetType, SearchSettings};
//!
//! let settings = SearchSettings::from_json_str(r#"{
//!     "search_attributes": [{"field": "title", "weight": 3}, "actors"],
//!     "facet_attributes": ["type", {"attribute": "price", "field": "price", "type": "numeric"}]
//! }"#).unwrap();
//!
//! assert_eq!(settings.search_fields(), vec!["title^3", "actors"]);
//! assert_eq!(settings.facet_type("price"), FacetType::Numeric);
//! ```

pub mod facet;
pub mod sorting;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HopliteError, Result};
use crate::rules::QueryRule;

pub use facet::{
    CallbackFacetHandler, FacetAttributeConfig, FacetBuckets, FacetHandler, FacetType,
    TermsFacetHandler,
};
pub use sorting::{ResolvedIndex, SortField, SortOption, SortOrder};

/// A searchable attribute, optionally weighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchAttribute {
    /// Plain field name.
    Field(String),
    /// Field with a relevance weight.
    Weighted { field: String, weight: f64 },
}

impl SearchAttribute {
    /// Render the attribute the way multi-field text queries expect it (`field^weight`).
    pub fn to_query_field(&self) -> String {
        match self {
            SearchAttribute::Field(field) => field.clone(),
            SearchAttribute::Weighted { field, weight } => format!("{field}^{weight}"),
        }
    }
}

/// Process-wide search configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Attributes searched by the default free-text query.
    #[serde(default)]
    pub search_attributes: Vec<SearchAttribute>,
    /// Attributes returned in hits.
    #[serde(default)]
    pub result_attributes: Vec<String>,
    /// Attributes highlighted in full.
    #[serde(default)]
    pub highlight_attributes: Vec<String>,
    /// Attributes snippeted, optionally as `attribute:size`.
    #[serde(default)]
    pub snippet_attributes: Vec<String>,
    /// Facets aggregated and filterable.
    #[serde(default)]
    pub facet_attributes: Vec<FacetAttributeConfig>,
    /// Attributes that can be filtered on but are never aggregated.
    #[serde(default)]
    pub filter_attributes: Vec<FacetAttributeConfig>,
    /// Source attribute holding a geo point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_attribute: Option<String>,
    /// Named sort orders.
    #[serde(default)]
    pub sorting: BTreeMap<String, SortOption>,
    /// Query rules in declaration order.
    #[serde(default)]
    pub query_rules: Vec<QueryRule>,
}

impl SearchSettings {
    /// Parse settings from a JSON string and validate them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: SearchSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file and validate them.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for facet in &self.facet_attributes {
            if facet.attribute.is_empty() || facet.field.is_empty() {
                return Err(HopliteError::config(
                    "facet attributes require a non-empty attribute and field",
                ));
            }
            if !seen.insert(facet.attribute.as_str()) {
                return Err(HopliteError::config(format!(
                    "duplicate facet attribute: {}",
                    facet.attribute
                )));
            }
        }

        for filter in &self.filter_attributes {
            if filter.attribute.is_empty() || filter.field.is_empty() {
                return Err(HopliteError::config(
                    "filter attributes require a non-empty attribute and field",
                ));
            }
        }

        if let Some(rule) = self.query_rules.iter().find(|rule| rule.id.is_empty()) {
            return Err(HopliteError::config(format!(
                "query rule without id ({} actions)",
                rule.actions.len()
            )));
        }

        Ok(())
    }

    /// Look up the configuration for a facet or filter attribute.
    ///
    /// Facet attributes take precedence over filter-only attributes.
    pub fn facet_config(&self, attribute: &str) -> Option<&FacetAttributeConfig> {
        self.facet_attributes
            .iter()
            .chain(self.filter_attributes.iter())
            .find(|config| config.attribute == attribute)
    }

    /// Declared type of a facet; undeclared attributes are treated as strings.
    pub fn facet_type(&self, attribute: &str) -> FacetType {
        self.facet_config(attribute)
            .map(|config| config.facet_type)
            .unwrap_or(FacetType::String)
    }

    /// Facet attribute names in declaration order.
    pub fn facet_names(&self) -> Vec<&str> {
        self.facet_attributes
            .iter()
            .map(|facet| facet.attribute.as_str())
            .collect()
    }

    /// Search attributes rendered as weighted query fields.
    pub fn search_fields(&self) -> Vec<String> {
        self.search_attributes
            .iter()
            .map(SearchAttribute::to_query_field)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "search_attributes": ["title"],
                "facet_attributes": ["type", {{"attribute": "actors", "field": "actors.keyword", "type": "string"}}],
                "filter_attributes": [{{"attribute": "categories", "field": "categories.keyword", "type": "string"}}],
                "sorting": {{"default": {{"field": "_score", "order": "desc"}}}}
            }}"#
        )
        .unwrap();

        let settings = SearchSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.facet_names(), vec!["type", "actors"]);
        assert_eq!(settings.facet_config("actors").unwrap().field, "actors.keyword");
        assert_eq!(
            settings.facet_config("categories").unwrap().field,
            "categories.keyword"
        );
        assert!(settings.sorting.contains_key("default"));
    }

    #[test]
    fn test_unknown_facet_defaults_to_string() {
        let settings = SearchSettings::default();
        assert_eq!(settings.facet_type("anything"), FacetType::String);
        assert!(settings.facet_config("anything").is_none());
    }

    #[test]
    fn test_validate_rejects_duplicate_facets() {
        let result = SearchSettings::from_json_str(r#"{"facet_attributes": ["type", "type"]}"#);
        assert!(matches!(result, Err(HopliteError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_rule_without_id() {
        let result = SearchSettings::from_json_str(
            r#"{"query_rules": [{"id": "", "conditions": [[]], "actions": []}]}"#,
        );
        assert!(matches!(result, Err(HopliteError::Config(_))));
    }

    #[test]
    fn test_weighted_search_fields() {
        let settings = SearchSettings::from_json_str(
            r#"{"search_attributes": [{"field": "title", "weight": 3}, "description"]}"#,
        )
        .unwrap();
        assert_eq!(settings.search_fields(), vec!["title^3", "description"]);
    }
}
