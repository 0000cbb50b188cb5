//! Rule actions and the consolidated directives they produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An action contributed by a matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum Action {
    /// Force documents ahead of organic results.
    PinnedResult { document_ids: Vec<String> },
    /// Replace the free-text query.
    QueryRewrite { query: String },
    /// Restrict results with a filter expression (`field:value AND field:[a TO b]`).
    QueryFilter { query: String },
    /// Boost documents matching a filter expression.
    QueryBoost { query: String, weight: f64 },
    /// Order facets for rendering.
    RenderFacetsOrder { facet_attributes_order: Vec<String> },
    /// Pass arbitrary data through to the client.
    RenderUserData { user_data: Value },
}

/// A boost directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBoost {
    pub query: String,
    pub weight: f64,
}

/// Directives merged from every rule matching one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRuleActions {
    pub rule_ids: Vec<String>,
    pub pinned_ids: Vec<String>,
    /// Rewritten query text, if any rule rewrote it.
    pub query: Option<String>,
    pub boosts: Vec<QueryBoost>,
    pub filters: Vec<String>,
    pub facet_attributes_order: Option<Vec<String>>,
    pub user_data: Vec<Value>,
}

impl QueryRuleActions {
    /// Query text to search with: the rewrite if present, else the request's.
    pub fn effective_query<'a>(&'a self, request_query: &'a str) -> &'a str {
        self.query.as_deref().unwrap_or(request_query)
    }
}
