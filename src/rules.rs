//! Query rules: declarative conditions matched against a request and the
//! actions they contribute to the compiled query and the rendered result.
//!
//! Rules are evaluated in declaration order. A rule matches when any of its
//! condition groups holds in full; the actions of every matching rule are
//! then folded into one [`QueryRuleActions`].
//!
//! # Examples
//!
//! ```
//! use hoplite::request::{SearchParams, SearchRequest};
//! use hoplite::rules::{QueryRule, evaluate_rules};
//!
//! let rules: Vec<QueryRule> = serde_json::from_str(r#"[{
//!     "id": "pin-shawshank",
//!     "conditions": [[{"context": "query", "value": "shawshank", "match_type": "exact"}]],
//!     "actions": [{"action": "PinnedResult", "documentIds": ["tt0111161"]}]
//! }]"#).unwrap();
//!
//! let request = SearchRequest::new("movies", SearchParams {
//!     query: Some("Shawshank".to_string()),
//!     ..Default::default()
//! });
//!
//! let actions = evaluate_rules(&rules, &request);
//! assert_eq!(actions.rule_ids, vec!["pin-shawshank"]);
//! assert_eq!(actions.pinned_ids, vec!["tt0111161"]);
//! ```

pub mod action;
pub mod condition;
pub mod matcher;
pub mod merger;

use serde::{Deserialize, Serialize};

use crate::request::SearchRequest;

pub use action::{Action, QueryBoost, QueryRuleActions};
pub use condition::{Condition, FilterValue, MatchType};
pub use matcher::match_rules;
pub use merger::merge_actions;

/// A declarative rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRule {
    pub id: String,
    /// Disjunction of conjunctions; `[[]]` matches every request.
    #[serde(default)]
    pub conditions: Vec<Vec<Condition>>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Match `rules` against `request` and merge the actions of those that apply.
pub fn evaluate_rules(rules: &[QueryRule], request: &SearchRequest) -> QueryRuleActions {
    let matched = match_rules(rules, request);
    merge_actions(&matched)
}
