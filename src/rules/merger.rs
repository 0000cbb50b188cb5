//! Folding the actions of matched rules into one directive set.

use crate::rules::{Action, QueryBoost, QueryRule, QueryRuleActions};

/// Merge the actions of `rules` in the order given.
///
/// Query rewrites and facet orders are overwritten by later rules; pins,
/// filters, boosts and user data accumulate without deduplication.
pub fn merge_actions(rules: &[&QueryRule]) -> QueryRuleActions {
    rules
        .iter()
        .fold(QueryRuleActions::default(), |mut merged, rule| {
            merged.rule_ids.push(rule.id.clone());

            for action in &rule.actions {
                match action {
                    Action::PinnedResult { document_ids } => {
                        merged.pinned_ids.extend(document_ids.iter().cloned());
                    }
                    Action::QueryRewrite { query } => {
                        merged.query = Some(query.clone());
                    }
                    Action::QueryFilter { query } => {
                        merged.filters.push(query.clone());
                    }
                    Action::QueryBoost { query, weight } => {
                        merged.boosts.push(QueryBoost {
                            query: query.clone(),
                            weight: *weight,
                        });
                    }
                    Action::RenderFacetsOrder {
                        facet_attributes_order,
                    } => {
                        merged.facet_attributes_order = Some(facet_attributes_order.clone());
                    }
                    Action::RenderUserData { user_data } => {
                        merged.user_data.push(user_data.clone());
                    }
                }
            }

            merged
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rule(id: &str, actions: serde_json::Value) -> QueryRule {
        serde_json::from_value(json!({"id": id, "conditions": [[]], "actions": actions})).unwrap()
    }

    #[test]
    fn test_no_rules_yield_empty_actions() {
        assert_eq!(merge_actions(&[]), QueryRuleActions::default());
    }

    #[test]
    fn test_last_rewrite_wins() {
        let r1 = rule("r1", json!([{"action": "QueryRewrite", "query": "a"}]));
        let r2 = rule("r2", json!([{"action": "QueryRewrite", "query": "b"}]));

        let merged = merge_actions(&[&r1, &r2]);
        assert_eq!(merged.query.as_deref(), Some("b"));
        assert_eq!(merged.rule_ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_accumulating_actions_keep_duplicates() {
        let r1 = rule(
            "r1",
            json!([
                {"action": "PinnedResult", "documentIds": ["1", "2"]},
                {"action": "QueryFilter", "query": "type:movie"},
                {"action": "RenderUserData", "userData": "banner-1"},
                {"action": "RenderFacetsOrder", "facetAttributesOrder": ["type"]}
            ]),
        );
        let r2 = rule(
            "r2",
            json!([
                {"action": "PinnedResult", "documentIds": ["2"]},
                {"action": "QueryBoost", "query": "brand:LG", "weight": 10},
                {"action": "RenderUserData", "userData": {"title": "banner-2"}},
                {"action": "RenderFacetsOrder", "facetAttributesOrder": ["brand", "type"]}
            ]),
        );

        let merged = merge_actions(&[&r1, &r2]);
        assert_eq!(merged.pinned_ids, vec!["1", "2", "2"]);
        assert_eq!(merged.filters, vec!["type:movie"]);
        assert_eq!(merged.boosts[0].weight, 10.0);
        assert_eq!(merged.user_data, vec![json!("banner-1"), json!({"title": "banner-2"})]);
        assert_eq!(
            merged.facet_attributes_order,
            Some(vec!["brand".to_string(), "type".to_string()])
        );
        assert!(merged.query.is_none());
    }
}
