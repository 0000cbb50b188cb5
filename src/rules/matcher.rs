//! Rule matching.

use crate::request::SearchRequest;
use crate::rules::QueryRule;

/// Rules whose conditions hold for `request`, in declaration order.
///
/// A rule matches when any of its condition groups is fully satisfied. An
/// empty group is always satisfied; a rule with no groups never matches.
pub fn match_rules<'a>(rules: &'a [QueryRule], request: &SearchRequest) -> Vec<&'a QueryRule> {
    let query = request.params.query();
    let active_filters = request.params.active_facet_filters();

    let matched: Vec<&QueryRule> = rules
        .iter()
        .filter(|rule| {
            rule.conditions.iter().any(|group| {
                group
                    .iter()
                    .all(|condition| condition.is_satisfied(query, &active_filters))
            })
        })
        .collect();

    if !matched.is_empty() {
        log::debug!(
            "{}: matched query rules {:?}",
            request.index_name,
            matched.iter().map(|rule| rule.id.as_str()).collect::<Vec<_>>()
        );
    }

    matched
}
