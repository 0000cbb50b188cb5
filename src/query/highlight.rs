//! Highlight block of the compiled body.

use serde_json::{Map, Value, json};

use crate::request::SearchParams;
use crate::settings::SearchSettings;

const DEFAULT_SNIPPET_FRAGMENT_SIZE: u64 = 100;

/// Split `attribute:size` snippet declarations.
pub fn parse_snippet_attribute(spec: &str) -> (&str, Option<u64>) {
    match spec.split_once(':') {
        Some((attribute, size)) => (attribute, size.trim().parse().ok()),
        None => (spec, None),
    }
}

/// Engine highlight clause, or `None` when nothing is highlighted or snippeted.
pub fn build_highlight(settings: &SearchSettings, params: &SearchParams) -> Option<Value> {
    if settings.highlight_attributes.is_empty() && settings.snippet_attributes.is_empty() {
        return None;
    }

    let mut fields = Map::new();
    for attribute in &settings.highlight_attributes {
        fields.insert(attribute.clone(), json!({ "number_of_fragments": 0 }));
    }
    for spec in &settings.snippet_attributes {
        let (attribute, size) = parse_snippet_attribute(spec);
        fields.insert(
            attribute.to_string(),
            json!({
                "fragment_size": size.unwrap_or(DEFAULT_SNIPPET_FRAGMENT_SIZE),
                "number_of_fragments": 5
            }),
        );
    }

    Some(json!({
        "pre_tags": [params.highlight_pre_tag()],
        "post_tags": [params.highlight_post_tag()],
        "fields": fields
    }))
}
