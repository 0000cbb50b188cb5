//! Hit projection: source fields, runtime fields, highlights and geo points.

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::query::highlight::parse_snippet_attribute;
use crate::request::SearchParams;
use crate::settings::SearchSettings;

/// Project every raw hit of `response` into the client hit shape.
pub fn project_hits(response: &Value, settings: &SearchSettings, params: &SearchParams) -> Vec<Value> {
    let Some(hits) = response.pointer("/hits/hits").and_then(Value::as_array) else {
        return Vec::new();
    };

    let pre_tag = params.highlight_pre_tag();
    let post_tag = params.highlight_post_tag();
    let matched_words = Regex::new(&format!(
        "{}(.*?){}",
        regex::escape(pre_tag),
        regex::escape(post_tag)
    ))
    .ok();
    let highlighter = Highlighter {
        pre_tag,
        post_tag,
        matched_words,
    };

    let snippet_attributes: Vec<String> = settings
        .snippet_attributes
        .iter()
        .map(|spec| parse_snippet_attribute(spec).0.to_string())
        .collect();

    hits.iter()
        .map(|hit| {
            let mut projected = Map::new();
            projected.insert("objectID".to_string(), hit.get("_id").cloned().unwrap_or(Value::Null));
            projected.insert("_index".to_string(), hit.get("_index").cloned().unwrap_or(Value::Null));
            projected.insert("_score".to_string(), hit.get("_score").cloned().unwrap_or(Value::Null));

            for section in ["_source", "fields"] {
                if let Some(object) = hit.get(section).and_then(Value::as_object) {
                    projected.extend(object.clone());
                }
            }

            if let Some(inner_hits) = hit.get("inner_hits") {
                projected.insert("inner_hits".to_string(), inner_hits.clone());
            }

            if !settings.highlight_attributes.is_empty() {
                projected.insert(
                    "_highlightResult".to_string(),
                    highlighter.fields(hit, &settings.highlight_attributes),
                );
            }
            if !snippet_attributes.is_empty() {
                projected.insert(
                    "_snippetResult".to_string(),
                    highlighter.fields(hit, &snippet_attributes),
                );
            }

            if let Some(geo_attribute) = &settings.geo_attribute {
                if let Some(geoloc) = hit
                    .pointer(&format!("/_source/{geo_attribute}"))
                    .and_then(convert_lat_lng)
                {
                    projected.insert("_geoloc".to_string(), geoloc);
                }
            }

            Value::Object(projected)
        })
        .collect()
}

struct Highlighter<'a> {
    pre_tag: &'a str,
    post_tag: &'a str,
    matched_words: Option<Regex>,
}

impl Highlighter<'_> {
    fn fields(&self, hit: &Value, attributes: &[String]) -> Value {
        let mut result = Map::new();
        for attribute in attributes {
            let fragments: Vec<&str> = hit
                .get("highlight")
                .and_then(|h| h.get(attribute))
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            let source = hit.get("_source").and_then(|s| s.get(attribute));
            let value = match source {
                Some(Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .map(|item| self.array_item(item, &fragments))
                        .collect(),
                ),
                _ if !fragments.is_empty() => self.highlighted(&fragments.join(" ... ")),
                Some(value) => self.plain(value),
                None => continue,
            };
            result.insert(attribute.clone(), value);
        }
        Value::Object(result)
    }

    fn array_item(&self, item: &Value, fragments: &[&str]) -> Value {
        let text = item.as_str().unwrap_or_default();
        fragments
            .iter()
            .find(|fragment| self.strip_tags(fragment) == text)
            .map(|fragment| self.highlighted(fragment))
            .unwrap_or_else(|| self.plain(item))
    }

    fn highlighted(&self, fragment: &str) -> Value {
        let words: Vec<String> = self
            .matched_words
            .as_ref()
            .map(|re| {
                re.captures_iter(fragment)
                    .map(|caps| caps[1].to_string())
                    .collect()
            })
            .unwrap_or_default();

        json!({
            "value": fragment,
            "matchLevel": if words.is_empty() { "none" } else { "full" },
            "matchedWords": words
        })
    }

    fn plain(&self, value: &Value) -> Value {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        json!({ "value": text, "matchLevel": "none", "matchedWords": [] })
    }

    fn strip_tags(&self, fragment: &str) -> String {
        fragment.replace(self.pre_tag, "").replace(self.post_tag, "")
    }
}

/// Convert `"lat,lng"`, `[lat, lng]` or `{lat, lon}` into `{lat, lng}`.
pub fn convert_lat_lng(value: &Value) -> Option<Value> {
    let number = |v: &Value| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let (lat, lng) = match value {
        Value::String(s) => {
            let (lat, lng) = s.split_once(',')?;
            (lat.trim().parse().ok()?, lng.trim().parse().ok()?)
        }
        Value::Array(items) if items.len() >= 2 => (number(&items[0])?, number(&items[1])?),
        Value::Object(object) => (number(object.get("lat")?)?, number(object.get("lon")?)?),
        _ => return None,
    };

    Some(json!({ "lat": lat, "lng": lng }))
}
