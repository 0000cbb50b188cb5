//! Parser for the filter expressions carried by `QueryFilter` and
//! `QueryBoost` rule actions.
//!
//! Supported syntax:
//! - Terms: `categories:TVs`, `brand:"LG Electronics"`
//! - Ranges: `price:[0 TO 500]`, `price:[100 TO *]`
//! - Conjunctions: `price:[0 TO 500] AND categories:TVs`

use std::iter::Peekable;
use std::str::Chars;

use serde_json::{Map, Value, json};

use crate::error::{HopliteError, Result};
use crate::request::parse_number;
use crate::settings::SearchSettings;

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `field:value`
    Term { field: String, value: String },
    /// `field:[lower TO upper]`; `*` leaves a side open.
    Range {
        field: String,
        lower: Option<String>,
        upper: Option<String>,
    },
    /// Every clause must hold.
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    /// Parse an expression, rejecting malformed input.
    pub fn parse(input: &str) -> Result<Self> {
        FilterExpressionParser::new(input).parse()
    }

    /// Engine filter clause. Attributes resolve to their configured engine
    /// field when declared as facets or filters.
    pub fn to_query(&self, settings: &SearchSettings) -> Value {
        match self {
            FilterExpr::Term { field, value } => {
                json!({ "term": { resolve_field(settings, field): scalar(value) } })
            }
            FilterExpr::Range {
                field,
                lower,
                upper,
            } => {
                let mut bounds = Map::new();
                if let Some(lower) = lower {
                    bounds.insert("gte".to_string(), scalar(lower));
                }
                if let Some(upper) = upper {
                    bounds.insert("lte".to_string(), scalar(upper));
                }
                json!({ "range": { resolve_field(settings, field): bounds } })
            }
            FilterExpr::And(clauses) => json!({
                "bool": {
                    "filter": clauses.iter().map(|c| c.to_query(settings)).collect::<Vec<_>>()
                }
            }),
        }
    }
}

fn resolve_field(settings: &SearchSettings, attribute: &str) -> String {
    settings
        .facet_config(attribute)
        .map(|config| config.engine_field())
        .unwrap_or_else(|| attribute.to_string())
}

fn scalar(text: &str) -> Value {
    match parse_number(text) {
        Some(number) => Value::Number(number),
        None => Value::String(text.to_string()),
    }
}

/// Internal parser for filter expressions.
struct FilterExpressionParser<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl<'a> FilterExpressionParser<'a> {
    fn new(input: &'a str) -> Self {
        FilterExpressionParser {
            input,
            chars: input.chars().peekable(),
        }
    }

    fn parse(&mut self) -> Result<FilterExpr> {
        let mut clauses = vec![self.parse_clause()?];

        loop {
            self.skip_whitespace();
            if self.chars.peek().is_none() {
                break;
            }

            let word = self.consume_bare_word();
            if word != "AND" {
                return Err(self.error(format!("expected AND, found '{word}'")));
            }
            clauses.push(self.parse_clause()?);
        }

        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(FilterExpr::And(clauses))
        }
    }

    fn parse_clause(&mut self) -> Result<FilterExpr> {
        self.skip_whitespace();
        if self.chars.peek().is_none() {
            return Err(self.error("expected field:value"));
        }

        let field = self.consume_field()?;

        match self.chars.peek() {
            Some('[') => {
                self.chars.next();
                self.parse_range(field)
            }
            Some('"') => {
                let value = self.consume_quoted()?;
                Ok(FilterExpr::Term { field, value })
            }
            Some(c) if !c.is_whitespace() => {
                let value = self.consume_bare_word();
                Ok(FilterExpr::Term { field, value })
            }
            _ => Err(self.error(format!("missing value for field '{field}'"))),
        }
    }

    fn parse_range(&mut self, field: String) -> Result<FilterExpr> {
        self.skip_whitespace();
        let lower = self.consume_range_bound()?;

        self.skip_whitespace();
        if self.consume_range_bound()? != "TO" {
            return Err(self.error(format!("expected TO in range for field '{field}'")));
        }

        self.skip_whitespace();
        let upper = self.consume_range_bound()?;

        self.skip_whitespace();
        if self.chars.next() != Some(']') {
            return Err(self.error(format!("unterminated range for field '{field}'")));
        }

        let open = |bound: String| if bound == "*" { None } else { Some(bound) };
        Ok(FilterExpr::Range {
            field,
            lower: open(lower),
            upper: open(upper),
        })
    }

    fn consume_field(&mut self) -> Result<String> {
        let mut field = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == ':' {
                self.chars.next();
                if field.is_empty() {
                    return Err(self.error("empty field name"));
                }
                return Ok(field);
            }
            if c.is_whitespace() {
                break;
            }
            field.push(c);
            self.chars.next();
        }
        Err(self.error(format!("expected ':' after '{field}'")))
    }

    fn consume_quoted(&mut self) -> Result<String> {
        // Opening quote
        self.chars.next();

        let mut value = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '"' => return Ok(value),
                '\\' => {
                    if let Some(escaped) = self.chars.next() {
                        value.push(escaped);
                    }
                }
                _ => value.push(c),
            }
        }
        Err(self.error("unterminated quoted value"))
    }

    fn consume_range_bound(&mut self) -> Result<String> {
        let mut bound = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == ']' {
                break;
            }
            bound.push(c);
            self.chars.next();
        }
        if bound.is_empty() {
            return Err(self.error("incomplete range"));
        }
        Ok(bound)
    }

    fn consume_bare_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                break;
            }
            word.push(c);
            self.chars.next();
        }
        word
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn error<S: AsRef<str>>(&self, msg: S) -> HopliteError {
        HopliteError::query_compile(format!(
            "invalid filter expression '{}': {}",
            self.input,
            msg.as_ref()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FacetAttributeConfig;

    #[test]
    fn test_parse_term() {
        assert_eq!(
            FilterExpr::parse("categories:TVs").unwrap(),
            FilterExpr::Term {
                field: "categories".to_string(),
                value: "TVs".to_string()
            }
        );
        assert_eq!(
            FilterExpr::parse(r#"brand:"LG Electronics""#).unwrap(),
            FilterExpr::Term {
                field: "brand".to_string(),
                value: "LG Electronics".to_string()
            }
        );
    }

    #[test]
    fn test_parse_conjunction_with_range() {
        let expr = FilterExpr::parse("price:[0 TO 500] AND categories:TVs").unwrap();
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::Range {
                    field: "price".to_string(),
                    lower: Some("0".to_string()),
                    upper: Some("500".to_string()),
                },
                FilterExpr::Term {
                    field: "categories".to_string(),
                    value: "TVs".to_string()
                },
            ])
        );
    }

    #[test]
    fn test_open_range() {
        let expr = FilterExpr::parse("price:[100 TO *]").unwrap();
        let query = expr.to_query(&SearchSettings::default());
        assert_eq!(query, json!({"range": {"price": {"gte": 100}}}));
    }

    #[test]
    fn test_malformed_expressions() {
        for input in [
            "",
            "categories",
            "categories:",
            ":TVs",
            "price:[0 TO 500",
            "price:[0 500]",
            "price:[0 TO]",
            "a:b AND",
            "a:b OR c:d",
            r#"brand:"LG"#,
        ] {
            let result = FilterExpr::parse(input);
            assert!(
                matches!(result, Err(HopliteError::QueryCompile(_))),
                "expected error for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_to_query_resolves_engine_fields() {
        let mut settings = SearchSettings::default();
        settings.filter_attributes.push(FacetAttributeConfig::new(
            "categories",
            "categories.keyword",
            crate::settings::FacetType::String,
        ));

        let query = FilterExpr::parse("price:[0 TO 500] AND categories:TVs")
            .unwrap()
            .to_query(&settings);
        assert_eq!(
            query,
            json!({
                "bool": {
                    "filter": [
                        {"range": {"price": {"gte": 0, "lte": 500}}},
                        {"term": {"categories.keyword": "TVs"}}
                    ]
                }
            })
        );
    }
}
