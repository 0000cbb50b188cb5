//! Compilation of client requests into engine query bodies.
//!
//! The compiled body combines the request's facet and numeric filters, the
//! filters and boosts contributed by query rules, the free-text ("organic")
//! clause, pinned results, sorting, pagination, highlighting and one
//! aggregation per requested facet.

pub mod aggregations;
pub mod compiler;
pub mod filter;
pub mod highlight;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;

pub use compiler::{compile_request, default_organic_query};
pub use filter::FilterExpr;

/// A compiled query addressed to one engine index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRequest {
    pub index_name: String,
    pub body: Value,
}

/// Render a batch in the engine's multi-search NDJSON form.
pub fn create_msearch_body(requests: &[EngineRequest]) -> Result<String> {
    let mut ndjson = String::new();
    for request in requests {
        ndjson.push_str(&serde_json::to_string(&json!({ "index": request.index_name }))?);
        ndjson.push('\n');
        ndjson.push_str(&serde_json::to_string(&request.body)?);
        ndjson.push('\n');
    }
    Ok(ndjson)
}
