//! Caller-supplied extension points.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::query::EngineRequest;

/// Organic clause chosen by [`SearchHooks::get_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum OrganicQuery {
    /// Use the built-in multi-field text query.
    Default,
    /// Use this engine clause verbatim.
    Custom(Value),
    /// Do not score on text; match every document.
    MatchAll,
}

/// Hooks around compilation and the engine round trip.
///
/// All methods have pass-through defaults.
///
/// # Examples
///
/// ```
/// use hoplite::client::{OrganicQuery, SearchHooks};
/// use serde_json::json;
///
/// struct TitleOnly;
///
/// impl SearchHooks for TitleOnly {
///     fn get_query(&self, query: &str, _search_attributes: &[String]) -> OrganicQuery {
///         OrganicQuery::Custom(json!({"match": {"title": query}}))
///     }
/// }
/// ```
#[async_trait]
pub trait SearchHooks: Send + Sync {
    /// Choose the organic clause for non-empty query text.
    fn get_query(&self, _query: &str, _search_attributes: &[String]) -> OrganicQuery {
        OrganicQuery::Default
    }

    /// Inspect or replace the compiled batch before it is sent.
    async fn before_search(&self, requests: Vec<EngineRequest>) -> Result<Vec<EngineRequest>> {
        Ok(requests)
    }

    /// Inspect or replace the raw responses before they are transformed.
    async fn after_search(
        &self,
        _requests: &[EngineRequest],
        responses: Vec<Value>,
    ) -> Result<Vec<Value>> {
        Ok(responses)
    }
}
