//! Batch orchestration: rule evaluation, compilation, the engine round trip
//! and response decomposition.
//!
//! # Examples
//!
//! ```
//! use hoplite::client::{Client, ReplayTransport, RequestOptions};
//! use hoplite::settings::SearchSettings;
//! use serde_json::json;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let transport = ReplayTransport::new(vec![json!({
//!     "took": 1,
//!     "hits": {"total": {"value": 0}, "hits": []}
//! })]);
//! let client = Client::new(SearchSettings::default(), transport);
//!
//! let body = json!([{"indexName": "movies", "params": {"query": "heat"}}]);
//! let results = runtime
//!     .block_on(client.handle_request_body(&body, &RequestOptions::default()))
//!     .unwrap();
//! assert_eq!(results.results.len(), 1);
//! ```

pub mod hooks;
pub mod transport;

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::error::{HopliteError, Result};
use crate::query::{EngineRequest, compile_request, create_msearch_body};
use crate::request::SearchRequest;
use crate::response::{ClientResult, decompose};
use crate::rules::{QueryRuleActions, evaluate_rules};
use crate::settings::SearchSettings;
use crate::settings::sorting::resolve_index;

pub use hooks::{OrganicQuery, SearchHooks};
pub use transport::{ReplayTransport, Transport};

/// Per-call options.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub hooks: Option<Arc<dyn SearchHooks>>,
}

impl RequestOptions {
    pub fn with_hooks(hooks: Arc<dyn SearchHooks>) -> Self {
        RequestOptions { hooks: Some(hooks) }
    }
}

/// Compiled engine requests with the rule directives that produced them.
#[derive(Debug, Clone, Default)]
pub struct CompiledBatch {
    pub requests: Vec<EngineRequest>,
    pub actions: Vec<QueryRuleActions>,
}

/// Client results for a batch, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResults {
    pub results: Vec<ClientResult>,
}

/// Read a request batch from a bare array or a `{"requests": [...]}` object.
pub fn parse_batch(body: &Value) -> Result<Vec<SearchRequest>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(object) => match object.get("requests") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(HopliteError::invalid_batch(
                    "expected an array of requests or an object with a 'requests' array",
                ));
            }
        },
        _ => {
            return Err(HopliteError::invalid_batch(
                "expected an array of requests or an object with a 'requests' array",
            ));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            serde_json::from_value(item.clone()).map_err(|e| {
                HopliteError::invalid_batch(format!("request {position} is malformed: {e}"))
            })
        })
        .collect()
}

/// Translates request batches for one engine through a [`Transport`].
pub struct Client<T: Transport> {
    settings: SearchSettings,
    transport: T,
}

impl<T: Transport> Client<T> {
    pub fn new(settings: SearchSettings, transport: T) -> Self {
        Client {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle a raw JSON request body.
    pub async fn handle_request_body(
        &self,
        body: &Value,
        options: &RequestOptions,
    ) -> Result<BatchResults> {
        let requests = parse_batch(body)?;
        self.handle_requests(&requests, options).await
    }

    /// Run the whole pipeline for a batch.
    ///
    /// A transport failure degrades to an empty result list. Compilation and
    /// decomposition failures are returned.
    pub async fn handle_requests(
        &self,
        requests: &[SearchRequest],
        options: &RequestOptions,
    ) -> Result<BatchResults> {
        let hooks = options.hooks.as_deref();
        let compiled = self.compile_batch(requests, hooks)?;

        let engine_requests = match hooks {
            Some(hooks) => hooks.before_search(compiled.requests).await?,
            None => compiled.requests,
        };

        let mut responses = self.perform_search(&engine_requests).await;

        if let Some(hooks) = hooks {
            responses = hooks.after_search(&engine_requests, responses).await?;
        }

        let results = self.transform_batch(requests, &responses, &compiled.actions)?;
        Ok(BatchResults { results })
    }

    /// Evaluate rules and compile every request of the batch.
    pub fn compile_batch(
        &self,
        requests: &[SearchRequest],
        hooks: Option<&dyn SearchHooks>,
    ) -> Result<CompiledBatch> {
        let compiled: Vec<(EngineRequest, QueryRuleActions)> = requests
            .par_iter()
            .map(|request| -> Result<(EngineRequest, QueryRuleActions)> {
                let actions = evaluate_rules(&self.settings.query_rules, request);
                let body = compile_request(request, &self.settings, &actions, hooks)?;
                let index = resolve_index(&request.index_name, &self.settings.sorting).index;
                Ok((
                    EngineRequest {
                        index_name: index,
                        body,
                    },
                    actions,
                ))
            })
            .collect::<Result<_>>()?;

        let (requests, actions) = compiled.into_iter().unzip();
        Ok(CompiledBatch { requests, actions })
    }

    /// Send the batch; a transport error is logged and yields no responses.
    pub async fn perform_search(&self, requests: &[EngineRequest]) -> Vec<Value> {
        if log::log_enabled!(log::Level::Debug) {
            match create_msearch_body(requests) {
                Ok(body) => log::debug!("POST /_msearch\n{body}"),
                Err(e) => log::debug!("failed to render msearch body: {e}"),
            }
        }

        match self.transport.msearch(requests).await {
            Ok(responses) => responses,
            Err(e) => {
                log::error!("search request failed: {e}");
                Vec::new()
            }
        }
    }

    /// Decompose raw responses against their requests.
    ///
    /// Results follow the responses; a short response list yields fewer
    /// results. Any failure aborts the batch and names the index.
    pub fn transform_batch(
        &self,
        requests: &[SearchRequest],
        responses: &[Value],
        actions: &[QueryRuleActions],
    ) -> Result<Vec<ClientResult>> {
        if responses.len() != requests.len() {
            log::warn!(
                "received {} responses for {} requests",
                responses.len(),
                requests.len()
            );
        }

        requests
            .par_iter()
            .zip(responses.par_iter())
            .zip(actions.par_iter())
            .map(|((request, raw), actions)| {
                decompose(raw, request, &self.settings, actions)
                    .map_err(|e| HopliteError::response_transform(&request.index_name, e))
            })
            .collect()
    }
}
