//! The engine transport seam.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{HopliteError, Result};
use crate::query::EngineRequest;

/// Sends a compiled batch to the search engine.
///
/// Implementations return one raw response per request, in request order.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use hoplite::client::Transport;
/// use hoplite::error::Result;
/// use hoplite::query::EngineRequest;
/// use serde_json::{Value, json};
///
/// struct Empty;
///
/// #[async_trait]
/// impl Transport for Empty {
///     async fn msearch(&self, requests: &[EngineRequest]) -> Result<Vec<Value>> {
///         Ok(requests
///             .iter()
///             .map(|_| json!({"took": 0, "hits": {"total": 0, "hits": []}}))
///             .collect())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    async fn msearch(&self, requests: &[EngineRequest]) -> Result<Vec<Value>>;
}

/// Serves previously recorded engine responses.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    responses: Vec<Value>,
}

impl ReplayTransport {
    pub fn new(responses: Vec<Value>) -> Self {
        ReplayTransport { responses }
    }

    /// Load recordings from a JSON array or an `{"responses": [...]}` object.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(responses) => Ok(Self::new(responses)),
            Value::Object(mut object) => match object.remove("responses") {
                Some(Value::Array(responses)) => Ok(Self::new(responses)),
                _ => Err(HopliteError::config(
                    "recorded responses must be an array or contain a 'responses' array",
                )),
            },
            _ => Err(HopliteError::config(
                "recorded responses must be an array or contain a 'responses' array",
            )),
        }
    }

    pub fn responses(&self) -> &[Value] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn msearch(&self, requests: &[EngineRequest]) -> Result<Vec<Value>> {
        if self.responses.len() < requests.len() {
            return Err(HopliteError::transport(format!(
                "{} recorded responses for {} requests",
                self.responses.len(),
                requests.len()
            )));
        }
        Ok(self.responses[..requests.len()].to_vec())
    }
}
