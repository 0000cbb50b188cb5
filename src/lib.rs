//! # Hoplite
//!
//! Translates batches of instant-search requests into search engine queries
//! and the engine's raw responses back into client-facing results.
//!
//! ## Features
//!
//! - Declarative query rules (pinning, rewrites, filters, boosts, facet ordering)
//! - Facet and numeric filter compilation with per-facet overrides
//! - Nested aggregation flattening and numeric facet statistics
//! - Pluggable transport and request/response hooks

pub mod cli;
pub mod client;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod rules;
pub mod settings;

pub mod prelude {
    pub use crate::client::{Client, RequestOptions, SearchHooks, Transport};
    pub use crate::error::{HopliteError, Result};
    pub use crate::request::{SearchParams, SearchRequest};
    pub use crate::rules::{QueryRule, QueryRuleActions};
    pub use crate::settings::{FacetAttributeConfig, FacetHandler, FacetType, SearchSettings};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
