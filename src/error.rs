//! Error types for the Hoplite library.
//!
//! All errors are represented by the [`HopliteError`] enum. Errors raised while
//! transforming a response are wrapped with the index they belong to so the
//! original cause stays reachable through [`std::error::Error::source`].
//!
//! # Examples
//!
//! ```
//! use hoplite::error::{HopliteError, Result};
//!
//! fn compile_step() -> Result<()> {
//!     Err(HopliteError::query_compile("unexpected token"))
//! }
//!
//! match compile_step() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Hoplite operations.
#[derive(Error, Debug)]
pub enum HopliteError {
    /// The request batch was absent or not a sequence.
    #[error("Invalid batch input: {0}")]
    InvalidBatchInput(String),

    /// A request could not be compiled into an engine query.
    #[error("Query compile error: {0}")]
    QueryCompile(String),

    /// A raw engine response could not be transformed.
    #[error("Error transforming response for index {index}: {source}")]
    ResponseTransform {
        index: String,
        #[source]
        source: Box<HopliteError>,
    },

    /// A numeric facet was declared but its stats aggregation is missing.
    #[error("Missing stats aggregation for numeric facet: {0}")]
    MissingStatsAggregation(String),

    /// The engine transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Settings-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (settings files, recorded responses, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HopliteError.
pub type Result<T> = std::result::Result<T, HopliteError>;

impl HopliteError {
    /// Create a new invalid batch input error.
    pub fn invalid_batch<S: Into<String>>(msg: S) -> Self {
        HopliteError::InvalidBatchInput(msg.into())
    }

    /// Create a new query compile error.
    pub fn query_compile<S: Into<String>>(msg: S) -> Self {
        HopliteError::QueryCompile(msg.into())
    }

    /// Wrap an error raised while transforming the response for `index`.
    pub fn response_transform<S: Into<String>>(index: S, source: HopliteError) -> Self {
        HopliteError::ResponseTransform {
            index: index.into(),
            source: Box::new(source),
        }
    }

    /// Create a new missing stats aggregation error.
    pub fn missing_stats<S: Into<String>>(facet: S) -> Self {
        HopliteError::MissingStatsAggregation(facet.into())
    }

    /// Create a new transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        HopliteError::Transport(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HopliteError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HopliteError::Other(msg.into())
    }
}
