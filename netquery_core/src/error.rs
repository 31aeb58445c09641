//! Error types for the sweep engine.

use netquery_env::OracleError;
use thiserror::Error;

/// Errors that abort a query run.
///
/// Unresolvable networks are not errors: they are reported as diagnostics
/// by the resolver and the run continues without them.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Missing, conflicting or malformed configuration keys
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A worker failed while calling into the analysis capability
    #[error("Predicate evaluation failed for {unit}: {source}")]
    PredicateEvaluation {
        unit: String,
        #[source]
        source: OracleError,
    },

    /// Nothing left to sweep after resolution
    #[error("No networks available for analysis: {0}")]
    EmptyInput(String),

    /// Analysis capability failed outside of dispatch (describe, posets)
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// Filesystem failure while recording results
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wraps an oracle failure with the key of the unit that hit it.
    pub fn evaluation(unit: impl std::fmt::Display, source: OracleError) -> Self {
        Self::PredicateEvaluation { unit: unit.to_string(), source }
    }

    /// True for errors raised before any side effect of the run.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::EmptyInput(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
