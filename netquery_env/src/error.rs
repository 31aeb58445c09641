//! Error types for the netquery capability abstraction.

use thiserror::Error;

/// Errors raised by an analysis oracle or a poset source.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle has no record of the requested network
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// Parameter index outside the network's parameter space
    #[error("Parameter index {index} out of range (parameter space size {size})")]
    ParameterOutOfRange { index: usize, size: usize },

    /// Morse node index outside a decomposition
    #[error("Morse node {0} does not exist in the decomposition")]
    UnknownMorseNode(usize),

    /// The poset source has no record of the requested dataset
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// No event ordering available for the requested names/epsilon
    #[error("Missing poset: {0}")]
    MissingPoset(String),

    /// The capability does not implement the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Malformed annotation label
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// Catalog file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog file could not be parsed
    #[error("Catalog format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl OracleError {
    /// Creates an unknown-network error.
    pub fn unknown_network(network: impl std::fmt::Display) -> Self {
        Self::UnknownNetwork(network.to_string())
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}
