//! netquery Capability Abstraction Layer
//!
//! This crate defines the boundary between the sweep engine and the
//! external graph-analysis capability it treats as a black box.
//!
//! # Core Concept: The Oracle Seam
//!
//! Everything expensive or domain-specific sits behind two traits:
//! - **Graph analysis** (`QueryOracle`): parameter spaces, attractor
//!   decompositions, realized logic, path matching
//! - **Event orderings** (`PosetSource`): posets of extrema extracted
//!   from time series at a given noise level
//!
//! The engine only ever asks questions; answers must be pure functions of
//! the arguments so that sweeps are reproducible under any scheduling.
//!
//! # Example
//!
//! ```ignore
//! use netquery_env::{CatalogOracle, QueryOracle, NetworkSpecifier};
//!
//! let oracle = CatalogOracle::from_file("catalog.json")?;
//! let net = NetworkSpecifier::new("X1 : X2\nX2 : X1");
//! let desc = oracle.describe(&net)?;
//! for p in 0..desc.parameter_count {
//!     let decomposition = oracle.decompose(&net, p)?;
//! }
//! ```

mod catalog;
mod error;
mod oracle;
mod poset_source;
mod types;

pub use catalog::{
    Catalog, CatalogDataset, CatalogMorseNode, CatalogNetwork, CatalogOracle, CatalogParameter,
};
pub use error::OracleError;
pub use oracle::QueryOracle;
pub use poset_source::PosetSource;
pub use types::{
    Annotation, Decomposition, EventOrdering, MorseNode, NetworkDescription, NetworkSpecifier,
    NodeLogic, SearchScope, TimeSeriesLayout,
};
