//! Analysis oracle trait: the black-box graph-analysis capability.

use crate::error::OracleError;
use crate::types::{
    Decomposition, EventOrdering, NetworkDescription, NetworkSpecifier, NodeLogic, SearchScope,
};

/// The central interface to the external network-analysis capability.
///
/// The sweep engine never computes attractors or matches patterns itself;
/// every graph question is delegated here.
///
/// # Implementations
///
/// - **Production**: `CatalogOracle` - answers from a catalog exported by the analysis tool
/// - **Simulation**: `SyntheticOracle` (in `netquery_run`) - seeded, deterministic answers
///
/// # Concurrency
///
/// Workers call into the oracle concurrently with no coordination, so every
/// method takes `&self` and must be free of observable shared mutation.
/// Answers must depend only on the arguments, never on call order.
pub trait QueryOracle: Send + Sync {
    /// Returns the canonical variable ordering and parameter-space size.
    fn describe(&self, network: &NetworkSpecifier) -> Result<NetworkDescription, OracleError>;

    /// Decomposes one parameter into its poset of attracting classes.
    fn decompose(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
    ) -> Result<Decomposition, OracleError>;

    /// Returns the realized logic of every node under one parameter.
    fn logic(&self, network: &NetworkSpecifier, parameter: usize) -> Result<Vec<NodeLogic>, OracleError>;

    /// Boolean path match between a search graph and a target event ordering.
    ///
    /// # Arguments
    /// * `scope` - Search the whole domain graph or a single recurrent class
    /// * `pattern` - The target event ordering
    fn path_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError>;

    /// Boolean cycle match: the pattern, read as a repeating cycle of
    /// extrema, is realized by a cycle of the search graph.
    fn cycle_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError>;

    /// Parameter indices adjacent to the network's essential parameters.
    ///
    /// Neighbor expansion is an optional capability; the default refuses.
    fn neighbor_parameters(&self, network: &NetworkSpecifier) -> Result<Vec<usize>, OracleError> {
        Err(OracleError::unsupported(format!("neighbor expansion for {}", network)))
    }

    /// Builds any per-network artifact the capability needs before queries.
    ///
    /// Called once per network by the coordinator, which waits for it to
    /// return before dispatching that network's work.
    fn prepare(&self, _network: &NetworkSpecifier) -> Result<(), OracleError> {
        Ok(())
    }
}
