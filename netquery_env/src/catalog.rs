//! Production oracle backed by a catalog exported from the analysis tool.
//!
//! The external tool computes decompositions, logic and pattern matches
//! offline and exports them as JSON. `CatalogOracle` answers queries by
//! lookup, so sweeps run without linking the tool itself.
//!
//! ```text
//! {
//!   "networks": {
//!     "X1 : (X1) : E\n...": {
//!       "variables": ["X1", "X2"],
//!       "parameters": [
//!         { "morse": [{ "annotation": "FP { 1, 0 }", "children": [], "matches": [], "cycle_matches": [] }],
//!           "logic": [{ "inputs": 1, "outputs": 2, "hex": "C" }],
//!           "domain_matches": [[["X1 min", "X2 max"], [[0, 1]]]],
//!           "domain_cycle_matches": [] }
//!       ],
//!       "neighbors": [0]
//!     }
//!   },
//!   "timeseries": {
//!     "wt.tsv": { "names": ["X1", "X2"], "posets": { "X1,X2": [[0.05, [["X1 min"], []]]] } }
//!   }
//! }
//! ```

use crate::error::OracleError;
use crate::oracle::QueryOracle;
use crate::poset_source::PosetSource;
use crate::types::{
    Annotation, Decomposition, EventOrdering, MorseNode, NetworkDescription, NetworkSpecifier,
    NodeLogic, SearchScope, TimeSeriesLayout,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Epsilon values closer than this are considered equal.
const EPSILON_TOLERANCE: f64 = 1e-9;

/// One recurrent class with the patterns it is known to match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMorseNode {
    pub annotation: Annotation,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub matches: Vec<EventOrdering>,
    #[serde(default)]
    pub cycle_matches: Vec<EventOrdering>,
}

/// Precomputed facts for one parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogParameter {
    #[serde(default)]
    pub morse: Vec<CatalogMorseNode>,
    #[serde(default)]
    pub logic: Vec<NodeLogic>,
    #[serde(default)]
    pub domain_matches: Vec<EventOrdering>,
    #[serde(default)]
    pub domain_cycle_matches: Vec<EventOrdering>,
}

/// Precomputed facts for one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogNetwork {
    pub variables: Vec<String>,
    pub parameters: Vec<CatalogParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<Vec<usize>>,
}

/// Posets extracted from one time-series file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub names: BTreeSet<String>,

    /// Keyed by comma-joined sorted variable names
    #[serde(default)]
    pub posets: BTreeMap<String, Vec<(f64, EventOrdering)>>,
}

/// Complete exported catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub networks: BTreeMap<String, CatalogNetwork>,
    #[serde(default)]
    pub timeseries: BTreeMap<String, CatalogDataset>,
}

/// Oracle and poset source answering from a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogOracle {
    catalog: Catalog,
}

impl CatalogOracle {
    /// Creates an oracle over an in-memory catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Loads a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, OracleError> {
        let catalog: Catalog = serde_json::from_str(text)?;
        Ok(Self::new(catalog))
    }

    /// Returns the underlying catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn network(&self, network: &NetworkSpecifier) -> Result<&CatalogNetwork, OracleError> {
        self.catalog
            .networks
            .get(network.as_str())
            .ok_or_else(|| OracleError::unknown_network(network))
    }

    fn parameter(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
    ) -> Result<&CatalogParameter, OracleError> {
        let entry = self.network(network)?;
        entry.parameters.get(parameter).ok_or(OracleError::ParameterOutOfRange {
            index: parameter,
            size: entry.parameters.len(),
        })
    }

    fn dataset(&self, dataset: &str) -> Result<&CatalogDataset, OracleError> {
        self.catalog
            .timeseries
            .get(dataset)
            .ok_or_else(|| OracleError::UnknownDataset(dataset.to_string()))
    }
}

impl QueryOracle for CatalogOracle {
    fn describe(&self, network: &NetworkSpecifier) -> Result<NetworkDescription, OracleError> {
        let entry = self.network(network)?;
        Ok(NetworkDescription {
            variables: entry.variables.clone(),
            parameter_count: entry.parameters.len(),
        })
    }

    fn decompose(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
    ) -> Result<Decomposition, OracleError> {
        let entry = self.parameter(network, parameter)?;
        Ok(Decomposition::new(
            entry
                .morse
                .iter()
                .map(|node| MorseNode {
                    annotation: node.annotation.clone(),
                    children: node.children.clone(),
                })
                .collect(),
        ))
    }

    fn logic(&self, network: &NetworkSpecifier, parameter: usize) -> Result<Vec<NodeLogic>, OracleError> {
        Ok(self.parameter(network, parameter)?.logic.clone())
    }

    fn path_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError> {
        let entry = self.parameter(network, parameter)?;
        match scope {
            SearchScope::Domain => Ok(entry.domain_matches.contains(pattern)),
            SearchScope::MorseNode(index) => entry
                .morse
                .get(index)
                .map(|node| node.matches.contains(pattern))
                .ok_or(OracleError::UnknownMorseNode(index)),
        }
    }

    fn cycle_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError> {
        let entry = self.parameter(network, parameter)?;
        match scope {
            SearchScope::Domain => Ok(entry.domain_cycle_matches.contains(pattern)),
            SearchScope::MorseNode(index) => entry
                .morse
                .get(index)
                .map(|node| node.cycle_matches.contains(pattern))
                .ok_or(OracleError::UnknownMorseNode(index)),
        }
    }

    fn neighbor_parameters(&self, network: &NetworkSpecifier) -> Result<Vec<usize>, OracleError> {
        self.network(network)?
            .neighbors
            .clone()
            .ok_or_else(|| OracleError::unsupported(format!("no neighbor list cataloged for {}", network)))
    }
}

impl PosetSource for CatalogOracle {
    fn variable_names(
        &self,
        dataset: &str,
        _layout: TimeSeriesLayout,
    ) -> Result<BTreeSet<String>, OracleError> {
        Ok(self.dataset(dataset)?.names.clone())
    }

    fn eps_posets(
        &self,
        dataset: &str,
        _layout: TimeSeriesLayout,
        names: &[String],
        epsilons: &[f64],
    ) -> Result<Vec<(f64, EventOrdering)>, OracleError> {
        let key = names.join(",");
        let available = self
            .dataset(dataset)?
            .posets
            .get(&key)
            .ok_or_else(|| OracleError::MissingPoset(format!("{} in {}", key, dataset)))?;

        epsilons
            .iter()
            .map(|&eps| {
                available
                    .iter()
                    .find(|(e, _)| (e - eps).abs() < EPSILON_TOLERANCE)
                    .map(|(_, pattern)| (eps, pattern.clone()))
                    .ok_or_else(|| {
                        OracleError::MissingPoset(format!("{} at epsilon {} in {}", key, eps, dataset))
                    })
            })
            .collect()
    }
}
