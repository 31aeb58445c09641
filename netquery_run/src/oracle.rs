//! Synthetic oracle for deterministic sweep testing.
//!
//! The SyntheticOracle stands in for the external analysis tool:
//! - Variable names parsed from the network specification
//! - Parameter-space sizes, decompositions and logic drawn from a seeded RNG
//! - Path matches and time-series posets derived the same way
//!
//! Every answer is a pure function of (seed, arguments). Each call seeds its
//! own ChaCha8 stream, so results do not depend on call order or on which
//! worker thread asks.

use netquery_env::{
    Annotation, Decomposition, EventOrdering, MorseNode, NetworkDescription, NetworkSpecifier,
    NodeLogic, OracleError, PosetSource, QueryOracle, SearchScope, TimeSeriesLayout,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Hex codes drawn for synthetic node logic.
const HEX_CODES: [&str; 6] = ["0", "2", "8", "C", "E", "F"];

/// FNV-1a, stable across runs and platforms.
fn fnv1a(bytes: &[u8], mut hash: u64) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// The synthetic oracle: seeded answers for any parseable network.
#[derive(Debug, Clone)]
pub struct SyntheticOracle {
    /// Master seed
    seed: u64,

    /// Smallest generated parameter space
    min_parameters: usize,

    /// Largest generated parameter space
    max_parameters: usize,

    /// Probability that a path match succeeds
    match_rate: f64,

    /// (network, parameter) pairs whose decomposition fails
    failures: BTreeSet<(String, usize)>,

    /// Dataset name to the variables it carries
    datasets: BTreeMap<String, BTreeSet<String>>,
}

impl SyntheticOracle {
    /// Creates an oracle with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            min_parameters: 4,
            max_parameters: 24,
            match_rate: 0.3,
            failures: BTreeSet::new(),
            datasets: BTreeMap::new(),
        }
    }

    /// Sets the range of generated parameter-space sizes.
    pub fn with_parameter_range(mut self, min: usize, max: usize) -> Self {
        self.min_parameters = min.max(1);
        self.max_parameters = max.max(self.min_parameters);
        self
    }

    /// Sets the probability of a successful path match.
    pub fn with_match_rate(mut self, rate: f64) -> Self {
        self.match_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Registers a time-series dataset carrying the given variables.
    pub fn with_dataset<I, S>(mut self, dataset: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datasets
            .insert(dataset.to_string(), names.into_iter().map(Into::into).collect());
        self
    }

    /// Makes every analysis call for one parameter fail.
    pub fn with_failure(mut self, network: &NetworkSpecifier, parameter: usize) -> Self {
        self.failures.insert((network.as_str().to_string(), parameter));
        self
    }

    fn stream(&self, parts: &[&[u8]]) -> ChaCha8Rng {
        let hash = parts
            .iter()
            .fold(fnv1a(&self.seed.to_le_bytes(), 0xcbf29ce484222325), |h, part| {
                // Separator keeps ("ab", "c") and ("a", "bc") apart
                fnv1a(part, fnv1a(&[0xff], h))
            });
        ChaCha8Rng::seed_from_u64(hash)
    }

    fn parameter_stream(&self, network: &NetworkSpecifier, parameter: usize, salt: &str) -> ChaCha8Rng {
        self.stream(&[network.as_str().as_bytes(), &parameter.to_le_bytes(), salt.as_bytes()])
    }

    fn seeded_match(
        &self,
        kind: &str,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError> {
        self.check(network, parameter)?;
        let scope_tag = match scope {
            SearchScope::Domain => "domain".to_string(),
            SearchScope::MorseNode(index) => format!("morse{}", index),
        };
        let pattern_tag = serde_json::to_string(pattern)?;
        let mut rng = self.stream(&[
            kind.as_bytes(),
            network.as_str().as_bytes(),
            &parameter.to_le_bytes(),
            scope_tag.as_bytes(),
            pattern_tag.as_bytes(),
        ]);
        Ok(rng.gen_bool(self.match_rate))
    }

    fn check(&self, network: &NetworkSpecifier, parameter: usize) -> Result<NetworkDescription, OracleError> {
        let description = self.describe(network)?;
        if parameter >= description.parameter_count {
            return Err(OracleError::ParameterOutOfRange {
                index: parameter,
                size: description.parameter_count,
            });
        }
        if self.failures.contains(&(network.as_str().to_string(), parameter)) {
            return Err(OracleError::unsupported(format!(
                "injected failure at parameter {} of {}",
                parameter, network
            )));
        }
        Ok(description)
    }
}

/// Variable names are the left-hand sides of `NAME : inputs` lines.
fn parse_variables(network: &NetworkSpecifier) -> Vec<String> {
    network
        .as_str()
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl QueryOracle for SyntheticOracle {
    fn describe(&self, network: &NetworkSpecifier) -> Result<NetworkDescription, OracleError> {
        let variables = parse_variables(network);
        if variables.is_empty() {
            return Err(OracleError::unknown_network(network));
        }
        let mut rng = self.stream(&[network.as_str().as_bytes(), b"size"]);
        let parameter_count = rng.gen_range(self.min_parameters..=self.max_parameters);
        Ok(NetworkDescription { variables, parameter_count })
    }

    fn decompose(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
    ) -> Result<Decomposition, OracleError> {
        let description = self.check(network, parameter)?;
        let mut rng = self.parameter_stream(network, parameter, "morse");

        let leaves = rng.gen_range(1..=3);
        let mut nodes: Vec<MorseNode> = (0..leaves)
            .map(|_| {
                let annotation = if rng.gen_bool(0.25) {
                    Annotation::FullCycle
                } else {
                    Annotation::FixedPoint(
                        (0..description.variables.len())
                            .map(|_| rng.gen_range(0..3))
                            .collect(),
                    )
                };
                MorseNode { annotation, children: vec![] }
            })
            .collect();

        // Some parameters carry an unstable class above every leaf
        if rng.gen_bool(0.5) {
            let label = if rng.gen_bool(0.5) { Annotation::FullCycle } else { Annotation::Other("XC".into()) };
            nodes.insert(0, MorseNode { annotation: label, children: (1..=leaves).collect() });
        }
        Ok(Decomposition::new(nodes))
    }

    fn logic(&self, network: &NetworkSpecifier, parameter: usize) -> Result<Vec<NodeLogic>, OracleError> {
        let description = self.check(network, parameter)?;
        let mut rng = self.parameter_stream(network, parameter, "logic");
        Ok(description
            .variables
            .iter()
            .map(|_| {
                let hex = HEX_CODES.choose(&mut rng).copied().unwrap_or("0");
                NodeLogic::new(rng.gen_range(1..=2), rng.gen_range(1..=2), hex)
            })
            .collect())
    }

    fn path_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError> {
        self.seeded_match("path", network, parameter, scope, pattern)
    }

    fn cycle_match(
        &self,
        network: &NetworkSpecifier,
        parameter: usize,
        scope: SearchScope,
        pattern: &EventOrdering,
    ) -> Result<bool, OracleError> {
        self.seeded_match("cycle", network, parameter, scope, pattern)
    }

    fn neighbor_parameters(&self, network: &NetworkSpecifier) -> Result<Vec<usize>, OracleError> {
        let description = self.describe(network)?;
        let mut rng = self.stream(&[network.as_str().as_bytes(), b"neighbors"]);
        Ok((0..description.parameter_count).filter(|_| rng.gen_bool(0.4)).collect())
    }
}

impl PosetSource for SyntheticOracle {
    fn variable_names(
        &self,
        dataset: &str,
        _layout: TimeSeriesLayout,
    ) -> Result<BTreeSet<String>, OracleError> {
        self.datasets
            .get(dataset)
            .cloned()
            .ok_or_else(|| OracleError::UnknownDataset(dataset.to_string()))
    }

    fn eps_posets(
        &self,
        dataset: &str,
        layout: TimeSeriesLayout,
        names: &[String],
        epsilons: &[f64],
    ) -> Result<Vec<(f64, EventOrdering)>, OracleError> {
        let available = self.variable_names(dataset, layout)?;
        if let Some(missing) = names.iter().find(|n| !available.contains(*n)) {
            return Err(OracleError::MissingPoset(format!("{} in {}", missing, dataset)));
        }

        Ok(epsilons
            .iter()
            .map(|&eps| {
                let mut rng = self.stream(&[dataset.as_bytes(), names.join(",").as_bytes(), &eps.to_le_bytes()]);
                let mut events: Vec<String> = names
                    .iter()
                    .map(|n| format!("{} {}", n, if rng.gen_bool(0.5) { "min" } else { "max" }))
                    .collect();
                events.shuffle(&mut rng);
                // Coarser noise levels keep fewer ordering constraints
                let ordering = (1..events.len())
                    .filter(|_| rng.gen_bool(1.0 - eps))
                    .map(|i| (i - 1, i))
                    .collect();
                (eps, EventOrdering::new(events, ordering))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(spec: &str) -> NetworkSpecifier {
        NetworkSpecifier::new(spec)
    }

    #[test]
    fn test_variables_from_specification() {
        let oracle = SyntheticOracle::new(42);
        let desc = oracle.describe(&net("SWI4 : (NDD1)\nNDD1 : (SWI4)(~HCM1)\nHCM1 : SWI4")).unwrap();
        assert_eq!(desc.variables, vec!["SWI4", "NDD1", "HCM1"]);
        assert!((4..=24).contains(&desc.parameter_count));
        assert!(oracle.describe(&net("no variables here")).is_err());
    }

    #[test]
    fn test_determinism() {
        let a = SyntheticOracle::new(7);
        let b = SyntheticOracle::new(7);
        let n = net("A : (B)\nB : (A)");
        for p in 0..a.describe(&n).unwrap().parameter_count {
            assert_eq!(a.decompose(&n, p).unwrap(), b.decompose(&n, p).unwrap());
            assert_eq!(a.logic(&n, p).unwrap(), b.logic(&n, p).unwrap());
        }
    }

    #[test]
    fn test_call_order_independence() {
        let oracle = SyntheticOracle::new(3);
        let n = net("A : (B)\nB : (A)");
        let first = oracle.decompose(&n, 1).unwrap();
        let _ = oracle.decompose(&n, 0).unwrap();
        let _ = oracle.logic(&n, 1).unwrap();
        assert_eq!(oracle.decompose(&n, 1).unwrap(), first);
    }

    #[test]
    fn test_decomposition_has_leaves_with_coordinates() {
        let oracle = SyntheticOracle::new(11);
        let n = net("A : (B)\nB : (A)\nC : (A)");
        for p in 0..oracle.describe(&n).unwrap().parameter_count {
            let d = oracle.decompose(&n, p).unwrap();
            assert!(d.leaves().count() >= 1);
            for (_, leaf) in d.leaves() {
                if let Some(coords) = leaf.annotation.coordinates() {
                    assert_eq!(coords.len(), 3);
                }
            }
        }
    }

    #[test]
    fn test_injected_failure_and_range() {
        let n = net("A : (A)");
        let oracle = SyntheticOracle::new(1).with_parameter_range(4, 4).with_failure(&n, 2);
        assert!(oracle.decompose(&n, 1).is_ok());
        assert!(oracle.decompose(&n, 2).is_err());
        assert!(oracle.logic(&n, 2).is_err());
        assert!(matches!(
            oracle.decompose(&n, 4),
            Err(OracleError::ParameterOutOfRange { index: 4, size: 4 })
        ));
    }

    #[test]
    fn test_match_rate_extremes_and_failure() {
        let n = net("A : (B)\nB : (A)");
        let pattern = EventOrdering::new(vec!["A min".into(), "B max".into()], vec![(0, 1)]);
        let always = SyntheticOracle::new(2).with_match_rate(1.0).with_parameter_range(3, 3);
        let never = SyntheticOracle::new(2).with_match_rate(0.0).with_parameter_range(3, 3);
        for scope in [SearchScope::Domain, SearchScope::MorseNode(0)] {
            assert!(always.path_match(&n, 0, scope, &pattern).unwrap());
            assert!(always.cycle_match(&n, 0, scope, &pattern).unwrap());
            assert!(!never.path_match(&n, 0, scope, &pattern).unwrap());
            assert!(!never.cycle_match(&n, 0, scope, &pattern).unwrap());
        }

        let failing = always.with_failure(&n, 1);
        assert!(failing.cycle_match(&n, 1, SearchScope::Domain, &pattern).is_err());
        assert!(failing.path_match(&n, 1, SearchScope::Domain, &pattern).is_err());
    }

    #[test]
    fn test_synthetic_posets() {
        let oracle = SyntheticOracle::new(5).with_dataset("wt.tsv", ["A", "B"]);
        let names = vec!["A".to_string(), "B".to_string()];
        let posets = oracle.eps_posets("wt.tsv", TimeSeriesLayout::Rows, &names, &[0.0, 0.1]).unwrap();
        assert_eq!(posets.len(), 2);
        assert_eq!(posets[0].1.events().len(), 2);
        // Zero noise keeps every consecutive constraint
        assert_eq!(posets[0].1.ordering().len(), 1);

        let missing = vec!["C".to_string()];
        assert!(oracle.eps_posets("wt.tsv", TimeSeriesLayout::Rows, &missing, &[0.0]).is_err());
        assert!(oracle.variable_names("ko.tsv", TimeSeriesLayout::Rows).is_err());
    }
}
