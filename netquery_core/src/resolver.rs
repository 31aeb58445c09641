//! Poset resolution: builds the per-network table of match targets.
//!
//! Resolution never touches the validated [`QuerySpec`](crate::QuerySpec);
//! it returns a new [`ResolvedPosets`] value that fully specifies datasets,
//! epsilons and which networks take part in the sweep.

use crate::config::{LiteralPosets, PatternSource};
use crate::dispatch::NetworkPlan;
use crate::error::Result;
use netquery_env::{EventOrdering, PosetSource};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Dataset identifier used for posets given verbatim in the parameter file.
pub const LITERAL_DATASET: &str = "no_time_series_file";

/// Noise level with a total order, usable as a map key.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct Epsilon(pub f64);

impl PartialEq for Epsilon {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Epsilon {}

impl PartialOrd for Epsilon {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Epsilon {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for Epsilon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event orderings of one dataset, ascending by epsilon.
pub type DatasetPosets = Vec<(Epsilon, EventOrdering)>;

/// Sorted variable names to `{dataset -> [(epsilon, ordering)]}`.
pub type PosetTable = BTreeMap<Vec<String>, BTreeMap<String, DatasetPosets>>;

/// Output of resolution.
#[derive(Debug, Clone)]
pub struct ResolvedPosets {
    pub table: PosetTable,

    /// Dataset identifiers in configuration order
    pub datasets: Vec<String>,

    /// Every epsilon appearing in the table, ascending
    pub epsilons: Vec<Epsilon>,

    /// Networks with posets in at least one dataset, input order kept
    pub networks: Vec<NetworkPlan>,

    /// Networks without posets in any dataset
    pub dropped: Vec<NetworkPlan>,

    /// Per dataset, network variables with no time series there
    pub missing_names: BTreeMap<String, BTreeSet<String>>,
}

impl ResolvedPosets {
    /// Posets for a network, keyed by dataset. Empty if it was dropped.
    pub fn lookup(&self, plan: &NetworkPlan) -> Option<&BTreeMap<String, DatasetPosets>> {
        self.table.get(&plan.description.sorted_names())
    }

    /// True when the union over datasets is reported.
    pub fn is_multi_dataset(&self) -> bool {
        self.datasets.len() > 1
    }
}

/// Resolves the event orderings every network is matched against.
///
/// Networks whose variables are not all covered by a dataset are left out
/// of that dataset; networks covered by no dataset are dropped with a
/// warning. Posets are extracted once per distinct variable-name set.
pub fn resolve_posets(
    source: &PatternSource,
    networks: &[NetworkPlan],
    posets: &dyn PosetSource,
) -> Result<ResolvedPosets> {
    let resolved = match source {
        PatternSource::Literal(literal) => resolve_literal(literal, networks),
        PatternSource::TimeSeries { files, layout, epsilons } => {
            let mut table = PosetTable::new();
            let mut missing_names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

            for dataset in files {
                let available = posets.variable_names(dataset, *layout)?;
                for plan in networks {
                    let names = plan.description.sorted_names();
                    let missing: Vec<&String> =
                        names.iter().filter(|n| !available.contains(*n)).collect();
                    if !missing.is_empty() {
                        missing_names
                            .entry(dataset.clone())
                            .or_default()
                            .extend(missing.into_iter().cloned());
                        continue;
                    }

                    let per_dataset = table.entry(names.clone()).or_default();
                    if per_dataset.contains_key(dataset) {
                        continue;
                    }
                    debug!("Extracting posets for ({}) from {}", names.join(","), dataset);
                    let mut extracted: DatasetPosets = posets
                        .eps_posets(dataset, *layout, &names, epsilons)?
                        .into_iter()
                        .map(|(e, ordering)| (Epsilon(e), ordering))
                        .collect();
                    extracted.sort_by(|a, b| a.0.cmp(&b.0));
                    per_dataset.insert(dataset.clone(), extracted);
                }
            }

            let (kept, dropped) = partition(networks, &table);
            ResolvedPosets {
                table,
                datasets: files.clone(),
                epsilons: epsilons.iter().copied().map(Epsilon).collect(),
                networks: kept,
                dropped,
                missing_names,
            }
        }
    };

    for (dataset, names) in &resolved.missing_names {
        warn!(
            "No time series in {} for variables: {}",
            dataset,
            names.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    for plan in &resolved.dropped {
        warn!("Network dropped, no posets for its variables: {}", plan.network);
    }
    info!(
        "Resolved posets for {} of {} networks across {} dataset(s)",
        resolved.networks.len(),
        networks.len(),
        resolved.datasets.len()
    );
    Ok(resolved)
}

fn resolve_literal(literal: &LiteralPosets, networks: &[NetworkPlan]) -> ResolvedPosets {
    let mut table = PosetTable::new();
    let mut epsilons = BTreeSet::new();
    for (names, entries) in literal {
        let posets: DatasetPosets = entries
            .iter()
            .map(|(e, ordering)| (Epsilon(*e), ordering.clone()))
            .collect();
        epsilons.extend(posets.iter().map(|(e, _)| *e));
        table
            .entry(names.clone())
            .or_default()
            .insert(LITERAL_DATASET.to_string(), posets);
    }

    let covered: BTreeSet<&String> = literal.keys().flatten().collect();
    let mut missing = BTreeSet::new();
    for plan in networks {
        if !table.contains_key(&plan.description.sorted_names()) {
            missing.extend(
                plan.description
                    .variables
                    .iter()
                    .filter(|n| !covered.contains(n))
                    .cloned(),
            );
        }
    }
    let mut missing_names = BTreeMap::new();
    if !missing.is_empty() {
        missing_names.insert(LITERAL_DATASET.to_string(), missing);
    }

    let (kept, dropped) = partition(networks, &table);
    ResolvedPosets {
        table,
        datasets: vec![LITERAL_DATASET.to_string()],
        epsilons: epsilons.into_iter().collect(),
        networks: kept,
        dropped,
        missing_names,
    }
}

fn partition(networks: &[NetworkPlan], table: &PosetTable) -> (Vec<NetworkPlan>, Vec<NetworkPlan>) {
    networks
        .iter()
        .cloned()
        .partition(|plan| table.contains_key(&plan.description.sorted_names()))
}
