//! Cross-dataset aggregation of network tallies.
//!
//! Bound-style queries reduce to one row per network. Pattern queries reduce
//! to one table per (search kind, dataset), plus a synthesized `all` table
//! per search kind when more than one dataset participates. The `all` entry
//! is the union of matching parameter identities, never a sum of counts.

use crate::dispatch::{NetworkTally, SweepOutcome, TargetKey, TargetTally};
use crate::error::{QueryError, Result};
use crate::query::SearchKind;
use crate::resolver::{Epsilon, ResolvedPosets};
use netquery_env::NetworkSpecifier;
use std::collections::{BTreeMap, BTreeSet};

/// Reported result of one target: truth value or cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Exists(bool),
    Count(usize),
}

impl From<&TargetTally> for Verdict {
    fn from(tally: &TargetTally) -> Self {
        match tally {
            TargetTally::Exists(hit) => Verdict::Exists(*hit),
            TargetTally::Count(n) => Verdict::Count(*n),
            TargetTally::Members(set) => Verdict::Count(set.len()),
        }
    }
}

/// One network's row for bound-style queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsRow {
    pub verdict: Verdict,
    pub hex_satisfying: Option<usize>,
    pub parameter_count: usize,
}

/// One epsilon's entry for pattern queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRow {
    pub epsilon: Epsilon,
    pub verdict: Verdict,
    pub stable_cycles: Option<usize>,
    pub parameter_count: usize,

    /// Matching parameter indices, when identities were kept
    pub members: Option<BTreeSet<usize>>,
}

/// Dataset column of a pattern table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatasetLabel {
    Dataset(String),

    /// Union across every dataset
    All,
}

/// Rows per network, ascending by epsilon.
pub type PatternTable = BTreeMap<NetworkSpecifier, Vec<PatternRow>>;

/// Aggregated results of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    Bounds(BTreeMap<NetworkSpecifier, BoundsRow>),
    Patterns(BTreeMap<(SearchKind, DatasetLabel), PatternTable>),
}

/// Union of one target's tallies across datasets.
///
/// Identities are unioned and booleans OR-ed. Plain counts carry no
/// identities and cannot be unioned without double counting.
pub fn union_all<'a, I>(tallies: I) -> Result<TargetTally>
where
    I: IntoIterator<Item = &'a TargetTally>,
{
    let mut union: Option<TargetTally> = None;
    for tally in tallies {
        union = Some(match (union, tally) {
            (None, TargetTally::Count(_)) | (Some(TargetTally::Count(_)), _) => {
                return Err(QueryError::config(
                    "Dataset union requires retained parameter identities",
                ))
            }
            (None, t) => t.clone(),
            (Some(TargetTally::Exists(a)), TargetTally::Exists(b)) => TargetTally::Exists(a || *b),
            (Some(TargetTally::Members(mut a)), TargetTally::Members(b)) => {
                a.extend(b.iter().copied());
                TargetTally::Members(a)
            }
            _ => return Err(QueryError::config("Cannot union tallies of different kinds")),
        });
    }
    union.ok_or_else(|| QueryError::config("Dataset union over no datasets"))
}

/// One row per network for fixed-point and stable-cycle queries.
pub fn aggregate_bounds(outcome: &SweepOutcome) -> Result<BTreeMap<NetworkSpecifier, BoundsRow>> {
    outcome
        .tallies
        .iter()
        .map(|(network, tally)| {
            let target = tally
                .targets
                .get(&TargetKey::Bounds)
                .or_else(|| tally.targets.get(&TargetKey::StableCycle))
                .ok_or_else(|| {
                    QueryError::config(format!("Network '{}' has no bound tally", network))
                })?;
            Ok((
                network.clone(),
                BoundsRow {
                    verdict: Verdict::from(target),
                    hex_satisfying: tally.hex_satisfying,
                    parameter_count: tally.parameter_count,
                },
            ))
        })
        .collect()
}

fn pattern_row(tally: &NetworkTally, epsilon: Epsilon, target: &TargetTally, search: SearchKind) -> PatternRow {
    PatternRow {
        epsilon,
        verdict: Verdict::from(target),
        stable_cycles: match search {
            SearchKind::StableFullCycle => tally.stable_cycles,
            _ => None,
        },
        parameter_count: tally.parameter_count,
        members: target.members().cloned(),
    }
}

/// Per (search, dataset) tables, plus `all` tables for multi-dataset runs.
pub fn aggregate_patterns(
    outcome: &SweepOutcome,
    resolved: &ResolvedPosets,
    searches: &[SearchKind],
) -> Result<BTreeMap<(SearchKind, DatasetLabel), PatternTable>> {
    let mut tables: BTreeMap<(SearchKind, DatasetLabel), PatternTable> = BTreeMap::new();
    for &search in searches {
        for dataset in &resolved.datasets {
            tables.insert((search, DatasetLabel::Dataset(dataset.clone())), PatternTable::new());
        }
        if resolved.is_multi_dataset() {
            tables.insert((search, DatasetLabel::All), PatternTable::new());
        }
    }

    for (network, tally) in &outcome.tallies {
        // search -> epsilon -> per-dataset tallies
        let mut by_epsilon: BTreeMap<(SearchKind, Epsilon), Vec<&TargetTally>> = BTreeMap::new();

        for (key, target) in &tally.targets {
            let TargetKey::Pattern { search, dataset, epsilon } = key else {
                continue;
            };
            if let Some(table) = tables.get_mut(&(*search, DatasetLabel::Dataset(dataset.clone()))) {
                table
                    .entry(network.clone())
                    .or_default()
                    .push(pattern_row(tally, *epsilon, target, *search));
            }
            by_epsilon.entry((*search, *epsilon)).or_default().push(target);
        }

        if !resolved.is_multi_dataset() {
            continue;
        }
        for ((search, epsilon), targets) in by_epsilon {
            let union = union_all(targets)?;
            if let Some(table) = tables.get_mut(&(search, DatasetLabel::All)) {
                table
                    .entry(network.clone())
                    .or_default()
                    .push(pattern_row(tally, epsilon, &union, search));
            }
        }
    }

    Ok(tables)
}
