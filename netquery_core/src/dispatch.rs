//! Sweep dispatcher: partitions the parameter sweep and runs it on a worker pool.
//!
//! # Work granularity
//!
//! | Strategy | Unit of work | Best for |
//! |----------|--------------|----------|
//! | WholeNetwork | one network's full sweep | many small parameter spaces |
//! | PerParameter | one (network, parameter) pair | large spaces, few networks |
//! | Sequential | one network, coordinator thread | artifact-building oracles, tests |
//!
//! Existence sweeps under PerParameter run in index-ordered rounds so that
//! they stop where a single worker would.
//!
//! All strategies produce identical tallies. Every outcome carries the key
//! of the unit that produced it and is reassembled by that key, never by
//! completion order.

use crate::config::{ParameterSelection, QuerySpec};
use crate::error::{QueryError, Result};
use crate::predicates::{
    have_match, hex_constraint_match, stable_cycle_sets, stable_fixed_points, stable_full_cycles,
    HexConstraints, IndexedBounds,
};
use crate::query::{QueryKind, SearchKind};
use crate::resolver::{Epsilon, ResolvedPosets};
use netquery_env::{
    EventOrdering, NetworkDescription, NetworkSpecifier, OracleError, QueryOracle, SearchScope,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

// ============================================================================
// Network plans
// ============================================================================

/// The parameter indices swept for one network, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterRange {
    /// `0..n`
    Full(usize),

    /// Sorted, deduplicated indices
    Listed(Vec<usize>),
}

impl ParameterRange {
    /// Sorts and deduplicates a restriction list, rejecting out-of-range indices.
    pub fn listed(mut indices: Vec<usize>, parameter_count: usize) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= parameter_count) {
            return Err(QueryError::config(format!(
                "Parameter index {} outside parameter space of size {}",
                bad, parameter_count
            )));
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(ParameterRange::Listed(indices))
    }

    pub fn len(&self) -> usize {
        match self {
            ParameterRange::Full(n) => *n,
            ParameterRange::Listed(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        match self {
            ParameterRange::Full(n) => Box::new(0..*n),
            ParameterRange::Listed(indices) => Box::new(indices.iter().copied()),
        }
    }
}

/// A network ready for dispatch: identity, description and swept indices.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkPlan {
    pub network: NetworkSpecifier,
    pub description: NetworkDescription,
    pub parameters: ParameterRange,
}

impl NetworkPlan {
    /// Describes a network through the oracle and applies the parameter selection.
    pub fn describe(
        oracle: &dyn QueryOracle,
        network: NetworkSpecifier,
        selection: &ParameterSelection,
    ) -> Result<Self> {
        let description = oracle.describe(&network)?;
        let count = description.parameter_count;
        let parameters = match selection {
            ParameterSelection::All => ParameterRange::Full(count),
            ParameterSelection::Listed(indices) => ParameterRange::listed(indices.clone(), count)?,
            ParameterSelection::Neighbors => {
                ParameterRange::listed(oracle.neighbor_parameters(&network)?, count)?
            }
        };
        Ok(Self { network, description, parameters })
    }
}

// ============================================================================
// Targets and tallies
// ============================================================================

/// What a parameter can match within one network's sweep.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetKey {
    /// Stable fixed points satisfy the bounds (and hex constraints)
    Bounds,

    /// At least one stable full cycle
    StableCycle,

    /// Event ordering found by a search at one dataset and epsilon
    Pattern {
        search: SearchKind,
        dataset: String,
        epsilon: Epsilon,
    },
}

/// Originating key of a unit of work, used in error reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnitKey {
    pub network: NetworkSpecifier,
    pub parameter: Option<usize>,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.parameter {
            Some(p) => write!(f, "network '{}' parameter {}", self.network, p),
            None => write!(f, "network '{}'", self.network),
        }
    }
}

/// How per-parameter hits are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Short-circuit on the first hit per target
    Exists,

    /// Exhaustive integer tally
    Count,

    /// Exhaustive, keeping the matching parameter indices
    Members,
}

impl Reduction {
    /// Pattern counts keep identities for per-parameter lists and dataset unions.
    pub fn for_spec(spec: &QuerySpec) -> Self {
        match (spec.count, spec.kind) {
            (false, _) => Reduction::Exists,
            (true, QueryKind::PatternMatch) => Reduction::Members,
            (true, _) => Reduction::Count,
        }
    }

    pub fn is_exhaustive(&self) -> bool {
        !matches!(self, Reduction::Exists)
    }
}

/// Reduced result for one target of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetTally {
    Exists(bool),
    Count(usize),
    Members(BTreeSet<usize>),
}

impl TargetTally {
    fn empty(reduction: Reduction) -> Self {
        match reduction {
            Reduction::Exists => TargetTally::Exists(false),
            Reduction::Count => TargetTally::Count(0),
            Reduction::Members => TargetTally::Members(BTreeSet::new()),
        }
    }

    fn record(&mut self, parameter: usize) {
        match self {
            TargetTally::Exists(hit) => *hit = true,
            TargetTally::Count(n) => *n += 1,
            TargetTally::Members(set) => {
                set.insert(parameter);
            }
        }
    }

    /// True if at least one parameter matched.
    pub fn is_hit(&self) -> bool {
        match self {
            TargetTally::Exists(hit) => *hit,
            TargetTally::Count(n) => *n > 0,
            TargetTally::Members(set) => !set.is_empty(),
        }
    }

    /// Matching parameters, if identities were kept.
    pub fn members(&self) -> Option<&BTreeSet<usize>> {
        match self {
            TargetTally::Members(set) => Some(set),
            _ => None,
        }
    }
}

/// Reduced results for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTally {
    pub network: NetworkSpecifier,

    /// Size of the swept parameter space
    pub parameter_count: usize,
    pub targets: BTreeMap<TargetKey, TargetTally>,

    /// Parameters whose realized logic passes the hex constraints
    pub hex_satisfying: Option<usize>,

    /// Parameters with at least one stable full cycle (stablefc counts only)
    pub stable_cycles: Option<usize>,
}

/// Result of evaluating one parameter against the pending targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterOutcome {
    pub parameter: usize,
    pub matched: Vec<TargetKey>,
    pub hex_ok: Option<bool>,
    pub stable_cycle: Option<bool>,
}

// ============================================================================
// Compiled per-network checks
// ============================================================================

#[derive(Debug, Clone)]
struct PatternTarget {
    key: TargetKey,
    search: SearchKind,
    pattern: EventOrdering,
}

#[derive(Debug, Clone)]
enum Check {
    Bounds {
        included: Vec<IndexedBounds>,
        excluded: Vec<IndexedBounds>,
        hex: Option<HexConstraints>,
    },
    StableCycle,
    Patterns {
        targets: Vec<PatternTarget>,
        count_cycles: bool,
    },
}

/// One network with its compiled check: a self-contained unit of work.
#[derive(Debug, Clone)]
pub struct NetworkJob {
    plan: NetworkPlan,
    check: Check,
}

impl NetworkJob {
    /// Compiles the query for one network.
    pub fn compile(
        plan: &NetworkPlan,
        spec: &QuerySpec,
        posets: Option<&ResolvedPosets>,
    ) -> Result<Self> {
        let check = match spec.kind {
            QueryKind::FixedPointMatch => Check::Bounds {
                included: IndexedBounds::compile_all(&spec.included_bounds, &plan.description)?,
                excluded: IndexedBounds::compile_all(&spec.excluded_bounds, &plan.description)?,
                hex: spec.has_hex_constraints().then(|| spec.hex_constraints.clone()),
            },
            QueryKind::StableFullCycle => Check::StableCycle,
            QueryKind::PatternMatch => {
                let resolved = posets.ok_or_else(|| {
                    QueryError::config("Pattern query dispatched without resolved posets")
                })?;
                let by_dataset = resolved.lookup(plan).ok_or_else(|| {
                    QueryError::config(format!("No posets resolved for network '{}'", plan.network))
                })?;
                let mut targets = Vec::new();
                for &search in &spec.searches {
                    for (dataset, entries) in by_dataset {
                        for (epsilon, pattern) in entries {
                            targets.push(PatternTarget {
                                key: TargetKey::Pattern {
                                    search,
                                    dataset: dataset.clone(),
                                    epsilon: *epsilon,
                                },
                                search,
                                pattern: pattern.clone(),
                            });
                        }
                    }
                }
                Check::Patterns {
                    targets,
                    count_cycles: spec.count && spec.searches.contains(&SearchKind::StableFullCycle),
                }
            }
        };
        Ok(Self { plan: plan.clone(), check })
    }

    fn target_keys(&self) -> Vec<TargetKey> {
        match &self.check {
            Check::Bounds { .. } => vec![TargetKey::Bounds],
            Check::StableCycle => vec![TargetKey::StableCycle],
            Check::Patterns { targets, .. } => targets.iter().map(|t| t.key.clone()).collect(),
        }
    }

    /// Work that must run on every parameter even after all targets hit.
    fn has_exhaustive_side_tally(&self) -> bool {
        match &self.check {
            Check::Bounds { hex, .. } => hex.is_some(),
            Check::StableCycle => false,
            Check::Patterns { count_cycles, .. } => *count_cycles,
        }
    }

    fn unit_key(&self, parameter: Option<usize>) -> UnitKey {
        UnitKey { network: self.plan.network.clone(), parameter }
    }
}

/// Evaluates one parameter against the pending targets of a job.
///
/// Targets not in `pending` are skipped, as is any oracle call only they need.
pub fn evaluate_parameter(
    oracle: &dyn QueryOracle,
    job: &NetworkJob,
    parameter: usize,
    pending: &BTreeSet<TargetKey>,
) -> std::result::Result<ParameterOutcome, OracleError> {
    let network = &job.plan.network;
    let mut outcome = ParameterOutcome {
        parameter,
        matched: Vec::new(),
        hex_ok: None,
        stable_cycle: None,
    };

    match &job.check {
        Check::Bounds { included, excluded, hex } => {
            let hex_ok = match hex {
                Some(constraints) => {
                    let ok = hex_constraint_match(&oracle.logic(network, parameter)?, constraints);
                    outcome.hex_ok = Some(ok);
                    ok
                }
                None => true,
            };
            if hex_ok && pending.contains(&TargetKey::Bounds) {
                let decomposition = oracle.decompose(network, parameter)?;
                if have_match(&stable_fixed_points(&decomposition), included, excluded) {
                    outcome.matched.push(TargetKey::Bounds);
                }
            }
        }
        Check::StableCycle => {
            if pending.contains(&TargetKey::StableCycle) {
                let decomposition = oracle.decompose(network, parameter)?;
                if !stable_full_cycles(&decomposition).is_empty() {
                    outcome.matched.push(TargetKey::StableCycle);
                }
            }
        }
        Check::Patterns { targets, count_cycles } => {
            let live: Vec<&PatternTarget> =
                targets.iter().filter(|t| pending.contains(&t.key)).collect();
            let needs_decomposition =
                *count_cycles || live.iter().any(|t| t.search.needs_decomposition());
            let decomposition = if needs_decomposition {
                Some(oracle.decompose(network, parameter)?)
            } else {
                None
            };
            let full_cycles = decomposition.as_ref().map(stable_full_cycles).unwrap_or_default();
            let cycle_sets = decomposition.as_ref().map(stable_cycle_sets).unwrap_or_default();
            if *count_cycles {
                outcome.stable_cycle = Some(!full_cycles.is_empty());
            }

            for target in live {
                let pattern = &target.pattern;
                let hit = match target.search {
                    SearchKind::Domain => {
                        oracle.path_match(network, parameter, SearchScope::Domain, pattern)?
                    }
                    SearchKind::StableFullCycle => any_node(&full_cycles, |node| {
                        oracle.path_match(network, parameter, SearchScope::MorseNode(node), pattern)
                    })?,
                    SearchKind::DomainCycle => {
                        oracle.cycle_match(network, parameter, SearchScope::Domain, pattern)?
                    }
                    SearchKind::StableMorseSetCycle => any_node(&cycle_sets, |node| {
                        oracle.cycle_match(network, parameter, SearchScope::MorseNode(node), pattern)
                    })?,
                };
                if hit {
                    outcome.matched.push(target.key.clone());
                }
            }
        }
    }

    Ok(outcome)
}

/// True if the match succeeds in any of the given Morse nodes, stopping at the first.
fn any_node<F>(nodes: &[usize], mut matches: F) -> std::result::Result<bool, OracleError>
where
    F: FnMut(usize) -> std::result::Result<bool, OracleError>,
{
    for &node in nodes {
        if matches(node)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Accumulates parameter outcomes into a network tally.
///
/// Absorbing is commutative, so outcomes may arrive in any order.
struct TallyBuilder {
    reduction: Reduction,
    targets: BTreeMap<TargetKey, TargetTally>,
    hex_satisfying: Option<usize>,
    stable_cycles: Option<usize>,
}

impl TallyBuilder {
    fn new(job: &NetworkJob, reduction: Reduction) -> Self {
        let targets = job
            .target_keys()
            .into_iter()
            .map(|key| (key, TargetTally::empty(reduction)))
            .collect();
        let (hex_satisfying, stable_cycles) = match &job.check {
            Check::Bounds { hex: Some(_), .. } => (Some(0), None),
            Check::Patterns { count_cycles: true, .. } => (None, Some(0)),
            _ => (None, None),
        };
        Self { reduction, targets, hex_satisfying, stable_cycles }
    }

    /// True once the sweep of this network can stop early.
    fn is_settled(&self, job: &NetworkJob) -> bool {
        !self.reduction.is_exhaustive()
            && !job.has_exhaustive_side_tally()
            && self.targets.values().all(TargetTally::is_hit)
    }

    /// Targets still worth evaluating.
    fn pending(&self) -> BTreeSet<TargetKey> {
        self.targets
            .iter()
            .filter(|(_, tally)| self.reduction.is_exhaustive() || !tally.is_hit())
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn absorb(&mut self, outcome: ParameterOutcome) {
        for key in outcome.matched {
            if let Some(tally) = self.targets.get_mut(&key) {
                tally.record(outcome.parameter);
            }
        }
        if let (Some(n), Some(true)) = (self.hex_satisfying.as_mut(), outcome.hex_ok) {
            *n += 1;
        }
        if let (Some(n), Some(true)) = (self.stable_cycles.as_mut(), outcome.stable_cycle) {
            *n += 1;
        }
    }

    fn finish(self, plan: &NetworkPlan) -> NetworkTally {
        NetworkTally {
            network: plan.network.clone(),
            parameter_count: plan.parameters.len(),
            targets: self.targets,
            hex_satisfying: self.hex_satisfying,
            stable_cycles: self.stable_cycles,
        }
    }
}

/// Sweeps one network's parameters in index order on the calling thread.
///
/// In existence mode a target stops being evaluated at its first hit; the
/// sweep ends early once no target is pending and no side tally remains.
pub fn evaluate_network(
    oracle: &dyn QueryOracle,
    job: &NetworkJob,
    reduction: Reduction,
) -> Result<NetworkTally> {
    let mut builder = TallyBuilder::new(job, reduction);

    for parameter in job.plan.parameters.iter() {
        if builder.is_settled(job) {
            debug!("{}: all targets hit at parameter {}", job.plan.network, parameter);
            break;
        }
        let pending = builder.pending();
        let outcome = evaluate_parameter(oracle, job, parameter, &pending)
            .map_err(|e| QueryError::evaluation(job.unit_key(Some(parameter)), e))?;
        builder.absorb(outcome);
    }

    Ok(builder.finish(&job.plan))
}

// ============================================================================
// Strategy selection
// ============================================================================

/// Parameter units per worker in one round of a per-parameter existence sweep.
const UNITS_PER_WORKER: usize = 16;

/// Work granularity for a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One unit per network, swept by a single worker
    WholeNetwork,

    /// One unit per (network, parameter), reduced by the coordinator
    PerParameter,

    /// Networks one at a time on the coordinator thread
    Sequential,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::WholeNetwork => "whole",
            Strategy::PerParameter => "per-parameter",
            Strategy::Sequential => "sequential",
        }
    }

    pub fn all() -> Vec<Strategy> {
        vec![Strategy::WholeNetwork, Strategy::PerParameter, Strategy::Sequential]
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whole" | "whole-network" => Ok(Strategy::WholeNetwork),
            "per-parameter" | "parameter" => Ok(Strategy::PerParameter),
            "sequential" => Ok(Strategy::Sequential),
            _ => Err(format!(
                "Unknown strategy: {} (valid: whole, per-parameter, sequential)",
                s
            )),
        }
    }
}

/// Capacity thresholds for choosing a strategy.
#[derive(Debug, Clone)]
pub struct StrategyHeuristics {
    /// Parameter-space size at or above which one worker should not sweep alone
    pub large_space: usize,
}

impl Default for StrategyHeuristics {
    fn default() -> Self {
        Self { large_space: 50_000 }
    }
}

impl StrategyHeuristics {
    /// Selects a strategy for a batch.
    ///
    /// 1. Any parameter space of at least `large_space` → PerParameter
    /// 2. Exhaustive sweep with fewer networks than workers → PerParameter
    /// 3. Otherwise → WholeNetwork
    pub fn select(&self, networks: usize, largest_space: usize, workers: usize, exhaustive: bool) -> Strategy {
        if largest_space >= self.large_space || (exhaustive && networks < workers) {
            Strategy::PerParameter
        } else {
            Strategy::WholeNetwork
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Reduced tallies for a whole batch, keyed by network.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub strategy: Strategy,
    pub tallies: BTreeMap<NetworkSpecifier, NetworkTally>,
}

/// Runs a frozen query over a batch of networks.
pub struct Dispatcher<'a> {
    oracle: &'a dyn QueryOracle,
    spec: &'a QuerySpec,
    posets: Option<&'a ResolvedPosets>,
    workers: usize,
    strategy: Option<Strategy>,
    heuristics: StrategyHeuristics,
}

impl<'a> Dispatcher<'a> {
    pub fn new(oracle: &'a dyn QueryOracle, spec: &'a QuerySpec) -> Self {
        Self {
            oracle,
            spec,
            posets: None,
            workers: rayon::current_num_threads(),
            strategy: None,
            heuristics: StrategyHeuristics::default(),
        }
    }

    pub fn with_posets(mut self, posets: &'a ResolvedPosets) -> Self {
        self.posets = Some(posets);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Forces a strategy instead of the heuristic choice.
    pub fn with_strategy(mut self, strategy: Option<Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_heuristics(mut self, heuristics: StrategyHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Compiles the query for every plan.
    ///
    /// Configuration problems that depend on a network (a bound naming a
    /// variable it lacks) surface here, before any worker exists.
    pub fn compile(&self, plans: &[NetworkPlan]) -> Result<Vec<NetworkJob>> {
        plans
            .iter()
            .map(|plan| NetworkJob::compile(plan, self.spec, self.posets))
            .collect()
    }

    /// Compiles and evaluates every plan.
    pub fn run(&self, plans: &[NetworkPlan]) -> Result<SweepOutcome> {
        let jobs = self.compile(plans)?;
        self.run_jobs(&jobs)
    }

    /// Evaluates compiled jobs and blocks until all units complete.
    ///
    /// Any unit failure fails the whole batch; no partial tallies escape.
    pub fn run_jobs(&self, jobs: &[NetworkJob]) -> Result<SweepOutcome> {
        let reduction = Reduction::for_spec(self.spec);
        let largest = jobs.iter().map(|j| j.plan.parameters.len()).max().unwrap_or(0);
        let strategy = self.strategy.unwrap_or_else(|| {
            self.heuristics
                .select(jobs.len(), largest, self.workers, reduction.is_exhaustive())
        });
        info!(
            "Dispatching {} network(s), largest parameter space {}, strategy {}, {} worker(s)",
            jobs.len(),
            largest,
            strategy,
            self.workers
        );

        let tallies = match strategy {
            Strategy::Sequential => self.run_sequential(jobs, reduction)?,
            Strategy::WholeNetwork | Strategy::PerParameter => {
                for job in jobs {
                    self.prepare(job)?;
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.workers)
                    .build()
                    .map_err(|e| QueryError::Pool(e.to_string()))?;
                pool.install(|| match strategy {
                    Strategy::PerParameter if reduction.is_exhaustive() => {
                        self.run_per_parameter(jobs, reduction)
                    }
                    Strategy::PerParameter => self.run_per_parameter_chunked(jobs, reduction),
                    _ => self.run_whole_network(jobs, reduction),
                })?
            }
        };

        Ok(SweepOutcome {
            strategy,
            tallies: tallies.into_iter().map(|t| (t.network.clone(), t)).collect(),
        })
    }

    fn prepare(&self, job: &NetworkJob) -> Result<()> {
        self.oracle
            .prepare(&job.plan.network)
            .map_err(|e| QueryError::evaluation(job.unit_key(None), e))
    }

    fn run_sequential(&self, jobs: &[NetworkJob], reduction: Reduction) -> Result<Vec<NetworkTally>> {
        let mut tallies = Vec::with_capacity(jobs.len());
        for (k, job) in jobs.iter().enumerate() {
            self.prepare(job)?;
            tallies.push(evaluate_network(self.oracle, job, reduction)?);
            info!("Network {} of {} complete", k + 1, jobs.len());
        }
        Ok(tallies)
    }

    fn run_whole_network(&self, jobs: &[NetworkJob], reduction: Reduction) -> Result<Vec<NetworkTally>> {
        let done = AtomicUsize::new(0);
        jobs.par_iter()
            .map(|job| -> Result<NetworkTally> {
                let tally = evaluate_network(self.oracle, job, reduction)?;
                let k = done.fetch_add(1, Ordering::Relaxed) + 1;
                info!("Network {} of {} complete", k, jobs.len());
                Ok(tally)
            })
            .collect()
    }

    fn run_per_parameter(&self, jobs: &[NetworkJob], reduction: Reduction) -> Result<Vec<NetworkTally>> {
        let units: Vec<(usize, usize)> = jobs
            .iter()
            .enumerate()
            .flat_map(|(j, job)| job.plan.parameters.iter().map(move |p| (j, p)))
            .collect();
        debug!("{} per-parameter units", units.len());

        let outcomes = units
            .par_iter()
            .map(|&(j, parameter)| {
                let job = &jobs[j];
                let all: BTreeSet<TargetKey> = job.target_keys().into_iter().collect();
                evaluate_parameter(self.oracle, job, parameter, &all)
                    .map(|outcome| (j, outcome))
                    .map_err(|e| QueryError::evaluation(job.unit_key(Some(parameter)), e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut builders: Vec<TallyBuilder> =
            jobs.iter().map(|job| TallyBuilder::new(job, reduction)).collect();
        for (j, outcome) in outcomes {
            builders[j].absorb(outcome);
        }

        Ok(builders
            .into_iter()
            .zip(jobs)
            .enumerate()
            .map(|(k, (builder, job))| {
                info!("Network {} of {} complete", k + 1, jobs.len());
                builder.finish(&job.plan)
            })
            .collect())
    }

    /// Existence sweeps split per parameter, in index-ordered rounds.
    ///
    /// Each round evaluates the next chunk of every unsettled network in
    /// parallel. Outcomes are then absorbed in index order and a network
    /// stops at the parameter where the sequential sweep would stop, so
    /// a failure past the first hit is never reported.
    fn run_per_parameter_chunked(
        &self,
        jobs: &[NetworkJob],
        reduction: Reduction,
    ) -> Result<Vec<NetworkTally>> {
        let chunk = self.workers * UNITS_PER_WORKER;
        let mut builders: Vec<TallyBuilder> =
            jobs.iter().map(|job| TallyBuilder::new(job, reduction)).collect();
        let mut cursors = vec![0usize; jobs.len()];
        let mut done = vec![false; jobs.len()];
        let mut rounds = 0usize;

        loop {
            let mut pending: Vec<BTreeSet<TargetKey>> = Vec::with_capacity(jobs.len());
            let mut units: Vec<(usize, usize)> = Vec::new();
            for (j, job) in jobs.iter().enumerate() {
                pending.push(builders[j].pending());
                if done[j] {
                    continue;
                }
                if builders[j].is_settled(job) {
                    done[j] = true;
                    continue;
                }
                let before = units.len();
                units.extend(
                    job.plan.parameters.iter().skip(cursors[j]).take(chunk).map(|p| (j, p)),
                );
                cursors[j] += units.len() - before;
                if units.len() == before {
                    done[j] = true;
                }
            }
            if units.is_empty() {
                break;
            }
            rounds += 1;

            let outcomes: Vec<_> = units
                .par_iter()
                .map(|&(j, parameter)| {
                    (j, parameter, evaluate_parameter(self.oracle, &jobs[j], parameter, &pending[j]))
                })
                .collect();

            for (j, parameter, result) in outcomes {
                if done[j] {
                    continue;
                }
                if builders[j].is_settled(&jobs[j]) {
                    debug!("{}: all targets hit at parameter {}", jobs[j].plan.network, parameter);
                    done[j] = true;
                    continue;
                }
                let outcome = result
                    .map_err(|e| QueryError::evaluation(jobs[j].unit_key(Some(parameter)), e))?;
                builders[j].absorb(outcome);
            }
        }
        debug!("Existence sweep finished after {} round(s)", rounds);

        Ok(builders
            .into_iter()
            .zip(jobs)
            .enumerate()
            .map(|(k, (builder, job))| {
                info!("Network {} of {} complete", k + 1, jobs.len());
                builder.finish(&job.plan)
            })
            .collect())
    }
}
