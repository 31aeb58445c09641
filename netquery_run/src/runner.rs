//! Query runner - drives one run from input files to recorded results.
//!
//! ```text
//! INIT -> RESOLVE -> DISPATCH -> AGGREGATE -> PERSIST -> DONE
//! ```
//!
//! Configuration and empty-input failures abort before the results
//! directory exists: the query is compiled for every network during
//! RESOLVE. A dispatch failure aborts before anything is written.

use crate::inputs::read_networks;
use netquery_core::aggregate::{aggregate_bounds, aggregate_patterns};
use netquery_core::record::{self, ResultsDir};
use netquery_core::{
    resolve_posets, AggregateResult, Dispatcher, NetworkPlan, QueryConfig, QueryError, QueryKind,
    QuerySpec, Result, Strategy, StrategyHeuristics,
};
use netquery_env::{NetworkSpecifier, PosetSource, QueryOracle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Init,
    Resolve,
    Dispatch,
    Aggregate,
    Persist,
    Done,
}

impl RunPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Init => "INIT",
            RunPhase::Resolve => "RESOLVE",
            RunPhase::Dispatch => "DISPATCH",
            RunPhase::Aggregate => "AGGREGATE",
            RunPhase::Persist => "PERSIST",
            RunPhase::Done => "DONE",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Runner options.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory under which the stamped results directory is created
    pub results_base: PathBuf,

    /// Worker pool size (None = one per core)
    pub workers: Option<usize>,

    /// Forced strategy (None = heuristic)
    pub strategy: Option<Strategy>,

    pub heuristics: StrategyHeuristics,
}

impl RunnerConfig {
    pub fn new(results_base: impl Into<PathBuf>) -> Self {
        Self {
            results_base: results_base.into(),
            workers: None,
            strategy: None,
            heuristics: StrategyHeuristics::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Sets the parameter-space size treated as too large for one worker.
    pub fn with_large_space(mut self, size: usize) -> Self {
        self.heuristics.large_space = size;
        self
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub query: String,
    pub strategy: String,
    pub networks: usize,
    pub dropped: Vec<NetworkSpecifier>,
    pub results_dir: PathBuf,
    pub written: Vec<PathBuf>,

    #[serde(skip)]
    pub aggregate: Option<AggregateResult>,
}

/// Drives one query run against an oracle and a poset source.
pub struct QueryRunner<'a> {
    oracle: &'a dyn QueryOracle,
    posets: &'a dyn PosetSource,
    config: RunnerConfig,
    phase: RunPhase,
}

impl<'a> QueryRunner<'a> {
    /// Creates a runner in the INIT phase.
    pub fn new(oracle: &'a dyn QueryOracle, posets: &'a dyn PosetSource, config: RunnerConfig) -> Self {
        Self { oracle, posets, config, phase: RunPhase::Init }
    }

    /// Current (or, after a failure, last entered) phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs a query from a network file and a parameter file.
    pub fn run(&mut self, network_file: &Path, params_file: &Path) -> Result<RunReport> {
        self.phase = RunPhase::Init;
        let spec = QueryConfig::from_file(params_file)?.validate()?;
        let networks = read_networks(network_file)?;
        if networks.is_empty() {
            return Err(QueryError::EmptyInput(format!(
                "{} lists no networks",
                network_file.display()
            )));
        }
        info!(
            "Query {} ({}) over {} network(s)",
            spec.kind,
            spec.kind.description(),
            networks.len()
        );

        self.run_spec(&spec, networks, &[network_file, params_file])
    }

    /// Runs a validated query over the given networks.
    ///
    /// `inputs` are copied into the results directory for provenance.
    pub fn run_spec(
        &mut self,
        spec: &QuerySpec,
        networks: Vec<NetworkSpecifier>,
        inputs: &[&Path],
    ) -> Result<RunReport> {
        self.enter(RunPhase::Resolve);
        let plans = networks
            .into_iter()
            .map(|net| NetworkPlan::describe(self.oracle, net, &spec.parameters))
            .collect::<Result<Vec<_>>>()?;

        let resolved = match &spec.patterns {
            Some(source) => Some(resolve_posets(source, &plans, self.posets)?),
            None => None,
        };
        let (plans, dropped) = match &resolved {
            Some(r) => (r.networks.clone(), r.dropped.iter().map(|p| p.network.clone()).collect()),
            None => (plans, Vec::new()),
        };
        if plans.is_empty() {
            return Err(QueryError::EmptyInput(
                "no network has event orderings for its variables".to_string(),
            ));
        }

        let mut dispatcher = Dispatcher::new(self.oracle, spec)
            .with_strategy(self.config.strategy)
            .with_heuristics(self.config.heuristics.clone());
        if let Some(workers) = self.config.workers {
            dispatcher = dispatcher.with_workers(workers);
        }
        if let Some(r) = &resolved {
            dispatcher = dispatcher.with_posets(r);
        }
        let jobs = dispatcher.compile(&plans)?;

        let stamp = spec.datetime.clone().unwrap_or_else(record::timestamp);
        let dir = ResultsDir::create(&self.config.results_base, &stamp, inputs)?;
        info!("Results directory: {}", dir.root().display());

        self.enter(RunPhase::Dispatch);
        let outcome = dispatcher.run_jobs(&jobs)?;

        self.enter(RunPhase::Aggregate);
        let aggregate = match (&resolved, spec.kind) {
            (Some(r), QueryKind::PatternMatch) => {
                AggregateResult::Patterns(aggregate_patterns(&outcome, r, &spec.searches)?)
            }
            _ => AggregateResult::Bounds(aggregate_bounds(&outcome)?),
        };

        self.enter(RunPhase::Persist);
        let written = record::record(&dir, &aggregate)?;

        self.enter(RunPhase::Done);
        Ok(RunReport {
            query: spec.kind.name().to_string(),
            strategy: outcome.strategy.name().to_string(),
            networks: plans.len(),
            dropped,
            results_dir: dir.root().to_path_buf(),
            written,
            aggregate: Some(aggregate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::SyntheticOracle;
    use netquery_core::aggregate::PatternTable;
    use netquery_core::{DatasetLabel, SearchKind, Verdict};
    use std::collections::BTreeMap;
    use netquery_env::CatalogOracle;
    use proptest::prelude::*;
    use serde_json::Value;

    const SCENARIO_CATALOG: &str = r#"{
        "networks": {
            "S": {
                "variables": ["X1", "X2"],
                "parameters": [
                    { "morse": [{ "annotation": "FP { 1, 0 }" }],
                      "logic": [{ "inputs": 1, "outputs": 2, "hex": "C" }] },
                    { "morse": [{ "annotation": "FP { 0, 1 }" }],
                      "logic": [{ "inputs": 1, "outputs": 2, "hex": "C" }] },
                    { "morse": [{ "annotation": "FP { 1, 1 }" }],
                      "logic": [{ "inputs": 1, "outputs": 2, "hex": "8" }] },
                    { "morse": [{ "annotation": "FC" }] }
                ]
            }
        }
    }"#;

    struct Workspace {
        dir: tempfile::TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            Self { dir: tempfile::tempdir().unwrap() }
        }

        fn file(&self, name: &str, text: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        }

        fn config(&self) -> RunnerConfig {
            RunnerConfig::new(self.dir.path().join("results")).with_workers(2)
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn networks_list(specs: &[String]) -> String {
        serde_json::to_string(specs).unwrap()
    }

    #[test]
    fn test_fixed_point_scenario_end_to_end() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "S\n");
        let params = ws.file(
            "params.json",
            r#"{"included_bounds":[{"X1":[1,1]}],"excluded_bounds":[],"count":true,"datetime":"t0"}"#,
        );

        let mut runner = QueryRunner::new(&oracle, &oracle, ws.config());
        let report = runner.run(&nets, &params).unwrap();

        assert_eq!(runner.phase(), RunPhase::Done);
        assert_eq!(report.written.len(), 1);
        assert_eq!(read_json(&report.written[0]), serde_json::json!({"S": [2, 4]}));
        assert!(report.results_dir.join("inputst0").join("params.json").exists());
        assert!(report.results_dir.join("inputst0").join("networks.txt").exists());
    }

    #[test]
    fn test_hex_scenario_end_to_end() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "S");
        let params = ws.file(
            "params.json",
            r#"{"included_bounds":[{"X1":[1,1]}],"excluded_bounds":[],"count":true,
                "hex_constraints":{"(1,2)":["C"]},"datetime":"hex"}"#,
        );

        let report = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap();
        // Parameter 2 matches the bounds but realizes "8"
        assert_eq!(read_json(&report.written[0]), serde_json::json!({"S": [1, 3, 4]}));
    }

    #[test]
    fn test_configuration_error_creates_nothing() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "S");
        let params = ws.file(
            "params.json",
            r#"{"domain":true,"stablefc":false,"count":true,
                "posets":{"X1,X2":[[0.0,[["X1 min"],[]]]]},"epsilons":[0.0]}"#,
        );

        let mut runner = QueryRunner::new(&oracle, &oracle, ws.config());
        let err = runner.run(&nets, &params).unwrap_err();
        assert!(err.is_fail_fast());
        assert_eq!(runner.phase(), RunPhase::Init);
        assert!(!ws.dir.path().join("results").exists());
    }

    #[test]
    fn test_empty_network_file() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "");
        let params = ws.file("params.json", r#"{"query":"stable_full_cycle","count":false}"#);

        let err = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap_err();
        assert!(matches!(err, QueryError::EmptyInput(_)));
        assert!(!ws.dir.path().join("results").exists());
    }

    #[test]
    fn test_rerun_with_same_stamp_rotates() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "S");
        let params = ws.file("params.json", r#"{"query":"stable_full_cycle","count":true,"datetime":"same"}"#);

        let first = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap();
        let before = std::fs::read(&first.written[0]).unwrap();
        let second = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap();

        assert_eq!(first.written, second.written);
        assert_eq!(std::fs::read(&second.written[0]).unwrap(), before);
        let mut old = second.written[0].clone().into_os_string();
        old.push(".old");
        assert_eq!(std::fs::read(PathBuf::from(old)).unwrap(), before);
    }

    #[test]
    fn test_worker_failure_persists_nothing() {
        let ws = Workspace::new();
        let net = NetworkSpecifier::new("A : (B)\nB : (A)");
        let oracle = SyntheticOracle::new(9).with_parameter_range(8, 8).with_failure(&net, 5);
        let nets = ws.file("networks.txt", &networks_list(&[net.as_str().to_string()]));
        let params = ws.file("params.json", r#"{"query":"stable_full_cycle","count":true,"datetime":"boom"}"#);

        for strategy in Strategy::all() {
            let mut runner = QueryRunner::new(&oracle, &oracle, ws.config().with_strategy(strategy));
            let err = runner.run(&nets, &params).unwrap_err();
            assert!(matches!(err, QueryError::PredicateEvaluation { .. }));
            assert_eq!(runner.phase(), RunPhase::Dispatch);
        }
        let queries = ws.dir.path().join("results/netquery_resultsboom/queriesboom");
        assert_eq!(std::fs::read_dir(queries).unwrap().count(), 0);
    }

    #[test]
    fn test_multi_dataset_pattern_files() {
        let ws = Workspace::new();
        let oracle = SyntheticOracle::new(21)
            .with_match_rate(0.5)
            .with_dataset("data/wt.tsv", ["A", "B", "C"])
            .with_dataset("data/ko.csv", ["A", "B"]);
        let specs = vec!["A : (B)\nB : (A)".to_string(), "A : (C)\nC : (A)\nB : (C)".to_string()];
        let nets = ws.file("networks.txt", &networks_list(&specs));
        let params = ws.file(
            "params.json",
            r#"{"domain":true,"stablefc":true,"count":true,"datetime":"multi",
                "timeseriesfname":["data/wt.tsv","data/ko.csv"],"tsfile_is_row_format":true,
                "epsilons":[0.0,0.05]}"#,
        );

        let report = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap();
        let names: Vec<String> = report
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        for search in ["domain", "stablefc"] {
            for label in ["wt", "ko", "all"] {
                assert!(names.contains(&format!("query_results_{}_{}.json", search, label)));
                assert!(names.contains(&format!("query_results_{}_{}_param_list.json", search, label)));
            }
        }

        // The three-variable network has no time series in ko
        let dir = report.written[0].parent().unwrap();
        let ko = read_json(&dir.join("query_results_domain_ko.json"));
        assert_eq!(ko.as_object().unwrap().len(), 1);
        let all = read_json(&dir.join("query_results_stablefc_all.json"));
        assert_eq!(all.as_object().unwrap().len(), 2);
        // [eps, result, numStableCycles, size]
        let row = &all[specs[0].as_str()][0];
        assert_eq!(row.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_literal_posets_single_dataset() {
        let ws = Workspace::new();
        let oracle = SyntheticOracle::new(4).with_match_rate(1.0);
        let nets = ws.file("networks.txt", "A : (B)\nB : (A)");
        let params = ws.file(
            "params.json",
            r#"{"domain":true,"stablefc":false,"count":false,"datetime":"lit",
                "posets":{"B,A":[[0.1,[["A min","B max"],[[0,1]]]]]}}"#,
        );

        let report = QueryRunner::new(&oracle, &oracle, ws.config()).run(&nets, &params).unwrap();
        assert_eq!(report.written.len(), 1);
        assert!(report.written[0].ends_with("query_results_domain_no_time_series_file.json"));
        let doc = read_json(&report.written[0]);
        let row = &doc["A : (B)\nB : (A)"][0];
        assert_eq!(row[0], serde_json::json!(0.1));
        assert_eq!(row[1], serde_json::json!(true));
    }

    #[test]
    fn test_unknown_bound_variable_creates_nothing() {
        let ws = Workspace::new();
        let oracle = CatalogOracle::from_json(SCENARIO_CATALOG).unwrap();
        let nets = ws.file("networks.txt", "S");
        let params = ws.file(
            "params.json",
            r#"{"included_bounds":[{"X9":[1,1]}],"excluded_bounds":[],"count":true}"#,
        );

        let mut runner = QueryRunner::new(&oracle, &oracle, ws.config());
        let err = runner.run(&nets, &params).unwrap_err();
        assert!(err.is_fail_fast());
        assert!(err.to_string().contains("X9"));
        assert_eq!(runner.phase(), RunPhase::Resolve);
        assert!(!ws.dir.path().join("results").exists());
    }

    #[test]
    fn test_existence_ignores_failure_after_first_hit() {
        let net = NetworkSpecifier::new("A : (B)\nB : (A)");
        let spec = QueryConfig::from_json(r#"{"query":"stable_full_cycle","count":false}"#)
            .unwrap()
            .validate()
            .unwrap();

        for seed in 0..16 {
            let healthy = SyntheticOracle::new(seed).with_parameter_range(8, 8);
            let hit_before_failure = (0..7).any(|p| {
                let decomposition = healthy.decompose(&net, p).unwrap();
                !netquery_core::predicates::stable_full_cycles(&decomposition).is_empty()
            });
            let oracle = healthy.with_failure(&net, 7);

            for strategy in Strategy::all() {
                let ws = Workspace::new();
                let mut runner = QueryRunner::new(&oracle, &oracle, ws.config().with_strategy(strategy));
                let result = runner.run_spec(&spec, vec![net.clone()], &[]);
                match (hit_before_failure, result) {
                    (true, Ok(report)) => match report.aggregate {
                        Some(AggregateResult::Bounds(rows)) => {
                            assert_eq!(rows[&net].verdict, Verdict::Exists(true));
                        }
                        other => panic!("unexpected aggregate {:?}", other),
                    },
                    (false, Err(err)) => {
                        assert!(matches!(err, QueryError::PredicateEvaluation { .. }));
                    }
                    (expected_hit, other) => {
                        panic!("seed {} under {}: hit={} but got {:?}", seed, strategy, expected_hit, other)
                    }
                }
            }
        }
    }

    fn network_specs(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("A : (B)\nB : (A)(~C)\nC : (A{})", i))
            .collect()
    }

    fn bounds_verdicts(
        oracle: &SyntheticOracle,
        specs: &[String],
        count: bool,
        strategy: Strategy,
    ) -> Vec<(NetworkSpecifier, Verdict)> {
        let spec = QueryConfig::from_json(&format!(
            r#"{{"included_bounds":[{{"A":[1,2]}}],"excluded_bounds":[{{"C":[0,0]}}],"count":{}}}"#,
            count
        ))
        .unwrap()
        .validate()
        .unwrap();
        let ws = Workspace::new();
        let mut runner = QueryRunner::new(oracle, oracle, ws.config().with_strategy(strategy));
        let networks = specs.iter().map(|s| NetworkSpecifier::new(s.as_str())).collect();
        let report = runner.run_spec(&spec, networks, &[]).unwrap();
        match report.aggregate {
            Some(AggregateResult::Bounds(rows)) => {
                rows.into_iter().map(|(net, row)| (net, row.verdict)).collect()
            }
            other => panic!("unexpected aggregate {:?}", other),
        }
    }

    const PATTERN_SEARCHES: &str = r#""domain":true,"stablefc":true,"domaincycle":true,"stablecycle":true,
        "timeseriesfname":["data/wt.tsv","data/ko.tsv"],"tsfile_is_row_format":true,
        "epsilons":[0.0,0.05]"#;

    fn pattern_oracle(seed: u64) -> SyntheticOracle {
        SyntheticOracle::new(seed)
            .with_match_rate(0.3)
            .with_dataset("data/wt.tsv", ["A", "B", "C"])
            .with_dataset("data/ko.tsv", ["A", "B"])
    }

    fn pattern_specs() -> Vec<String> {
        vec![
            "A : (B)\nB : (A)".to_string(),
            "A : (B)\nB : (A)(~C)\nC : (A)".to_string(),
            "A : (~B)\nB : (A)".to_string(),
        ]
    }

    fn pattern_aggregate(
        oracle: &SyntheticOracle,
        specs: &[String],
        count: bool,
        strategy: Strategy,
    ) -> Result<AggregateResult> {
        let spec = QueryConfig::from_json(&format!(r#"{{{},"count":{}}}"#, PATTERN_SEARCHES, count))
            .unwrap()
            .validate()
            .unwrap();
        let ws = Workspace::new();
        let mut runner = QueryRunner::new(oracle, oracle, ws.config().with_strategy(strategy));
        let networks = specs.iter().map(|s| NetworkSpecifier::new(s.as_str())).collect();
        let report = runner.run_spec(&spec, networks, &[])?;
        Ok(report.aggregate.unwrap())
    }

    fn pattern_tables(
        aggregate: AggregateResult,
    ) -> BTreeMap<(SearchKind, DatasetLabel), PatternTable> {
        match aggregate {
            AggregateResult::Patterns(tables) => tables,
            other => panic!("unexpected aggregate {:?}", other),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_strategies_agree(seed in any::<u64>(), count in any::<bool>()) {
            let oracle = SyntheticOracle::new(seed);
            let specs = network_specs(3);
            let reference = bounds_verdicts(&oracle, &specs, count, Strategy::Sequential);
            for strategy in [Strategy::WholeNetwork, Strategy::PerParameter] {
                prop_assert_eq!(&bounds_verdicts(&oracle, &specs, count, strategy), &reference);
            }
        }

        #[test]
        fn prop_existence_matches_positive_count(seed in any::<u64>()) {
            let oracle = SyntheticOracle::new(seed);
            let specs = network_specs(3);
            let exists = bounds_verdicts(&oracle, &specs, false, Strategy::WholeNetwork);
            let counts = bounds_verdicts(&oracle, &specs, true, Strategy::PerParameter);
            for ((net_a, e), (net_b, c)) in exists.iter().zip(&counts) {
                prop_assert_eq!(net_a, net_b);
                match (e, c) {
                    (Verdict::Exists(hit), Verdict::Count(n)) => prop_assert_eq!(*hit, *n > 0),
                    other => prop_assert!(false, "unexpected verdicts {:?}", other),
                }
            }
        }

        #[test]
        fn prop_network_order_irrelevant(seed in any::<u64>(), rotate in 0usize..4) {
            let oracle = SyntheticOracle::new(seed);
            let specs = network_specs(4);
            let mut permuted = specs.clone();
            permuted.rotate_left(rotate);
            permuted.reverse();
            prop_assert_eq!(
                bounds_verdicts(&oracle, &specs, true, Strategy::WholeNetwork),
                bounds_verdicts(&oracle, &permuted, true, Strategy::WholeNetwork)
            );
        }

        #[test]
        fn prop_pattern_strategies_agree(seed in any::<u64>(), count in any::<bool>()) {
            let oracle = pattern_oracle(seed);
            let specs = pattern_specs();
            let reference = pattern_aggregate(&oracle, &specs, count, Strategy::Sequential).unwrap();
            for strategy in [Strategy::WholeNetwork, Strategy::PerParameter] {
                prop_assert_eq!(
                    &pattern_aggregate(&oracle, &specs, count, strategy).unwrap(),
                    &reference
                );
            }
        }

        #[test]
        fn prop_pattern_existence_matches_positive_count(seed in any::<u64>()) {
            let oracle = pattern_oracle(seed);
            let specs = pattern_specs();
            let exists = pattern_tables(
                pattern_aggregate(&oracle, &specs, false, Strategy::PerParameter).unwrap(),
            );
            let counts = pattern_tables(
                pattern_aggregate(&oracle, &specs, true, Strategy::WholeNetwork).unwrap(),
            );
            prop_assert_eq!(exists.keys().collect::<Vec<_>>(), counts.keys().collect::<Vec<_>>());
            // Every search and dataset column, the union column included
            for (column, table) in &counts {
                let other = &exists[column];
                prop_assert_eq!(table.keys().collect::<Vec<_>>(), other.keys().collect::<Vec<_>>());
                for (network, rows) in table {
                    prop_assert_eq!(rows.len(), other[network].len());
                    for (c, e) in rows.iter().zip(&other[network]) {
                        prop_assert_eq!(c.epsilon, e.epsilon);
                        prop_assert_eq!(c.parameter_count, e.parameter_count);
                        match (e.verdict, c.verdict) {
                            (Verdict::Exists(hit), Verdict::Count(n)) => prop_assert_eq!(hit, n > 0),
                            other => prop_assert!(false, "unexpected verdicts {:?}", other),
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_pattern_network_order_irrelevant(
            seed in any::<u64>(),
            count in any::<bool>(),
            rotate in 0usize..3,
        ) {
            let oracle = pattern_oracle(seed);
            let specs = pattern_specs();
            let mut permuted = specs.clone();
            permuted.rotate_left(rotate);
            permuted.reverse();
            prop_assert_eq!(
                pattern_aggregate(&oracle, &specs, count, Strategy::PerParameter).unwrap(),
                pattern_aggregate(&oracle, &permuted, count, Strategy::PerParameter).unwrap()
            );
        }

        #[test]
        fn prop_pattern_existence_failure_agrees(seed in any::<u64>(), failing in 0usize..8) {
            let specs = pattern_specs();
            let net = NetworkSpecifier::new(specs[0].as_str());
            let oracle = pattern_oracle(seed)
                .with_parameter_range(8, 8)
                .with_failure(&net, failing);
            let reference = pattern_aggregate(&oracle, &specs, false, Strategy::Sequential);
            for strategy in [Strategy::WholeNetwork, Strategy::PerParameter] {
                match (&reference, pattern_aggregate(&oracle, &specs, false, strategy)) {
                    (Ok(expected), Ok(actual)) => prop_assert_eq!(expected, &actual),
                    (Err(a), Err(b)) => {
                        prop_assert!(matches!(a, QueryError::PredicateEvaluation { .. }), "expected PredicateEvaluation, got {:?}", a);
                        prop_assert!(matches!(b, QueryError::PredicateEvaluation { .. }), "expected PredicateEvaluation, got {:?}", b);
                    }
                    (a, b) => prop_assert!(false, "{:?} disagrees with {:?} under {}", a, b, strategy),
                }
            }
        }
    }
}
