//! Parameter-file configuration and its validation into a frozen `QuerySpec`.
//!
//! The parameter file is read once into a [`QueryConfig`] in which every key
//! is optional. [`QueryConfig::validate`] checks required and mutually
//! exclusive keys and returns a [`QuerySpec`]; nothing downstream ever sees
//! the raw configuration.

use crate::error::{QueryError, Result};
use crate::predicates::{HexConstraints, VariableBoundSet};
use crate::query::{QueryKind, SearchKind};
use crate::record::dataset_basename;
use netquery_env::{EventOrdering, TimeSeriesLayout};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Largest meaningful noise level: all curve shape is lost at 0.5.
pub const MAX_EPSILON: f64 = 0.5;

/// Dataset label of the cross-dataset union tables.
pub const UNION_LABEL: &str = "all";

/// `timeseriesfname` accepts a single path or a list of paths.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeSeriesFiles {
    One(String),
    Many(Vec<String>),
}

impl TimeSeriesFiles {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TimeSeriesFiles::One(path) => vec![path],
            TimeSeriesFiles::Many(paths) => paths,
        }
    }
}

/// Raw parameter file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryConfig {
    /// Query strategy name; inferred from the other keys when absent
    pub query: Option<String>,
    pub included_bounds: Option<Vec<VariableBoundSet>>,
    pub excluded_bounds: Option<Vec<VariableBoundSet>>,
    /// `"(in,out)"` to allowed hex codes
    pub hex_constraints: Option<BTreeMap<String, Vec<String>>>,
    pub count: Option<bool>,
    pub domain: Option<bool>,
    pub stablefc: Option<bool>,
    pub domaincycle: Option<bool>,
    pub stablecycle: Option<bool>,
    pub neighbors: Option<bool>,
    pub datetime: Option<String>,
    pub parameter_list: Option<Vec<usize>>,
    /// Comma-joined variable names to `[[epsilon, [events, ordering]], ...]`
    pub posets: Option<BTreeMap<String, Vec<(f64, EventOrdering)>>>,
    pub timeseriesfname: Option<TimeSeriesFiles>,
    pub tsfile_is_row_format: Option<bool>,
    pub epsilons: Option<Vec<f64>>,
}

/// Which parameter indices of each network are swept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSelection {
    /// The whole parameter space
    All,

    /// The same explicit index list for every network
    Listed(Vec<usize>),

    /// Per-network lists supplied by the oracle's neighbor expansion
    Neighbors,
}

/// Literal poset table keyed by sorted variable names.
pub type LiteralPosets = BTreeMap<Vec<String>, Vec<(f64, EventOrdering)>>;

/// Where the target event orderings come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSource {
    /// Posets given verbatim in the parameter file
    Literal(LiteralPosets),

    /// Posets extracted from time-series files at each epsilon
    TimeSeries {
        files: Vec<String>,
        layout: TimeSeriesLayout,
        epsilons: Vec<f64>,
    },
}

/// Frozen, validated query configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub kind: QueryKind,
    pub included_bounds: Vec<VariableBoundSet>,
    pub excluded_bounds: Vec<VariableBoundSet>,
    pub hex_constraints: HexConstraints,

    /// Exhaustive tally (true) or short-circuit existence (false)
    pub count: bool,

    /// Pattern searches to run, in output order
    pub searches: Vec<SearchKind>,
    pub parameters: ParameterSelection,

    /// Caller-supplied timestamp for the results directory
    pub datetime: Option<String>,
    pub patterns: Option<PatternSource>,
}

impl QuerySpec {
    /// Bound queries carrying hex constraints report an extra tally.
    pub fn has_hex_constraints(&self) -> bool {
        self.kind == QueryKind::FixedPointMatch && !self.hex_constraints.is_empty()
    }
}

impl QueryConfig {
    /// Parses a parameter file's JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| QueryError::config(format!("Malformed parameter file: {}", e)))
    }

    /// Reads and parses a parameter file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            QueryError::config(format!("Cannot read parameter file {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    fn timeseries_key_count(&self) -> usize {
        [
            self.timeseriesfname.is_some(),
            self.tsfile_is_row_format.is_some(),
            self.epsilons.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }

    fn has_pattern_keys(&self) -> bool {
        self.posets.is_some() || self.timeseries_key_count() > 0
    }

    fn infer_kind(&self) -> Result<QueryKind> {
        if let Some(name) = &self.query {
            return name.parse::<QueryKind>().map_err(QueryError::Configuration);
        }
        if self.has_pattern_keys() {
            Ok(QueryKind::PatternMatch)
        } else if self.included_bounds.is_some() || self.excluded_bounds.is_some() {
            Ok(QueryKind::FixedPointMatch)
        } else {
            Err(QueryError::config(format!(
                "Cannot infer the query from the parameter file; set 'query' to one of: {}",
                QueryKind::valid_names()
            )))
        }
    }

    /// Checks required and mutually exclusive keys and freezes the spec.
    pub fn validate(&self) -> Result<QuerySpec> {
        let ts_keys = self.timeseries_key_count();
        if self.posets.is_some() && ts_keys > 0 {
            return Err(QueryError::config(
                "Only one of 'posets' or the three keys 'timeseriesfname', 'tsfile_is_row_format' and 'epsilons' may be specified in the parameter file.",
            ));
        }
        if ts_keys > 0 && ts_keys < 3 {
            return Err(QueryError::config(
                "All of the three keys 'timeseriesfname', 'tsfile_is_row_format' and 'epsilons' must be specified in the parameter file.",
            ));
        }

        let kind = self.infer_kind()?;
        let count = match (self.count, kind) {
            (Some(count), _) => count,
            (None, QueryKind::StableFullCycle) => true,
            (None, _) => {
                return Err(QueryError::config(
                    "The parameter file must contain the key 'count'.",
                ))
            }
        };

        let parameters = match (self.neighbors.unwrap_or(false), &self.parameter_list) {
            (true, Some(_)) => {
                return Err(QueryError::config(
                    "'neighbors' and 'parameter_list' are mutually exclusive.",
                ))
            }
            (true, None) => ParameterSelection::Neighbors,
            (false, Some(list)) => ParameterSelection::Listed(list.clone()),
            (false, None) => ParameterSelection::All,
        };

        if !kind.needs_patterns() && self.has_pattern_keys() {
            return Err(QueryError::config(format!(
                "Poset keys are only valid for the '{}' query.",
                QueryKind::PatternMatch
            )));
        }
        if kind != QueryKind::FixedPointMatch && self.hex_constraints.is_some() {
            return Err(QueryError::config(format!(
                "'hex_constraints' is only valid for the '{}' query.",
                QueryKind::FixedPointMatch
            )));
        }

        let mut spec = QuerySpec {
            kind,
            included_bounds: Vec::new(),
            excluded_bounds: Vec::new(),
            hex_constraints: HexConstraints::new(),
            count,
            searches: Vec::new(),
            parameters,
            datetime: self.datetime.clone(),
            patterns: None,
        };

        match kind {
            QueryKind::FixedPointMatch => {
                let (Some(included), Some(excluded)) = (&self.included_bounds, &self.excluded_bounds)
                else {
                    return Err(QueryError::config(
                        "The parameter file must contain keys 'included_bounds', 'excluded_bounds', and 'count'.",
                    ));
                };
                check_bounds(included)?;
                check_bounds(excluded)?;
                spec.included_bounds = included.clone();
                spec.excluded_bounds = excluded.clone();
                if let Some(raw) = &self.hex_constraints {
                    spec.hex_constraints = parse_hex_constraints(raw)?;
                }
            }
            QueryKind::StableFullCycle => {}
            QueryKind::PatternMatch => {
                let (Some(domain), Some(stablefc)) = (self.domain, self.stablefc) else {
                    return Err(QueryError::config(
                        "All of the three keys 'domain', 'stablefc' and 'count' must be specified in the parameter file.",
                    ));
                };
                if domain {
                    spec.searches.push(SearchKind::Domain);
                }
                if stablefc {
                    spec.searches.push(SearchKind::StableFullCycle);
                }
                if self.domaincycle.unwrap_or(false) {
                    spec.searches.push(SearchKind::DomainCycle);
                }
                if self.stablecycle.unwrap_or(false) {
                    spec.searches.push(SearchKind::StableMorseSetCycle);
                }
                if spec.searches.is_empty() {
                    return Err(QueryError::config(
                        "At least one of 'domain', 'stablefc', 'domaincycle' or 'stablecycle' must be true.",
                    ));
                }
                spec.patterns = Some(self.pattern_source()?);
            }
        }

        Ok(spec)
    }

    fn pattern_source(&self) -> Result<PatternSource> {
        if let Some(raw) = &self.posets {
            return Ok(PatternSource::Literal(parse_literal_posets(raw)?));
        }
        match (&self.timeseriesfname, self.tsfile_is_row_format, &self.epsilons) {
            (Some(files), Some(row_format), Some(epsilons)) => {
                let files = files.clone().into_vec();
                if files.is_empty() {
                    return Err(QueryError::config("'timeseriesfname' lists no files."));
                }
                if epsilons.is_empty() {
                    return Err(QueryError::config("'epsilons' must list at least one value."));
                }
                check_dataset_stems(&files)?;
                let mut epsilons = epsilons.clone();
                epsilons.iter().try_for_each(|&e| check_epsilon(e))?;
                epsilons.sort_by(f64::total_cmp);
                epsilons.dedup();
                Ok(PatternSource::TimeSeries {
                    files,
                    layout: TimeSeriesLayout::from_row_flag(row_format),
                    epsilons,
                })
            }
            _ => Err(QueryError::config(
                "Either 'posets' or the three keys 'timeseriesfname', 'tsfile_is_row_format' and 'epsilons' must be specified in the parameter file.",
            )),
        }
    }
}

/// Result files are named by dataset stem, so stems must be distinct and
/// must not collide with the union label.
fn check_dataset_stems(files: &[String]) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for file in files {
        let stem = dataset_basename(file);
        if stem == UNION_LABEL {
            return Err(QueryError::config(format!(
                "Time series file '{}' has the reserved name '{}'.",
                file, UNION_LABEL
            )));
        }
        if let Some(previous) = seen.insert(stem.clone(), file) {
            return Err(QueryError::config(format!(
                "Time series files '{}' and '{}' share the name '{}'; result files would collide.",
                previous, file, stem
            )));
        }
    }
    Ok(())
}

fn check_bounds(list: &[VariableBoundSet]) -> Result<()> {
    for bounds in list {
        for (name, &(lo, hi)) in bounds {
            if lo > hi {
                return Err(QueryError::config(format!(
                    "Empty bound for '{}': [{}, {}]",
                    name, lo, hi
                )));
            }
        }
    }
    Ok(())
}

fn check_epsilon(epsilon: f64) -> Result<()> {
    if (0.0..=MAX_EPSILON).contains(&epsilon) {
        Ok(())
    } else {
        Err(QueryError::config(format!(
            "Epsilon {} outside [0, {}]",
            epsilon, MAX_EPSILON
        )))
    }
}

/// Parses a hex-constraint key of the form `"(in,out)"`.
pub fn parse_hex_key(key: &str) -> Result<(u32, u32)> {
    let malformed = || QueryError::config(format!("Malformed hex constraint key '{}', expected \"(in,out)\"", key));
    let inner = key
        .trim()
        .strip_prefix('(')
        .and_then(|k| k.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(inputs)), Some(Ok(outputs)), None) => Ok((inputs, outputs)),
        _ => Err(malformed()),
    }
}

fn parse_hex_constraints(raw: &BTreeMap<String, Vec<String>>) -> Result<HexConstraints> {
    raw.iter().try_fold(HexConstraints::new(), |constraints, (key, codes)| {
        Ok(constraints.allow(parse_hex_key(key)?, codes))
    })
}

fn parse_literal_posets(raw: &BTreeMap<String, Vec<(f64, EventOrdering)>>) -> Result<LiteralPosets> {
    let mut table = LiteralPosets::new();
    for (key, entries) in raw {
        let mut names: Vec<String> = key
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(QueryError::config(format!("Poset key '{}' names no variables", key)));
        }
        names.sort();
        if entries.is_empty() {
            return Err(QueryError::config(format!("Poset key '{}' lists no posets", key)));
        }
        entries.iter().try_for_each(|(e, _)| check_epsilon(*e))?;
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].0.total_cmp(&w[1].0).is_eq()) {
            return Err(QueryError::config(format!(
                "Poset key '{}' lists epsilon {} more than once",
                key, pair[0].0
            )));
        }
        if table.insert(names, sorted).is_some() {
            return Err(QueryError::config(format!(
                "Poset key '{}' duplicates another key's variable set",
                key
            )));
        }
    }
    Ok(table)
}
