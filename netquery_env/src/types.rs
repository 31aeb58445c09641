//! Common types shared between the sweep engine and analysis capabilities.

use crate::error::OracleError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque identifier for one network topology and logic assignment.
///
/// Used verbatim as the key of every result document, so equality is
/// exact string equality (no whitespace normalization).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkSpecifier(String);

impl NetworkSpecifier {
    /// Creates a specifier from its textual form.
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    /// Returns the verbatim specification string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NetworkSpecifier {
    fn from(spec: &str) -> Self {
        Self::new(spec)
    }
}

impl From<String> for NetworkSpecifier {
    fn from(spec: String) -> Self {
        Self(spec)
    }
}

impl std::fmt::Display for NetworkSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Specifiers are multi-line; logs get the first line only
        let head = self.0.lines().next().unwrap_or("");
        if self.0.lines().nth(1).is_some() {
            write!(f, "{} ...", head.trim())
        } else {
            write!(f, "{}", head.trim())
        }
    }
}

/// Static facts about a network: its canonical variable ordering and
/// the size of its parameter space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescription {
    /// Variable names in the network's canonical order
    pub variables: Vec<String>,

    /// Number of parameters in the parameter space
    pub parameter_count: usize,
}

impl NetworkDescription {
    /// Position of a variable in the canonical ordering.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    /// Variable names in sorted order (the poset table key).
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names = self.variables.clone();
        names.sort();
        names
    }
}

/// Label of one attracting class of a parameter's decomposition.
///
/// Parsed from the analysis tool's textual labels, e.g. `"FP { 2, 1, 0 }"`
/// or `"FC"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Annotation {
    /// Fixed point with one coordinate per variable (canonical order)
    FixedPoint(Vec<i64>),

    /// Full cycle (oscillation through every variable)
    FullCycle,

    /// Any other label (`XC`, partial cycles, ...)
    Other(String),
}

impl Annotation {
    pub fn is_fixed_point(&self) -> bool {
        matches!(self, Annotation::FixedPoint(_))
    }

    pub fn is_full_cycle(&self) -> bool {
        matches!(self, Annotation::FullCycle)
    }

    /// Full cycles and `XC` labels: the classes a cycle match can realize.
    pub fn is_cycle(&self) -> bool {
        match self {
            Annotation::FullCycle => true,
            Annotation::Other(label) => label.starts_with("XC"),
            Annotation::FixedPoint(_) => false,
        }
    }

    /// Fixed-point coordinates, if this is a fixed point.
    pub fn coordinates(&self) -> Option<&[i64]> {
        match self {
            Annotation::FixedPoint(coords) => Some(coords),
            _ => None,
        }
    }
}

impl FromStr for Annotation {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.starts_with("FP") {
            let coords = label[2..]
                .replace(['{', '}', ','], " ")
                .split_whitespace()
                .map(|tok| tok.parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| OracleError::InvalidAnnotation(label.to_string()))?;
            Ok(Annotation::FixedPoint(coords))
        } else if label == "FC" {
            Ok(Annotation::FullCycle)
        } else if label.is_empty() {
            Err(OracleError::InvalidAnnotation(label.to_string()))
        } else {
            Ok(Annotation::Other(label.to_string()))
        }
    }
}

impl TryFrom<String> for Annotation {
    type Error = OracleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Annotation> for String {
    fn from(annotation: Annotation) -> Self {
        annotation.to_string()
    }
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annotation::FixedPoint(coords) => {
                let parts: Vec<String> = coords.iter().map(|c| c.to_string()).collect();
                write!(f, "FP {{ {} }}", parts.join(", "))
            }
            Annotation::FullCycle => write!(f, "FC"),
            Annotation::Other(label) => write!(f, "{}", label),
        }
    }
}

/// One node of an attractor decomposition poset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorseNode {
    pub annotation: Annotation,

    /// Indices of nodes reachable below this one
    #[serde(default)]
    pub children: Vec<usize>,
}

impl MorseNode {
    /// Leaves (childless nodes) are the stable attracting classes.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Labeled poset of attracting classes for one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub nodes: Vec<MorseNode>,
}

impl Decomposition {
    pub fn new(nodes: Vec<MorseNode>) -> Self {
        Self { nodes }
    }

    /// Iterates over leaf nodes with their poset indices.
    pub fn leaves(&self) -> impl Iterator<Item = (usize, &MorseNode)> {
        self.nodes.iter().enumerate().filter(|(_, node)| node.is_leaf())
    }
}

/// Realized logic of one network node under one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLogic {
    /// Number of in-edges
    pub inputs: u32,

    /// Number of out-edges
    pub outputs: u32,

    /// Hex code of the realized logic function
    pub hex: String,
}

impl NodeLogic {
    pub fn new(inputs: u32, outputs: u32, hex: impl Into<String>) -> Self {
        Self { inputs, outputs, hex: hex.into() }
    }

    /// The (in, out) signature used to key hex constraints.
    pub fn signature(&self) -> (u32, u32) {
        (self.inputs, self.outputs)
    }
}

/// Directed partial order of named extremal events, serialized as
/// `[events, ordering]` where `ordering` lists `(before, after)` pairs
/// of event indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrdering(pub Vec<String>, pub Vec<(usize, usize)>);

impl EventOrdering {
    pub fn new(events: Vec<String>, ordering: Vec<(usize, usize)>) -> Self {
        Self(events, ordering)
    }

    pub fn events(&self) -> &[String] {
        &self.0
    }

    pub fn ordering(&self) -> &[(usize, usize)] {
        &self.1
    }
}

/// Orientation of a time-series file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSeriesLayout {
    /// Times in the first row, one series per row
    Rows,

    /// Times in the first column, one series per column
    Columns,
}

impl TimeSeriesLayout {
    pub fn from_row_flag(is_row_format: bool) -> Self {
        if is_row_format {
            TimeSeriesLayout::Rows
        } else {
            TimeSeriesLayout::Columns
        }
    }
}

/// Where a pattern search is performed within one parameter's state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    /// The whole reachability graph
    Domain,

    /// Only the recurrent class at this decomposition index
    MorseNode(usize),
}
