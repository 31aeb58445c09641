//! The closed set of query strategies and pattern search kinds.

/// Query identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryKind {
    /// Count/existence of parameters whose stable fixed points satisfy the bounds
    FixedPointMatch,

    /// Count/existence of parameters with at least one stable full cycle
    StableFullCycle,

    /// Count/existence of parameters matching a time-series event ordering
    PatternMatch,
}

impl QueryKind {
    /// Returns a list of all query kinds.
    pub fn all() -> Vec<QueryKind> {
        vec![
            QueryKind::FixedPointMatch,
            QueryKind::StableFullCycle,
            QueryKind::PatternMatch,
        ]
    }

    /// Returns the query name as used in parameter files.
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::FixedPointMatch => "fixed_point_match",
            QueryKind::StableFullCycle => "stable_full_cycle",
            QueryKind::PatternMatch => "pattern_match",
        }
    }

    /// Returns a description of the query.
    pub fn description(&self) -> &'static str {
        match self {
            QueryKind::FixedPointMatch => "Stable fixed points inside included bounds and outside excluded bounds",
            QueryKind::StableFullCycle => "At least one stable full cycle",
            QueryKind::PatternMatch => "Path or cycle match of an extrema poset in the domain graph or stable Morse sets",
        }
    }

    /// Returns true if the query needs event orderings.
    pub fn needs_patterns(&self) -> bool {
        matches!(self, QueryKind::PatternMatch)
    }

    /// Comma-separated list of valid names, for error messages.
    pub fn valid_names() -> String {
        Self::all().iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed_point_match" | "countfpmatch" | "fp" => Ok(QueryKind::FixedPointMatch),
            "stable_full_cycle" | "countstablefc" | "fc" => Ok(QueryKind::StableFullCycle),
            "pattern_match" | "countpatternmatch" | "patternmatch" => Ok(QueryKind::PatternMatch),
            _ => Err(format!(
                "Unknown query: {} (valid queries: {})",
                s,
                Self::valid_names()
            )),
        }
    }
}

/// Where a pattern query looks for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchKind {
    /// Path match anywhere in the domain graph
    Domain,

    /// Path match inside stable full cycles only
    StableFullCycle,

    /// Cycle match anywhere in the domain graph
    DomainCycle,

    /// Cycle match inside stable cyclic Morse sets (`FC` or `XC` leaves)
    StableMorseSetCycle,
}

impl SearchKind {
    /// Returns the search name used in result file names.
    pub fn name(&self) -> &'static str {
        match self {
            SearchKind::Domain => "domain",
            SearchKind::StableFullCycle => "stablefc",
            SearchKind::DomainCycle => "domaincycle",
            SearchKind::StableMorseSetCycle => "stablecycle",
        }
    }

    /// Returns true if the search is restricted to decomposition leaves.
    pub fn needs_decomposition(&self) -> bool {
        matches!(self, SearchKind::StableFullCycle | SearchKind::StableMorseSetCycle)
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
