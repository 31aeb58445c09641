//! netquery Core - Parallel Query Sweeps over Network Parameter Spaces
//!
//! This library answers one question per parameter of every network in a
//! batch and reduces the answers into per-network results:
//! 1. **Predicates**: bound matching on stable fixed points, hex-constraint
//!    matching on realized logic
//! 2. **Resolution**: per-network event-ordering targets from time series or
//!    literal posets
//! 3. **Dispatch**: short-circuit or exhaustive sweeps on a rayon worker pool,
//!    reassembled by unit key
//! 4. **Aggregation and recording**: cross-dataset unions and rotated JSON
//!    documents

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod predicates;
pub mod query;
pub mod record;
pub mod resolver;

// Re-export key types for convenience
pub use aggregate::{union_all, AggregateResult, DatasetLabel, Verdict};
pub use config::{ParameterSelection, PatternSource, QueryConfig, QuerySpec};
pub use dispatch::{Dispatcher, NetworkPlan, Strategy, StrategyHeuristics, SweepOutcome};
pub use error::{QueryError, Result};
pub use query::{QueryKind, SearchKind};
pub use record::ResultsDir;
pub use resolver::{resolve_posets, ResolvedPosets, LITERAL_DATASET};
