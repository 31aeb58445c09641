//! Poset source abstraction: event orderings extracted from time series.

use crate::error::OracleError;
use crate::types::{EventOrdering, TimeSeriesLayout};
use std::collections::BTreeSet;

/// Supplies posets of extrema for a fixed variable-name set.
///
/// A dataset is identified by the path of its time-series file. Extracting
/// extrema and building the partial order is the implementation's job.
pub trait PosetSource: Send + Sync {
    /// Variable names for which the dataset carries a time series.
    fn variable_names(
        &self,
        dataset: &str,
        layout: TimeSeriesLayout,
    ) -> Result<BTreeSet<String>, OracleError>;

    /// One event ordering per requested epsilon, in the order requested.
    ///
    /// # Arguments
    /// * `names` - Sorted variable names, all present in the dataset
    /// * `epsilons` - Noise tolerances in `[0, 0.5]`
    fn eps_posets(
        &self,
        dataset: &str,
        layout: TimeSeriesLayout,
        names: &[String],
        epsilons: &[f64],
    ) -> Result<Vec<(f64, EventOrdering)>, OracleError>;
}
