//! Result recorder: results directory, provenance copies and rotated writes.
//!
//! Layout of one run:
//!
//! ```text
//! <base>/netquery_results<stamp>/
//!     inputs<stamp>/    verbatim network and parameter files
//!     queries<stamp>/   one JSON document per result table
//! ```

use crate::aggregate::{AggregateResult, BoundsRow, DatasetLabel, PatternTable, Verdict};
use crate::config::UNION_LABEL;
use crate::error::Result;
use crate::query::SearchKind;
use netquery_env::NetworkSpecifier;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp format of results directories.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Suffix given to the previous generation of an output file.
pub const OLD_SUFFIX: &str = ".old";

/// Current local time in the results-directory format.
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A created results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsDir {
    root: PathBuf,
    queries: PathBuf,
    inputs: PathBuf,
}

impl ResultsDir {
    /// Creates (or reuses) the stamped directory and copies the inputs into it.
    ///
    /// Re-using a stamp re-uses the directory, which is how identical
    /// re-runs land next to their previous results.
    pub fn create(base: impl AsRef<Path>, stamp: &str, inputs: &[&Path]) -> Result<Self> {
        let root = base.as_ref().join(format!("netquery_results{}", stamp));
        let queries = root.join(format!("queries{}", stamp));
        let inputs_dir = root.join(format!("inputs{}", stamp));
        std::fs::create_dir_all(&queries)?;
        std::fs::create_dir_all(&inputs_dir)?;

        for input in inputs {
            if let Some(name) = input.file_name() {
                std::fs::copy(input, inputs_dir.join(name))?;
                debug!("Copied {} for provenance", input.display());
            }
        }

        Ok(Self { root, queries, inputs: inputs_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queries(&self) -> &Path {
        &self.queries
    }

    pub fn inputs(&self) -> &Path {
        &self.inputs
    }
}

/// Writes a document, first renaming any existing file to `<name>.old`.
///
/// The previous `.old` generation is replaced.
pub fn write_rotated(path: &Path, document: &Value) -> Result<()> {
    let text = serde_json::to_string(document)?;
    if path.exists() {
        let mut old = path.as_os_str().to_owned();
        old.push(OLD_SUFFIX);
        std::fs::rename(path, PathBuf::from(old))?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

fn verdict_value(verdict: Verdict) -> Value {
    match verdict {
        Verdict::Exists(hit) => json!(hit),
        Verdict::Count(n) => json!(n),
    }
}

/// `{network: [result, size]}` or `{network: [result, hex, size]}`.
pub fn bounds_document<'a>(rows: impl IntoIterator<Item = (&'a NetworkSpecifier, &'a BoundsRow)>) -> Value {
    let mut doc = Map::new();
    for (network, row) in rows {
        let value = match row.hex_satisfying {
            Some(hex) => json!([verdict_value(row.verdict), hex, row.parameter_count]),
            None => json!([verdict_value(row.verdict), row.parameter_count]),
        };
        doc.insert(network.as_str().to_string(), value);
    }
    Value::Object(doc)
}

/// `{network: [[eps, result, size], ...]}`, with the stable-cycle count
/// before the size when it was tallied.
pub fn pattern_document(table: &PatternTable) -> Value {
    let mut doc = Map::new();
    for (network, rows) in table {
        let entries: Vec<Value> = rows
            .iter()
            .map(|row| match row.stable_cycles {
                Some(cycles) => json!([row.epsilon.0, verdict_value(row.verdict), cycles, row.parameter_count]),
                None => json!([row.epsilon.0, verdict_value(row.verdict), row.parameter_count]),
            })
            .collect();
        doc.insert(network.as_str().to_string(), Value::Array(entries));
    }
    Value::Object(doc)
}

/// `{network: [[eps, [indices]], ...]}` for tables that kept identities.
pub fn param_list_document(table: &PatternTable) -> Value {
    let mut doc = Map::new();
    for (network, rows) in table {
        let entries: Vec<Value> = rows
            .iter()
            .filter_map(|row| {
                row.members
                    .as_ref()
                    .map(|m| json!([row.epsilon.0, m.iter().collect::<Vec<_>>()]))
            })
            .collect();
        doc.insert(network.as_str().to_string(), Value::Array(entries));
    }
    Value::Object(doc)
}

/// File stem of a dataset path: `data/wt.tsv` becomes `wt`.
pub fn dataset_basename(dataset: &str) -> String {
    Path::new(dataset)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| dataset.to_string())
}

fn table_stem(search: SearchKind, label: &DatasetLabel) -> String {
    match label {
        DatasetLabel::Dataset(dataset) => {
            format!("query_results_{}_{}", search, dataset_basename(dataset))
        }
        DatasetLabel::All => format!("query_results_{}_{}", search, UNION_LABEL),
    }
}

/// Writes every document of an aggregate into the queries directory.
///
/// Returns the written paths in write order.
pub fn record(dir: &ResultsDir, result: &AggregateResult) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    match result {
        AggregateResult::Bounds(rows) => {
            let path = dir.queries().join("query_results.json");
            write_rotated(&path, &bounds_document(rows))?;
            written.push(path);
        }
        AggregateResult::Patterns(tables) => {
            for ((search, label), table) in tables {
                let stem = table_stem(*search, label);
                let path = dir.queries().join(format!("{}.json", stem));
                write_rotated(&path, &pattern_document(table))?;
                written.push(path);

                let keeps_members = table.values().flatten().any(|row| row.members.is_some());
                if keeps_members {
                    let path = dir.queries().join(format!("{}_param_list.json", stem));
                    write_rotated(&path, &param_list_document(table))?;
                    written.push(path);
                }
            }
        }
    }
    info!("Wrote {} result document(s) to {}", written.len(), dir.queries().display());
    Ok(written)
}
