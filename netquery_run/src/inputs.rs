//! Network-file reading.

use netquery_core::{QueryError, Result};
use netquery_env::NetworkSpecifier;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// Parses the contents of a network file.
///
/// - empty (or whitespace only): no networks
/// - starting with `[`: a JSON list of specification strings
/// - anything else: one specification, trailing newlines removed
pub fn parse_networks(text: &str) -> Result<Vec<NetworkSpecifier>> {
    let trimmed = text.trim_start();
    if trimmed.trim_end().is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let specs: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|e| QueryError::config(format!("Malformed network list: {}", e)))?;
        return Ok(dedup(specs.into_iter().map(NetworkSpecifier::from).collect()));
    }
    Ok(vec![NetworkSpecifier::new(text.trim_end_matches(['\n', '\r']))])
}

/// Reads a network file.
pub fn read_networks(path: impl AsRef<Path>) -> Result<Vec<NetworkSpecifier>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        QueryError::config(format!("Cannot read network file {}: {}", path.display(), e))
    })?;
    parse_networks(&text)
}

/// Drops repeated specifiers, keeping first occurrences in order.
fn dedup(networks: Vec<NetworkSpecifier>) -> Vec<NetworkSpecifier> {
    let mut seen = BTreeSet::new();
    networks
        .into_iter()
        .filter(|net| {
            let fresh = seen.insert(net.clone());
            if !fresh {
                warn!("Duplicate network ignored: {}", net);
            }
            fresh
        })
        .collect()
}
