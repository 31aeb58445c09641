//! netquery Runner
//!
//! Drives a query run end to end and hosts the `netquery` binary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       QueryRunner                        │
//! │   INIT ─► RESOLVE ─► DISPATCH ─► AGGREGATE ─► PERSIST    │
//! │    │         │           │                        │      │
//! │  params   PosetSource  rayon pool           ResultsDir   │
//! │  networks              │                                 │
//! │                  ┌─────▼─────┐                           │
//! │                  │QueryOracle│ CatalogOracle (production)│
//! │                  └───────────┘ SyntheticOracle (tests)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use netquery_run::{QueryRunner, RunnerConfig};
//! use netquery_env::CatalogOracle;
//!
//! let oracle = CatalogOracle::from_file("catalog.json")?;
//! let mut runner = QueryRunner::new(&oracle, &oracle, RunnerConfig::new("."));
//! let report = runner.run("networks.txt".as_ref(), "params.json".as_ref())?;
//! println!("{}", report.results_dir.display());
//! ```

pub mod inputs;
mod oracle;
mod runner;

pub use inputs::read_networks;
pub use oracle::SyntheticOracle;
pub use runner::{QueryRunner, RunPhase, RunReport, RunnerConfig};
