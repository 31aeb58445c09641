//! netquery CLI
//!
//! Run a query sweep over a list of networks and record the results.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use netquery_core::Strategy;
use netquery_env::CatalogOracle;
use netquery_run::{QueryRunner, RunnerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// netquery parameter-sweep CLI
#[derive(Parser, Debug)]
#[command(name = "netquery")]
#[command(about = "Sweep network parameter spaces with fixed-point, stable-cycle and pattern queries", long_about = None)]
struct Args {
    /// File holding one network specification or a JSON list of them
    network_file: Option<PathBuf>,

    /// JSON parameter file describing the query
    params_file: Option<PathBuf>,

    /// Directory in which the stamped results directory is created
    resultsdir: Option<PathBuf>,

    /// Analysis catalog exported by the network-analysis tool
    #[arg(short, long, env = "NETQUERY_CATALOG")]
    catalog: Option<PathBuf>,

    /// Worker pool size (default: one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Work granularity (auto, whole, per-parameter, sequential)
    #[arg(short, long, default_value = "auto")]
    strategy: String,

    /// Parameter-space size above which sweeps are split per parameter
    #[arg(long)]
    large_space: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON run summary on stdout
    #[arg(long)]
    json: bool,
}

fn usage_exit(message: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("{}", Args::command().render_usage());
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the results path
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let (Some(network_file), Some(params_file)) = (&args.network_file, &args.params_file) else {
        usage_exit("a network file and a parameter file are required");
    };
    let Some(catalog) = &args.catalog else {
        usage_exit("an analysis catalog is required (--catalog or NETQUERY_CATALOG)");
    };

    let mut config = RunnerConfig::new(args.resultsdir.clone().unwrap_or_else(|| PathBuf::from(".")));
    if args.strategy != "auto" {
        let strategy: Strategy = args.strategy.parse().unwrap_or_else(|e: String| usage_exit(&e));
        config = config.with_strategy(strategy);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(size) = args.large_space {
        config = config.with_large_space(size);
    }

    let oracle = CatalogOracle::from_file(catalog)
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
    info!("netquery v{}", env!("CARGO_PKG_VERSION"));

    let mut runner = QueryRunner::new(&oracle, &oracle, config);
    let report = runner
        .run(network_file, params_file)
        .with_context(|| format!("Query run failed in {}", runner.phase()))?;

    info!(
        "Query {} complete: {} network(s), {} dropped, {} document(s), strategy {}",
        report.query,
        report.networks,
        report.dropped.len(),
        report.written.len(),
        report.strategy
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    println!("{}", report.results_dir.display());
    Ok(())
}
