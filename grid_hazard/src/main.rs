//! Experiment runner
//!
//! Usage:
//!   cargo run --release --bin grid_hazard -- --config experiments/fd_baseline.toml
//!   cargo run --release --bin grid_hazard -- --config experiments/bau_baseline.toml --outer 10 --threads 8

use anyhow::Context;
use clap::Parser;
use grid_hazard::config::ExperimentConfig;
use grid_hazard::driver::MonteCarloDriver;
use grid_hazard::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hurricane cost-risk Monte Carlo for an island grid", long_about = None)]
struct Args {
    /// Experiment TOML
    #[arg(short, long)]
    config: PathBuf,

    #[arg(long, help = "Override the number of outer (scenario) iterations")]
    outer: Option<usize>,

    #[arg(long, help = "Override the number of inner (hazard) iterations")]
    inner: Option<usize>,

    #[arg(long, help = "Base seed; outer iteration k uses seed + k")]
    seed: Option<u64>,

    #[arg(short, long, help = "Run outer iterations on this many threads")]
    threads: Option<usize>,

    #[arg(short, long, help = "Directory for the output/input matrices")]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = ExperimentConfig::from_path(&args.config)
        .with_context(|| format!("loading experiment {}", args.config.display()))?;
    if let Some(outer) = args.outer {
        config.experiment.outer_iterations = outer;
    }
    if let Some(inner) = args.inner {
        config.experiment.inner_iterations = inner;
    }
    if let Some(seed) = args.seed {
        config.experiment.seed = seed;
    }
    if args.threads.is_some() {
        config.experiment.threads = args.threads;
    }
    if let Some(dir) = args.output_dir {
        config.experiment.output_dir = dir;
    }
    config.validate().context("invalid command-line override")?;

    let driver = MonteCarloDriver::from_config(config).context("loading simulation inputs")?;
    let summary = driver.run().context("running experiment")?;

    println!(
        "Completed {} outer iterations in {:.1}s",
        summary.completed.len(),
        summary.elapsed_secs
    );
    println!("  outputs:  {}", summary.output_path.display());
    println!("  inputs:   {}", summary.input_path.display());
    println!("  metadata: {}", summary.metadata_path.display());
    Ok(())
}
