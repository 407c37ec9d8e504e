//! T-D3K Validation Experiments
//!
//! Leave-one-out validation of the recommendation engine against the real
//! medication records of a patient population, plus a parameter sweep
//! over the trajectory encoding.

mod holdout;
mod sweep;

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use td3k_core::EngineConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "td3k-experiments")]
#[command(about = "Offline validation experiments for T-D3K recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Experiment 1: Hold-out evaluation on a sampled population
    Holdout {
        /// Population file (JSON array of patient records)
        #[arg(short, long)]
        population: PathBuf,

        /// Number of held-out patients to sample
        #[arg(short, long, default_value = "100")]
        sample: usize,

        /// Sampling seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Recommendations considered per patient
        #[arg(short = 'k', long, default_value = "5")]
        k: usize,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },

    /// Experiment 2: Sweep trajectory threshold and n-gram width
    Sweep {
        /// Population file (JSON array of patient records)
        #[arg(short, long)]
        population: PathBuf,

        /// Comma-separated stability thresholds
        #[arg(short, long, default_value = "0.3,0.5,0.7")]
        thresholds: String,

        /// Comma-separated n-gram widths
        #[arg(short, long, default_value = "3,4,6")]
        ngrams: String,

        /// Number of held-out patients to sample
        #[arg(short, long, default_value = "100")]
        sample: usize,

        /// Sampling seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Recommendations considered per patient
        #[arg(short = 'k', long, default_value = "5")]
        k: usize,

        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  T-D3K VALIDATION EXPERIMENTS".cyan().bold());
    println!("{}", "  Trajectory + Data-driven Domain Knowledge".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();

    match cli.command {
        Commands::Holdout { population, sample, seed, k, config, output } => {
            let config = match config {
                Some(path) => EngineConfig::from_json_file(path)?,
                None => EngineConfig::default(),
            };
            holdout::run_holdout_experiment(population, sample, seed, k, config, output)?;
        }
        Commands::Sweep { population, thresholds, ngrams, sample, seed, k, output } => {
            let thresholds = sweep::parse_list::<f64>(&thresholds)?;
            let ngrams = sweep::parse_list::<usize>(&ngrams)?;
            sweep::run_sweep_experiment(population, &thresholds, &ngrams, sample, seed, k, output)?;
        }
    }

    Ok(())
}
