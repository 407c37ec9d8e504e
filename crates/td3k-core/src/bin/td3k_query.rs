//! T-D3K Query CLI Tool
//!
//! Rank similar patients and recommend medications from a JSON population.
//!
//! Usage:
//!   td3k-query rank <patient> --population <file> [--top-k <k>]
//!   td3k-query recommend <patient> --population <file> [--top-k <k>]
//!   td3k-query evaluate <patient> --population <file> [-k <k>]
//!   td3k-query stats --population <file>

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use td3k_core::{
    medication_usage, EngineConfig, HbA1cStatus, HoldOutEvaluator, InMemoryRepository, MedicationUsage,
    PatientGroup, PatientRecord, SimilarityResult, SimilarityStats, Td3kEngine,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "td3k-query")]
#[command(author = "T-D3K Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Patient similarity and medication recommendation queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: json or compact
    #[arg(short, long, default_value = "json", global = true)]
    format: String,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the population by similarity to a patient
    Rank {
        /// Target patient id
        patient: String,

        /// Population file (JSON array of patient records)
        #[arg(short, long)]
        population: PathBuf,

        /// Return top-k results (all if not specified)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Include score statistics
        #[arg(long)]
        with_stats: bool,
    },

    /// Recommend medications for a patient
    Recommend {
        /// Target patient id
        patient: String,

        /// Population file
        #[arg(short, long)]
        population: PathBuf,

        /// Number of similar patients to draw from
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Score recommendations for a patient against its own medications
    Evaluate {
        /// Held-out patient id
        patient: String,

        /// Population file
        #[arg(short, long)]
        population: PathBuf,

        /// Recommendations considered
        #[arg(short = 'k', long, default_value = "5")]
        k: usize,
    },

    /// Summarize a population
    Stats {
        /// Population file
        #[arg(short, long)]
        population: PathBuf,
    },
}

/// Ranking output
#[derive(serde::Serialize)]
struct RankOutput {
    patient_id: String,
    results: Vec<SimilarityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<SimilarityStats>,
}

/// Population summary
#[derive(serde::Serialize)]
struct PopulationStats {
    patients: usize,
    with_analysis: usize,
    mean_hba1c: Option<f64>,
    groups: BTreeMap<&'static str, usize>,
    hba1c_status: BTreeMap<&'static str, usize>,
    medication_usage: Vec<MedicationUsage>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    let result: serde_json::Value = match cli.command {
        Commands::Rank { patient, population, top_k, with_stats } => {
            let engine = load_engine(&population, config)?;
            let mut results = engine.compute_similarity(&patient)?;
            let compared = engine.repository().len().saturating_sub(1);
            let stats = with_stats.then(|| SimilarityStats::from_results(&results, compared));
            if let Some(k) = top_k {
                results.truncate(k);
            }
            serde_json::to_value(RankOutput {
                patient_id: patient,
                results,
                stats,
            })?
        }
        Commands::Recommend { patient, population, top_k } => {
            let engine = load_engine(&population, config)?;
            let k = top_k.unwrap_or(engine.config().top_k);
            let results = engine.compute_similarity(&patient)?;
            let report = engine.recommend_medications(&patient, &results, k)?;
            serde_json::to_value(report)?
        }
        Commands::Evaluate { patient, population, k } => {
            let engine = load_engine(&population, config)?;
            let evaluator = HoldOutEvaluator::new(&engine, k);
            match evaluator.evaluate_patient(&patient)? {
                Some(outcome) => serde_json::to_value(outcome)?,
                None => serde_json::json!({
                    "patient_id": patient,
                    "status": "skipped",
                    "reason": "no prescribed medications or analysis data",
                }),
            }
        }
        Commands::Stats { population } => {
            let repo = InMemoryRepository::from_json_file(&population)?;
            serde_json::to_value(population_stats(repo.patients()))?
        }
    };

    // Output result
    let output_str = match cli.format.as_str() {
        "compact" => serde_json::to_string(&result)?,
        _ => serde_json::to_string_pretty(&result)?,
    };

    if let Some(output_path) = cli.output {
        fs::write(&output_path, &output_str)?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn load_engine(
    population: &Path,
    config: EngineConfig,
) -> Result<Td3kEngine<InMemoryRepository>, Box<dyn std::error::Error>> {
    let repo = InMemoryRepository::from_json_file(population)?;
    tracing::info!(patients = repo.len(), path = %population.display(), "population loaded");
    Ok(Td3kEngine::new(repo, config)?)
}

fn population_stats(patients: &[PatientRecord]) -> PopulationStats {
    let mut groups = BTreeMap::new();
    let mut hba1c_status = BTreeMap::new();
    let mut hba1c_values = Vec::new();

    for snapshot in patients.iter().filter_map(|p| p.latest_analysis()) {
        let group = PatientGroup::classify(snapshot.has_hyperlipidemia, snapshot.has_hypertension);
        *groups.entry(group.code()).or_insert(0) += 1;

        if let Some(hba1c) = snapshot.valid_hba1c() {
            hba1c_values.push(hba1c);
            *hba1c_status.entry(HbA1cStatus::from_hba1c(hba1c).label()).or_insert(0) += 1;
        }
    }

    let with_analysis = groups.values().sum();
    let mean_hba1c = (!hba1c_values.is_empty())
        .then(|| hba1c_values.iter().sum::<f64>() / hba1c_values.len() as f64);

    PopulationStats {
        patients: patients.len(),
        with_analysis,
        mean_hba1c,
        groups,
        hba1c_status,
        medication_usage: medication_usage(patients),
    }
}
