//! Experiment 1: Hold-out Evaluation
//!
//! Samples patients with a recorded medication set, recommends for each
//! one using only the rest of the population, and compares the result
//! with what the patient is actually prescribed.

use colored::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use td3k_core::{
    EngineConfig, EvaluationSummary, HoldOutEvaluator, HoldOutOutcome, InMemoryRepository, PatientId,
    Td3kEngine,
};

/// Persisted results of a hold-out run
#[derive(Debug, Serialize, Deserialize)]
pub struct HoldOutResults {
    pub population_size: usize,
    pub sampled: usize,
    pub seed: u64,
    pub k: usize,
    pub config: EngineConfig,
    pub summary: EvaluationSummary,
    pub fallback_count: usize,
    pub elapsed_ms: f64,
    pub outcomes: Vec<HoldOutOutcome>,
}

/// Seeded sample of patients that have at least one prescribed drug
pub fn sample_treated(repo: &InMemoryRepository, sample: usize, seed: u64) -> Vec<PatientId> {
    let mut ids: Vec<PatientId> = repo
        .patients()
        .iter()
        .filter(|p| p.has_analysis() && p.medications.prescribed_count() > 0)
        .map(|p| p.id.clone())
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    ids.shuffle(&mut rng);
    ids.truncate(sample);
    ids
}

/// Evaluate `ids` with the given configuration
pub fn evaluate_config(
    repo: &InMemoryRepository,
    ids: &[PatientId],
    k: usize,
    config: EngineConfig,
) -> Result<(Vec<HoldOutOutcome>, EvaluationSummary), Box<dyn std::error::Error>> {
    let engine = Td3kEngine::new(repo, config)?;
    let evaluator = HoldOutEvaluator::new(&engine, k);
    Ok(evaluator.evaluate_many(ids)?)
}

pub fn print_summary(summary: &EvaluationSummary) {
    println!("   Patients evaluated: {}", summary.patients);
    println!("   Hit ratio:  {:.3}", summary.hit_ratio);
    println!("   Recall:     {:.3}", summary.recall);
    println!("   Precision:  {:.3}", summary.precision);
    println!("   MRR:        {:.3}", summary.mrr);
}

pub fn write_json<T: Serialize>(output_dir: &Path, name: &str, value: &T) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value)?)?;
    Ok(path)
}

pub fn run_holdout_experiment(
    population: PathBuf,
    sample: usize,
    seed: u64,
    k: usize,
    config: EngineConfig,
    output_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "EXPERIMENT 1: Hold-out Evaluation".green().bold());
    println!();

    println!("{}", "1. Loading population...".yellow());
    let repo = InMemoryRepository::from_json_file(&population)?;
    println!("   Loaded {} patients from {}", repo.len(), population.display());

    println!("{}", "2. Sampling held-out patients...".yellow());
    let ids = sample_treated(&repo, sample, seed);
    println!("   Sampled {} treated patients (seed {})", ids.len(), seed);

    println!("{}", "3. Running leave-one-out recommendations...".yellow());
    let start = Instant::now();
    let (outcomes, summary) = evaluate_config(&repo, &ids, k, config.clone())?;
    let elapsed = start.elapsed();
    let fallback_count = outcomes.iter().filter(|o| o.fallback).count();
    tracing::debug!(evaluated = summary.patients, fallback_count, "hold-out pass complete");
    println!(
        "   Evaluated {} patients in {:.2}ms ({:.3}ms/patient)",
        summary.patients,
        elapsed.as_secs_f64() * 1000.0,
        elapsed.as_secs_f64() * 1000.0 / summary.patients.max(1) as f64
    );

    println!();
    println!("{}", format!("Results (top-{k}):").cyan().bold());
    print_summary(&summary);
    if fallback_count > 0 {
        println!(
            "   {}",
            format!("{fallback_count} patients fell back to standard of care").yellow()
        );
    }

    let results = HoldOutResults {
        population_size: repo.len(),
        sampled: ids.len(),
        seed,
        k,
        config,
        summary,
        fallback_count,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        outcomes,
    };
    let path = write_json(&output_dir, "holdout_results.json", &results)?;
    println!();
    println!("Results saved to: {}", path.display());

    Ok(())
}
