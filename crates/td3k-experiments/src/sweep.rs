//! Experiment 2: Trajectory Parameter Sweep
//!
//! Re-runs the hold-out protocol over a grid of stability thresholds and
//! n-gram widths on the same patient sample.

use crate::holdout::{evaluate_config, print_summary, sample_treated, write_json};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use td3k_core::{EngineConfig, EvaluationSummary, InMemoryRepository};

/// One grid point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub trajectory_threshold: f64,
    pub ngram_size: usize,
    pub summary: EvaluationSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResults {
    pub sampled: usize,
    pub seed: u64,
    pub k: usize,
    pub points: Vec<SweepPoint>,
    pub best: Option<SweepPoint>,
}

/// Parse a comma-separated list such as `0.3,0.5`
pub fn parse_list<T>(input: &str) -> Result<Vec<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|e| e.into()))
        .collect()
}

/// Grid point with the highest MRR, ties broken by hit ratio
pub fn best_point(points: &[SweepPoint]) -> Option<&SweepPoint> {
    points.iter().max_by(|a, b| {
        a.summary
            .mrr
            .total_cmp(&b.summary.mrr)
            .then(a.summary.hit_ratio.total_cmp(&b.summary.hit_ratio))
    })
}

pub fn run_sweep_experiment(
    population: PathBuf,
    thresholds: &[f64],
    ngrams: &[usize],
    sample: usize,
    seed: u64,
    k: usize,
    output_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "EXPERIMENT 2: Trajectory Parameter Sweep".green().bold());
    println!();

    let repo = InMemoryRepository::from_json_file(&population)?;
    let ids = sample_treated(&repo, sample, seed);
    println!("Configuration:");
    println!("  Population: {} patients", repo.len());
    println!("  Held-out sample: {} (seed {})", ids.len(), seed);
    println!("  Thresholds: {:?}", thresholds);
    println!("  N-gram widths: {:?}", ngrams);
    println!();

    let mut points = Vec::with_capacity(thresholds.len() * ngrams.len());
    for &threshold in thresholds {
        for &n in ngrams {
            println!("{}", format!("τ = {threshold}, n = {n}").yellow());
            let config = EngineConfig::default()
                .with_trajectory_threshold(threshold)
                .with_ngram_size(n);
            let (_, summary) = evaluate_config(&repo, &ids, k, config)?;
            print_summary(&summary);
            points.push(SweepPoint {
                trajectory_threshold: threshold,
                ngram_size: n,
                summary,
            });
        }
    }

    let best = best_point(&points).cloned();
    if let Some(best) = &best {
        println!();
        println!(
            "{}",
            format!(
                "Best: τ = {}, n = {} (MRR {:.3}, hit ratio {:.3})",
                best.trajectory_threshold, best.ngram_size, best.summary.mrr, best.summary.hit_ratio
            )
            .cyan()
            .bold()
        );
    }

    let results = SweepResults {
        sampled: ids.len(),
        seed,
        k,
        points,
        best,
    };
    let path = write_json(&output_dir, "sweep_results.json", &results)?;
    println!("Results saved to: {}", path.display());

    Ok(())
}
