//! Similarity Ranking
//!
//! Scores every comparison patient against a target by blending D3K
//! clinical similarity with HbA1c trajectory similarity, then ranks the
//! population by the combined score.

use crate::config::{ConfigError, EngineConfig};
use crate::d3k::D3kCalculator;
use crate::patient::{MedicationSet, PatientId, PatientRecord};
use crate::profile::{ClinicalDetails, ClinicalProfile, ProfileExtractor};
use crate::trajectory::TrajectoryEncoder;
use crate::{Result, Td3kError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One scored comparison patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub patient_id: PatientId,
    /// Combined score in [0, 1]
    pub score: f64,
    pub d3k: f64,
    pub trajectory: f64,
    pub details: ClinicalDetails,
    pub medications: MedicationSet,
}

/// Sort descending by combined score, keeping input order for ties
pub fn sort_by_score(results: &mut [SimilarityResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Target-side data computed once per pass
struct TargetContext {
    profile: ClinicalProfile,
    history: Vec<f64>,
}

/// Ranks a population by similarity to a target patient
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    extractor: ProfileExtractor,
    d3k: D3kCalculator,
    encoder: TrajectoryEncoder,
    alpha: f64,
    beta: f64,
    parallel: bool,
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        SimilarityRanker {
            extractor: ProfileExtractor::default(),
            d3k: D3kCalculator::default(),
            encoder: TrajectoryEncoder::default(),
            alpha: 0.5,
            beta: 0.5,
            parallel: false,
        }
    }
}

impl SimilarityRanker {
    /// Build a ranker from a validated configuration
    pub fn new(config: &EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(SimilarityRanker {
            extractor: config.profile_extractor(),
            d3k: D3kCalculator::default(),
            encoder: config.trajectory_encoder(),
            alpha: config.alpha,
            beta: config.beta,
            parallel: config.parallel,
        })
    }

    pub fn with_extractor(mut self, extractor: ProfileExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_d3k(mut self, d3k: D3kCalculator) -> Self {
        self.d3k = d3k;
        self
    }

    pub fn extractor(&self) -> &ProfileExtractor {
        &self.extractor
    }

    /// Whether population scoring runs on the rayon pool
    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }

    fn prepare(&self, target: &PatientRecord) -> Result<TargetContext> {
        let profile = self.extractor.extract(target).map_err(|e| match e {
            Td3kError::MissingAnalysisData(id) => Td3kError::NoComparisonData(id),
            other => other,
        })?;
        Ok(TargetContext {
            profile,
            history: target.hba1c_history(),
        })
    }

    /// Score one candidate; `None` if it has no analysis data
    fn score_candidate(
        &self,
        target: &TargetContext,
        candidate: &PatientRecord,
    ) -> Result<Option<SimilarityResult>> {
        let Some(snapshot) = candidate.latest_analysis() else {
            tracing::debug!(patient_id = %candidate.id, "skipping candidate without analysis data");
            return Ok(None);
        };

        let profile = self.extractor.extract_with(candidate, snapshot);
        let d3k = self.d3k.similarity(&target.profile, &profile)?;
        let trajectory = self
            .encoder
            .compare_histories(&target.history, &candidate.hba1c_history());
        let score = (self.alpha * d3k + self.beta * trajectory).clamp(0.0, 1.0);

        Ok(Some(SimilarityResult {
            patient_id: candidate.id.clone(),
            score,
            d3k,
            trajectory,
            details: ClinicalDetails::new(candidate, snapshot, self.extractor.reference_year()),
            medications: candidate.medications.clone(),
        }))
    }

    /// Combined similarity of a single pair
    ///
    /// # Errors
    ///
    /// `NoComparisonData` if the target has no snapshot, `MissingAnalysisData`
    /// if the candidate has none.
    pub fn score_pair(&self, target: &PatientRecord, candidate: &PatientRecord) -> Result<SimilarityResult> {
        let ctx = self.prepare(target)?;
        self.score_candidate(&ctx, candidate)?
            .ok_or_else(|| Td3kError::MissingAnalysisData(candidate.id.clone()))
    }

    /// Rank `population` by similarity to `target`, best first
    ///
    /// Candidates without analysis data are skipped. An empty population
    /// yields an empty ranking.
    ///
    /// # Errors
    ///
    /// `NoComparisonData` if the target has no analysis snapshot.
    pub fn rank(&self, target: &PatientRecord, population: &[PatientRecord]) -> Result<Vec<SimilarityResult>> {
        let ctx = self.prepare(target)?;

        let scored = self.score_all(&ctx, population)?;
        let mut results: Vec<SimilarityResult> = scored.into_iter().flatten().collect();
        sort_by_score(&mut results);

        let stats = SimilarityStats::from_results(&results, population.len());
        tracing::info!(
            target_id = %target.id,
            compared = stats.count,
            skipped = stats.skipped,
            best = stats.max,
            mean = stats.mean,
            "similarity ranking complete"
        );

        Ok(results)
    }

    #[cfg(feature = "parallel")]
    fn score_all(
        &self,
        ctx: &TargetContext,
        population: &[PatientRecord],
    ) -> Result<Vec<Option<SimilarityResult>>> {
        if self.parallel {
            population
                .par_iter()
                .map(|candidate| self.score_candidate(ctx, candidate))
                .collect()
        } else {
            self.score_sequential(ctx, population)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn score_all(
        &self,
        ctx: &TargetContext,
        population: &[PatientRecord],
    ) -> Result<Vec<Option<SimilarityResult>>> {
        self.score_sequential(ctx, population)
    }

    fn score_sequential(
        &self,
        ctx: &TargetContext,
        population: &[PatientRecord],
    ) -> Result<Vec<Option<SimilarityResult>>> {
        population
            .iter()
            .map(|candidate| self.score_candidate(ctx, candidate))
            .collect()
    }
}

/// Statistics over a ranked population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Candidates that were scored
    pub count: usize,
    /// Candidates skipped for missing analysis data
    pub skipped: usize,
}

impl SimilarityStats {
    /// Compute statistics from a slice of scores
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return SimilarityStats::default();
        }

        let count = values.len();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        SimilarityStats {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            count,
            skipped: 0,
        }
    }

    /// Statistics of a ranking drawn from a population of `population_size`
    pub fn from_results(results: &[SimilarityResult], population_size: usize) -> Self {
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        SimilarityStats {
            skipped: population_size.saturating_sub(results.len()),
            ..Self::from_values(&scores)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drugs::{Drug, Intensity};
    use crate::patient::{AnalysisSnapshot, Sex};
    use chrono::NaiveDate;

    fn ranker() -> SimilarityRanker {
        SimilarityRanker::new(&EngineConfig::default().with_reference_year(2024)).unwrap()
    }

    fn patient(id: &str, birth_year: i32, hba1c: f64) -> PatientRecord {
        PatientRecord::new(id, birth_year, Sex::Male)
            .with_analysis(AnalysisSnapshot::default().with_hba1c(hba1c).with_disease_duration(5.0))
    }

    fn result(id: &str, score: f64) -> SimilarityResult {
        SimilarityResult {
            patient_id: id.to_string(),
            score,
            d3k: score,
            trajectory: score,
            details: ClinicalDetails::new(
                &PatientRecord::new(id, 1970, Sex::Male),
                &AnalysisSnapshot::default(),
                2024,
            ),
            medications: MedicationSet::new(),
        }
    }

    #[test]
    fn test_stable_sort() {
        let mut results = vec![result("a", 0.3), result("b", 0.9), result("c", 0.9)];
        sort_by_score(&mut results);

        let ids: Vec<_> = results.iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_identical_patient_ranks_first() {
        let target = patient("t", 1970, 7.2);
        let population = vec![patient("far", 1940, 12.0), patient("twin", 1970, 7.2)];

        let results = ranker().rank(&target, &population).unwrap();

        assert_eq!(results[0].patient_id, "twin");
        assert_eq!(results[0].d3k, 1.0);
        // neither side has a dated history
        assert_eq!(results[0].trajectory, 0.5);
        assert!((results[0].score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_candidates_without_analysis_are_skipped() {
        let target = patient("t", 1970, 7.2);
        let population = vec![PatientRecord::new("bare", 1970, Sex::Male), patient("ok", 1970, 8.0)];

        let results = ranker().rank(&target, &population).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].patient_id, "ok");

        let stats = SimilarityStats::from_results(&results, population.len());
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_target_without_analysis() {
        let target = PatientRecord::new("t", 1970, Sex::Male);
        let err = ranker().rank(&target, &[patient("a", 1970, 7.0)]).unwrap_err();
        assert!(matches!(err, Td3kError::NoComparisonData(id) if id == "t"));
    }

    #[test]
    fn test_empty_population() {
        let results = ranker().rank(&patient("t", 1970, 7.0), &[]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_trajectory_component_used() {
        let date = |m| NaiveDate::from_ymd_opt(2023, m, 1).unwrap();
        let with_history = |id: &str, values: &[f64]| {
            values
                .iter()
                .enumerate()
                .fold(PatientRecord::new(id, 1970, Sex::Male), |p, (i, v)| {
                    p.with_analysis(AnalysisSnapshot::on(date(i as u32 + 1)).with_hba1c(*v))
                })
        };

        let target = with_history("t", &[9.0, 8.0, 7.0]);
        let same_shape = with_history("same", &[9.0, 8.0, 7.0]);
        let rising = with_history("rising", &[7.0, 8.0, 9.0]);

        let ranker = ranker();
        let same = ranker.score_pair(&target, &same_shape).unwrap();
        let opposite = ranker.score_pair(&target, &rising).unwrap();

        assert!((same.trajectory - 1.0).abs() < 1e-12);
        assert_eq!(opposite.trajectory, 0.0);
        assert!(same.score > opposite.score);
    }

    #[test]
    fn test_result_carries_medications_and_details() {
        let target = patient("t", 1970, 7.2);
        let candidate = patient("c", 1960, 8.1)
            .with_medications(MedicationSet::new().with(Drug::Metformin, Intensity::H));

        let result = ranker().score_pair(&target, &candidate).unwrap();
        assert!(result.medications.is_prescribed(Drug::Metformin));
        assert_eq!(result.details.age, 64);
        assert_eq!(result.details.hba1c, Some(8.1));
    }

    #[test]
    fn test_similarity_stats() {
        let values = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let stats = SimilarityStats::from_values(&values);

        assert!((stats.min - 0.1).abs() < 0.001);
        assert!((stats.max - 0.5).abs() < 0.001);
        assert!((stats.mean - 0.3).abs() < 0.001);
        assert_eq!(stats.count, 5);
        assert_eq!(SimilarityStats::from_values(&[]), SimilarityStats::default());
    }
}
