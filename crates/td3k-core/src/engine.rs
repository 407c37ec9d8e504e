//! T-D3K Engine
//!
//! Ties the pipeline to a patient repository: fetch the target and the
//! comparison population, rank by similarity, then turn the best matches
//! into a recommendation report.

use crate::aggregate::aggregate_candidates;
use crate::config::EngineConfig;
use crate::guidelines::{HbA1cStatus, PatientGroup};
use crate::monitoring::MonitoringPlan;
use crate::patient::PatientRecord;
use crate::profile::defaults;
use crate::recommend::{RecommendationRanker, RecommendationReport};
use crate::repository::PatientRepository;
use crate::similarity::{SimilarityRanker, SimilarityResult};
use crate::{Result, Td3kError, METHODOLOGY};

/// Similarity and recommendation engine over a patient repository
#[derive(Debug)]
pub struct Td3kEngine<R> {
    repository: R,
    config: EngineConfig,
    ranker: SimilarityRanker,
    recommender: RecommendationRanker,
}

impl<R: PatientRepository> Td3kEngine<R> {
    /// Create an engine, validating the configuration
    pub fn new(repository: R, config: EngineConfig) -> Result<Self> {
        let ranker = SimilarityRanker::new(&config)?;
        let recommender = RecommendationRanker::new(config.max_recommendations);
        Ok(Td3kEngine {
            repository,
            config,
            ranker,
            recommender,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    fn fetch_target(&self, target_id: &str) -> Result<PatientRecord> {
        self.repository
            .get_by_id(target_id)?
            .ok_or_else(|| Td3kError::PatientNotFound(target_id.to_string()))
    }

    /// Rank every other patient by similarity to `target_id`
    ///
    /// # Errors
    ///
    /// `PatientNotFound`, `NoComparisonData` if the target has no analysis
    /// snapshot, or a repository failure.
    pub fn compute_similarity(&self, target_id: &str) -> Result<Vec<SimilarityResult>> {
        let target = self.fetch_target(target_id)?;
        let population = self.repository.get_all_except(target_id)?;
        tracing::debug!(target_id, population = population.len(), "computing similarity");
        self.ranker.rank(&target, &population)
    }

    /// Recommendations for `target_id` drawn from its `k` best matches
    ///
    /// Only matches scoring above the configured minimum are used. With no
    /// usable match the report carries the standard-of-care fallback.
    ///
    /// # Errors
    ///
    /// `PatientNotFound` or `NoComparisonData` for the target, or a
    /// repository failure.
    pub fn recommend_medications(
        &self,
        target_id: &str,
        results: &[SimilarityResult],
        k: usize,
    ) -> Result<RecommendationReport> {
        let target = self.fetch_target(target_id)?;
        let snapshot = target
            .latest_analysis()
            .ok_or_else(|| Td3kError::NoComparisonData(target_id.to_string()))?;

        let top: Vec<&SimilarityResult> = results
            .iter()
            .filter(|r| r.score > self.config.min_score)
            .take(k)
            .collect();

        let target_hba1c = snapshot.valid_hba1c();
        let hba1c = target_hba1c.unwrap_or(defaults::HBA1C);
        let group = PatientGroup::classify(snapshot.has_hyperlipidemia, snapshot.has_hypertension);

        let candidates = aggregate_candidates(top.iter().copied());
        let fallback = candidates.is_empty();
        let recommendations = self.recommender.rank(candidates, group, hba1c);

        if fallback {
            tracing::warn!(target_id, "no similar patients above threshold, using standard of care");
        }
        tracing::info!(
            target_id,
            group = group.code(),
            based_on = top.len(),
            recommendations = recommendations.len(),
            "recommendation complete"
        );

        Ok(RecommendationReport {
            patient_group: group,
            target_hba1c,
            target_hba1c_status: HbA1cStatus::from_hba1c(hba1c),
            recommendations,
            monitoring: MonitoringPlan::for_snapshot(snapshot),
            based_on_patients: top.len(),
            methodology: METHODOLOGY.to_string(),
            fallback,
        })
    }

    /// Similarity ranking and recommendation in one pass, using `top_k`
    pub fn analyze(&self, target_id: &str) -> Result<(Vec<SimilarityResult>, RecommendationReport)> {
        let results = self.compute_similarity(target_id)?;
        let report = self.recommend_medications(target_id, &results, self.config.top_k)?;
        Ok((results, report))
    }
}
