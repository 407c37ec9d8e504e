//! Evaluation Metrics
//!
//! Offline validation of recommendations against a patient's real
//! medication record: hit ratio, recall, precision and mean reciprocal
//! rank. `HoldOutEvaluator` runs the full pipeline for a held-out patient
//! against the rest of the population and scores the result.

use crate::engine::Td3kEngine;
use crate::patient::{PatientId, PrescribedDrug};
use crate::recommend::Recommendation;
use crate::repository::PatientRepository;
use crate::{Result, Td3kError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Metrics for one patient
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// 1.0 if any recommendation matches an actual drug and intensity
    pub hit_ratio: f64,
    /// Share of actual drugs that were recommended
    pub recall: f64,
    /// Share of recommendations that are actually prescribed
    pub precision: f64,
    /// Reciprocal rank of the first recommended drug actually prescribed
    pub mrr: f64,
    pub matches: usize,
    pub total_recommendations: usize,
    pub total_actual: usize,
}

/// Score the first `k` recommendations against the actual medications
pub fn evaluate(recommendations: &[Recommendation], actual: &[PrescribedDrug], k: usize) -> EvaluationMetrics {
    let top = &recommendations[..k.min(recommendations.len())];
    let is_actual = |rec: &Recommendation| actual.iter().any(|a| a.drug == rec.drug());

    let hit = top
        .iter()
        .any(|rec| actual.iter().any(|a| a.drug == rec.drug() && a.intensity == rec.intensity()));

    let matches = top.iter().filter(|rec| is_actual(*rec)).count();

    let recalled = actual
        .iter()
        .filter(|a| top.iter().any(|rec| rec.drug() == a.drug))
        .count();
    let recall = if actual.is_empty() {
        0.0
    } else {
        recalled as f64 / actual.len() as f64
    };

    let precision = if top.is_empty() {
        0.0
    } else {
        matches as f64 / top.len() as f64
    };

    let mrr = top
        .iter()
        .position(|rec| is_actual(rec))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0);

    EvaluationMetrics {
        hit_ratio: if hit { 1.0 } else { 0.0 },
        recall,
        precision,
        mrr,
        matches,
        total_recommendations: top.len(),
        total_actual: actual.len(),
    }
}

/// Mean metrics over many held-out patients
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub patients: usize,
    pub hit_ratio: f64,
    pub recall: f64,
    pub precision: f64,
    pub mrr: f64,
}

impl EvaluationSummary {
    pub fn from_metrics(metrics: &[EvaluationMetrics]) -> Self {
        if metrics.is_empty() {
            return EvaluationSummary::default();
        }

        let n = metrics.len() as f64;
        let mean = |f: fn(&EvaluationMetrics) -> f64| metrics.iter().map(f).sum::<f64>() / n;

        EvaluationSummary {
            patients: metrics.len(),
            hit_ratio: mean(|m| m.hit_ratio),
            recall: mean(|m| m.recall),
            precision: mean(|m| m.precision),
            mrr: mean(|m| m.mrr),
        }
    }
}

/// Result of evaluating one held-out patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldOutOutcome {
    pub patient_id: PatientId,
    pub metrics: EvaluationMetrics,
    pub based_on_patients: usize,
    pub fallback: bool,
}

/// Leave-one-out evaluation over an engine's repository
pub struct HoldOutEvaluator<'a, R> {
    engine: &'a Td3kEngine<R>,
    k: usize,
}

impl<'a, R: PatientRepository> HoldOutEvaluator<'a, R> {
    pub fn new(engine: &'a Td3kEngine<R>, k: usize) -> Self {
        HoldOutEvaluator { engine, k }
    }

    /// Evaluate one patient; `None` if it has no prescribed drugs or no
    /// analysis data to compare with
    ///
    /// # Errors
    ///
    /// `PatientNotFound` or a repository failure.
    pub fn evaluate_patient(&self, patient_id: &str) -> Result<Option<HoldOutOutcome>> {
        let patient = self
            .engine
            .repository()
            .get_by_id(patient_id)?
            .ok_or_else(|| Td3kError::PatientNotFound(patient_id.to_string()))?;

        let actual: Vec<PrescribedDrug> = patient.medications.prescribed().collect();
        if actual.is_empty() {
            tracing::debug!(patient_id, "skipping held-out patient without medications");
            return Ok(None);
        }

        let (_, report) = match self.engine.analyze(patient_id) {
            Ok(analysis) => analysis,
            Err(Td3kError::NoComparisonData(_)) => {
                tracing::debug!(patient_id, "skipping held-out patient without analysis data");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let metrics = evaluate(&report.recommendations, &actual, self.k);
        tracing::debug!(
            patient_id,
            hit = metrics.hit_ratio,
            recall = metrics.recall,
            mrr = metrics.mrr,
            "held-out patient evaluated"
        );

        Ok(Some(HoldOutOutcome {
            patient_id: patient.id,
            metrics,
            based_on_patients: report.based_on_patients,
            fallback: report.fallback,
        }))
    }

    /// Evaluate several patients and summarize
    pub fn evaluate_many(&self, patient_ids: &[PatientId]) -> Result<(Vec<HoldOutOutcome>, EvaluationSummary)> {
        let outcomes: Vec<HoldOutOutcome> = self
            .evaluate_all(patient_ids)?
            .into_iter()
            .flatten()
            .collect();

        let metrics: Vec<EvaluationMetrics> = outcomes.iter().map(|o| o.metrics).collect();
        let summary = EvaluationSummary::from_metrics(&metrics);
        tracing::info!(
            requested = patient_ids.len(),
            evaluated = summary.patients,
            hit_ratio = summary.hit_ratio,
            recall = summary.recall,
            precision = summary.precision,
            mrr = summary.mrr,
            "hold-out evaluation complete"
        );

        Ok((outcomes, summary))
    }

    #[cfg(feature = "parallel")]
    fn evaluate_all(&self, patient_ids: &[PatientId]) -> Result<Vec<Option<HoldOutOutcome>>> {
        patient_ids
            .par_iter()
            .map(|id| self.evaluate_patient(id))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate_all(&self, patient_ids: &[PatientId]) -> Result<Vec<Option<HoldOutOutcome>>> {
        patient_ids.iter().map(|id| self.evaluate_patient(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MedicationCandidate;
    use crate::drugs::{Drug, Intensity};
    use crate::guidelines::{EvidenceLevel, TreatmentLine};

    fn rec(drug: Drug, intensity: Intensity) -> Recommendation {
        Recommendation {
            candidate: MedicationCandidate::new(drug, intensity),
            line: TreatmentLine::Alternative,
            rationale: String::new(),
            evidence: EvidenceLevel::B,
        }
    }

    #[test]
    fn test_recall_precision_mrr() {
        let recs = vec![
            rec(Drug::Metformin, Intensity::M),
            rec(Drug::Sitagliptin, Intensity::M),
            rec(Drug::Insulin, Intensity::M),
        ];
        let actual = vec![PrescribedDrug::new(Drug::Sitagliptin, Intensity::M)];

        let m = evaluate(&recs, &actual, 10);
        assert_eq!(m.recall, 1.0);
        assert!((m.precision - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.mrr, 0.5);
        assert_eq!(m.hit_ratio, 1.0);
        assert_eq!(m.matches, 1);
        assert_eq!(m.total_recommendations, 3);
        assert_eq!(m.total_actual, 1);
    }

    #[test]
    fn test_hit_requires_intensity_match() {
        let recs = vec![rec(Drug::Metformin, Intensity::H)];
        let actual = vec![PrescribedDrug::new(Drug::Metformin, Intensity::L)];

        let m = evaluate(&recs, &actual, 5);
        assert_eq!(m.hit_ratio, 0.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.mrr, 1.0);
    }

    #[test]
    fn test_truncates_to_k() {
        let recs = vec![
            rec(Drug::Metformin, Intensity::M),
            rec(Drug::Sitagliptin, Intensity::M),
        ];
        let actual = vec![PrescribedDrug::new(Drug::Sitagliptin, Intensity::M)];

        let m = evaluate(&recs, &actual, 1);
        assert_eq!(m.total_recommendations, 1);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.mrr, 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        let m = evaluate(&[], &[PrescribedDrug::new(Drug::Metformin, Intensity::M)], 10);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);

        let m = evaluate(&[rec(Drug::Metformin, Intensity::M)], &[], 10);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.mrr, 0.0);
    }

    #[test]
    fn test_summary_means() {
        let a = EvaluationMetrics {
            hit_ratio: 1.0,
            recall: 0.5,
            precision: 0.2,
            mrr: 1.0,
            ..Default::default()
        };
        let b = EvaluationMetrics {
            hit_ratio: 0.0,
            recall: 1.0,
            precision: 0.4,
            mrr: 0.5,
            ..Default::default()
        };

        let summary = EvaluationSummary::from_metrics(&[a, b]);
        assert_eq!(summary.patients, 2);
        assert_eq!(summary.hit_ratio, 0.5);
        assert_eq!(summary.recall, 0.75);
        assert!((summary.precision - 0.3).abs() < 1e-12);
        assert_eq!(summary.mrr, 0.75);
        assert_eq!(EvaluationSummary::from_metrics(&[]), EvaluationSummary::default());
    }
}
