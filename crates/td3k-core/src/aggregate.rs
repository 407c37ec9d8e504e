//! Medication Candidate Aggregation
//!
//! Collects the medications of the top matching patients into one
//! candidate per (drug, intensity) pair.

use crate::drugs::{Dosage, Drug, DrugClass, Intensity};
use crate::guidelines::{control_score, WELL_CONTROLLED_HBA1C};
use crate::patient::PatientRecord;
use crate::similarity::SimilarityResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight of the occurrence count in the composite score
pub const COUNT_WEIGHT: f64 = 0.7;

/// Weight of the average similarity in the composite score
pub const SIMILARITY_WEIGHT: f64 = 0.3;

/// A drug/intensity pair used by similar patients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationCandidate {
    pub drug: Drug,
    pub class: DrugClass,
    pub intensity: Intensity,
    pub dosage: Dosage,
    /// Similar patients taking this drug at this intensity
    pub count: usize,
    pub total_similarity: f64,
    pub average_similarity: f64,
    /// Composite ranking score, set by the recommendation ranker
    pub score: f64,
    /// Users whose latest HbA1c is at or below 7.0%
    pub well_controlled: usize,
    /// Mean glycemic control score over users with a recorded HbA1c
    pub mean_control_score: f64,
    #[serde(skip)]
    control_samples: usize,
}

impl MedicationCandidate {
    pub fn new(drug: Drug, intensity: Intensity) -> Self {
        MedicationCandidate {
            drug,
            class: drug.class(),
            intensity,
            dosage: drug.dosage(intensity),
            count: 0,
            total_similarity: 0.0,
            average_similarity: 0.0,
            score: 0.0,
            well_controlled: 0,
            mean_control_score: 0.0,
            control_samples: 0,
        }
    }

    /// Account for one more similar patient taking this candidate
    pub fn record(&mut self, similarity: f64, hba1c: Option<f64>) {
        self.count += 1;
        self.total_similarity += similarity;
        self.average_similarity = self.total_similarity / self.count as f64;

        if let Some(hba1c) = hba1c {
            if hba1c <= WELL_CONTROLLED_HBA1C {
                self.well_controlled += 1;
            }
            let total = self.mean_control_score * self.control_samples as f64 + control_score(hba1c);
            self.control_samples += 1;
            self.mean_control_score = total / self.control_samples as f64;
        }
    }

    /// `0.7 * count + 0.3 * average_similarity`
    pub fn composite_score(&self) -> f64 {
        COUNT_WEIGHT * self.count as f64 + SIMILARITY_WEIGHT * self.average_similarity
    }
}

/// One candidate per distinct (drug, intensity), in first-seen order
///
/// Callers pass the already-filtered top matches.
pub fn aggregate_candidates<'a, I>(results: I) -> Vec<MedicationCandidate>
where
    I: IntoIterator<Item = &'a SimilarityResult>,
{
    let mut candidates: Vec<MedicationCandidate> = Vec::new();
    let mut index: HashMap<(Drug, Intensity), usize> = HashMap::new();

    for result in results {
        for prescribed in result.medications.prescribed() {
            let key = (prescribed.drug, prescribed.intensity);
            let slot = *index.entry(key).or_insert_with(|| {
                candidates.push(MedicationCandidate::new(prescribed.drug, prescribed.intensity));
                candidates.len() - 1
            });
            candidates[slot].record(result.score, result.details.hba1c);
        }
    }

    candidates
}

/// How many patients of a population take a drug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationUsage {
    pub drug: Drug,
    pub class: DrugClass,
    pub count: usize,
    /// Share of the population, in percent
    pub percentage: f64,
}

/// Per-drug usage over a population, most used first
///
/// Drugs nobody takes are omitted.
pub fn medication_usage(population: &[PatientRecord]) -> Vec<MedicationUsage> {
    if population.is_empty() {
        return Vec::new();
    }

    let total = population.len() as f64;
    let mut usage: Vec<MedicationUsage> = Drug::ALL
        .iter()
        .map(|drug| {
            let count = population
                .iter()
                .filter(|p| p.medications.is_prescribed(*drug))
                .count();
            MedicationUsage {
                drug: *drug,
                class: drug.class(),
                count,
                percentage: count as f64 / total * 100.0,
            }
        })
        .filter(|u| u.count > 0)
        .collect();

    usage.sort_by(|a, b| b.count.cmp(&a.count));
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{AnalysisSnapshot, MedicationSet, Sex};
    use crate::profile::ClinicalDetails;

    fn result(id: &str, score: f64, hba1c: f64, meds: MedicationSet) -> SimilarityResult {
        let patient = PatientRecord::new(id, 1970, Sex::Female);
        SimilarityResult {
            patient_id: id.to_string(),
            score,
            d3k: score,
            trajectory: 0.5,
            details: ClinicalDetails::new(
                &patient,
                &AnalysisSnapshot::default().with_hba1c(hba1c),
                2024,
            ),
            medications: meds,
        }
    }

    #[test]
    fn test_aggregates_by_drug_and_intensity() {
        let results = vec![
            result("a", 0.9, 6.4, MedicationSet::new().with(Drug::Metformin, Intensity::H)),
            result(
                "b",
                0.7,
                8.5,
                MedicationSet::new()
                    .with(Drug::Metformin, Intensity::H)
                    .with(Drug::Sitagliptin, Intensity::M),
            ),
            result("c", 0.5, 7.0, MedicationSet::new().with(Drug::Metformin, Intensity::L)),
        ];

        let candidates = aggregate_candidates(&results);
        assert_eq!(candidates.len(), 3);

        let metformin_h = &candidates[0];
        assert_eq!((metformin_h.drug, metformin_h.intensity), (Drug::Metformin, Intensity::H));
        assert_eq!(metformin_h.count, 2);
        assert!((metformin_h.total_similarity - 1.6).abs() < 1e-12);
        assert!((metformin_h.average_similarity - 0.8).abs() < 1e-12);
        assert_eq!(metformin_h.well_controlled, 1);
        assert!((metformin_h.mean_control_score - 0.7).abs() < 1e-12);
        assert_eq!(metformin_h.dosage, Dosage::Milligrams(3000.0));

        assert_eq!(candidates[1].drug, Drug::Sitagliptin);
        assert_eq!((candidates[2].drug, candidates[2].intensity), (Drug::Metformin, Intensity::L));
    }

    #[test]
    fn test_composite_score() {
        let mut candidate = MedicationCandidate::new(Drug::Empagliflozin, Intensity::M);
        candidate.record(0.8, None);
        candidate.record(0.6, None);

        assert!((candidate.composite_score() - (1.4 + 0.21)).abs() < 1e-12);
        assert_eq!(candidate.mean_control_score, 0.0);
    }

    #[test]
    fn test_empty_input() {
        let results: Vec<SimilarityResult> = Vec::new();
        assert!(aggregate_candidates(&results).is_empty());
    }

    #[test]
    fn test_medication_usage() {
        let population = vec![
            PatientRecord::new("a", 1970, Sex::Male)
                .with_medications(MedicationSet::new().with(Drug::Metformin, Intensity::M)),
            PatientRecord::new("b", 1970, Sex::Male).with_medications(
                MedicationSet::new()
                    .with(Drug::Metformin, Intensity::M)
                    .with(Drug::Insulin, Intensity::M),
            ),
            PatientRecord::new("c", 1970, Sex::Male),
            PatientRecord::new("d", 1970, Sex::Male),
        ];

        let usage = medication_usage(&population);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].drug, Drug::Metformin);
        assert_eq!(usage[0].count, 2);
        assert_eq!(usage[0].percentage, 50.0);
        assert_eq!(usage[1].drug, Drug::Insulin);
        assert_eq!(usage[1].percentage, 25.0);
    }
}
