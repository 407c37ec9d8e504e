//! Recommendation Ranking
//!
//! Orders medication candidates by composite score, then applies the
//! guideline overrides: metformin first, group-specific second-line
//! preferences next, everything else as alternatives.

use crate::aggregate::MedicationCandidate;
use crate::drugs::{Drug, Intensity};
use crate::guidelines::{
    second_line_preferences, second_line_rationale, EvidenceLevel, HbA1cStatus, PatientGroup,
    TreatmentLine, ALTERNATIVE_RATIONALE, FIRST_LINE_RATIONALE, STANDARD_OF_CARE_RATIONALE,
};
use crate::monitoring::MonitoringPlan;
use serde::{Deserialize, Serialize};

/// Default cap on the number of recommendations
pub const MAX_RECOMMENDATIONS: usize = 10;

/// A ranked, labeled medication recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub candidate: MedicationCandidate,
    pub line: TreatmentLine,
    pub rationale: String,
    pub evidence: EvidenceLevel,
}

impl Recommendation {
    fn new(
        candidate: MedicationCandidate,
        line: TreatmentLine,
        rationale: &str,
        evidence: EvidenceLevel,
    ) -> Self {
        Recommendation {
            candidate,
            line,
            rationale: rationale.to_string(),
            evidence,
        }
    }

    pub fn drug(&self) -> Drug {
        self.candidate.drug
    }

    pub fn intensity(&self) -> Intensity {
        self.candidate.intensity
    }
}

/// Metformin-only recommendation used when no similar patients exist
pub fn standard_of_care() -> Recommendation {
    Recommendation::new(
        MedicationCandidate::new(Drug::Metformin, Intensity::L),
        TreatmentLine::FirstLine,
        STANDARD_OF_CARE_RATIONALE,
        EvidenceLevel::Guideline,
    )
}

/// Complete output of a recommendation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub patient_group: PatientGroup,
    /// Target's latest HbA1c, if recorded
    pub target_hba1c: Option<f64>,
    pub target_hba1c_status: HbA1cStatus,
    pub recommendations: Vec<Recommendation>,
    pub monitoring: MonitoringPlan,
    /// Similar patients the recommendations were drawn from
    pub based_on_patients: usize,
    pub methodology: String,
    /// True when the standard-of-care fallback was used
    pub fallback: bool,
}

/// Applies composite scoring and guideline reordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationRanker {
    max_recommendations: usize,
}

impl Default for RecommendationRanker {
    fn default() -> Self {
        RecommendationRanker {
            max_recommendations: MAX_RECOMMENDATIONS,
        }
    }
}

impl RecommendationRanker {
    pub fn new(max_recommendations: usize) -> Self {
        RecommendationRanker {
            max_recommendations: max_recommendations.max(1),
        }
    }

    /// Rank candidates for a patient in `group` with the given HbA1c
    ///
    /// No candidates yields the standard-of-care fallback.
    pub fn rank(
        &self,
        mut candidates: Vec<MedicationCandidate>,
        group: PatientGroup,
        hba1c: f64,
    ) -> Vec<Recommendation> {
        if candidates.is_empty() {
            return vec![standard_of_care()];
        }

        for candidate in &mut candidates {
            candidate.score = candidate.composite_score();
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut recommended: Vec<Drug> = Vec::new();
        let mut out: Vec<Recommendation> = Vec::new();

        if let Some(metformin) = candidates.iter().find(|c| c.drug == Drug::Metformin) {
            recommended.push(Drug::Metformin);
            out.push(Recommendation::new(
                metformin.clone(),
                TreatmentLine::FirstLine,
                FIRST_LINE_RATIONALE,
                EvidenceLevel::A,
            ));
        }

        for drug in second_line_preferences(group, hba1c) {
            if recommended.contains(&drug) {
                continue;
            }
            if let Some(candidate) = candidates.iter().find(|c| c.drug == drug) {
                recommended.push(drug);
                out.push(Recommendation::new(
                    candidate.clone(),
                    TreatmentLine::SecondLine,
                    second_line_rationale(drug),
                    EvidenceLevel::A,
                ));
            }
        }

        for candidate in candidates {
            if recommended.contains(&candidate.drug) {
                continue;
            }
            recommended.push(candidate.drug);
            out.push(Recommendation::new(
                candidate,
                TreatmentLine::Alternative,
                ALTERNATIVE_RATIONALE,
                EvidenceLevel::B,
            ));
        }

        out.truncate(self.max_recommendations);
        out
    }
}
