//! Clinical Guideline Rules
//!
//! Declarative ADA/EASD-derived rule tables used to reorder medication
//! candidates: patient grouping by comorbidity, second-line preferences per
//! group, the severe-hyperglycemia override and HbA1c status bands.

use crate::drugs::{Drug, DrugClass};
use serde::{Deserialize, Serialize};

/// HbA1c at or above which insulin is preferred regardless of group
pub const SEVERE_HBA1C_THRESHOLD: f64 = 10.0;

/// HbA1c at or below which a patient counts as well controlled
pub const WELL_CONTROLLED_HBA1C: f64 = 7.0;

pub const FIRST_LINE_RATIONALE: &str = "First-line therapy for T2DM (ADA/EASD Guidelines)";
pub const ALTERNATIVE_RATIONALE: &str = "Based on similar patient outcomes";
pub const STANDARD_OF_CARE_RATIONALE: &str =
    "Standard first-line therapy; no similar patients available for comparison";

/// Comorbidity group of a diabetic patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientGroup {
    /// Diabetes only
    #[serde(rename = "DM")]
    Dm,
    /// Diabetes with hyperlipidemia
    #[serde(rename = "DM_HLD")]
    DmHld,
    /// Diabetes with hypertension
    #[serde(rename = "DM_HTN")]
    DmHtn,
    /// Diabetes with hyperlipidemia and hypertension
    #[serde(rename = "DHL")]
    Dhl,
}

impl PatientGroup {
    pub fn classify(has_hyperlipidemia: bool, has_hypertension: bool) -> Self {
        match (has_hyperlipidemia, has_hypertension) {
            (true, true) => PatientGroup::Dhl,
            (true, false) => PatientGroup::DmHld,
            (false, true) => PatientGroup::DmHtn,
            (false, false) => PatientGroup::Dm,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PatientGroup::Dm => "DM",
            PatientGroup::DmHld => "DM_HLD",
            PatientGroup::DmHtn => "DM_HTN",
            PatientGroup::Dhl => "DHL",
        }
    }
}

/// Glycemic control band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HbA1cStatus {
    WellControlled,
    ModeratelyControlled,
    SuboptimalControl,
    PoorControl,
}

impl HbA1cStatus {
    pub fn from_hba1c(hba1c: f64) -> Self {
        if hba1c < 7.0 {
            HbA1cStatus::WellControlled
        } else if hba1c < 8.0 {
            HbA1cStatus::ModeratelyControlled
        } else if hba1c < 9.0 {
            HbA1cStatus::SuboptimalControl
        } else {
            HbA1cStatus::PoorControl
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HbA1cStatus::WellControlled => "Well-controlled",
            HbA1cStatus::ModeratelyControlled => "Moderately controlled",
            HbA1cStatus::SuboptimalControl => "Suboptimal control",
            HbA1cStatus::PoorControl => "Poor control",
        }
    }
}

/// Glycemic control score of a patient by HbA1c
pub fn control_score(hba1c: f64) -> f64 {
    if hba1c <= 6.5 {
        1.0
    } else if hba1c <= 7.0 {
        0.8
    } else if hba1c <= 8.0 {
        0.6
    } else if hba1c <= 9.0 {
        0.4
    } else {
        0.2
    }
}

/// Position of a recommendation in the treatment sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreatmentLine {
    FirstLine,
    SecondLine,
    Alternative,
}

impl TreatmentLine {
    pub fn label(&self) -> &'static str {
        match self {
            TreatmentLine::FirstLine => "First-line",
            TreatmentLine::SecondLine => "Second-line",
            TreatmentLine::Alternative => "Alternative",
        }
    }
}

/// Strength of the evidence behind a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    /// Guideline-backed
    A,
    /// Supported by similar-patient outcomes
    B,
    /// Standard of care without patient evidence
    Guideline,
}

/// Ordered second-line drug preferences for one patient group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondLineRule {
    pub group: PatientGroup,
    pub preferences: &'static [Drug],
}

pub const SECOND_LINE_RULES: [SecondLineRule; 4] = [
    SecondLineRule {
        group: PatientGroup::Dm,
        preferences: &[Drug::Sitagliptin, Drug::Empagliflozin, Drug::Gliclazide],
    },
    SecondLineRule {
        group: PatientGroup::DmHld,
        preferences: &[Drug::Empagliflozin, Drug::Sitagliptin, Drug::Pioglitazone],
    },
    SecondLineRule {
        group: PatientGroup::DmHtn,
        preferences: &[Drug::Empagliflozin, Drug::Dapagliflozin, Drug::Sitagliptin],
    },
    SecondLineRule {
        group: PatientGroup::Dhl,
        preferences: &[Drug::Empagliflozin, Drug::Dapagliflozin],
    },
];

/// Drug promoted ahead of the group preferences above an HbA1c level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityRule {
    pub min_hba1c: f64,
    pub promote: Drug,
}

pub const SEVERE_HYPERGLYCEMIA_RULE: SeverityRule = SeverityRule {
    min_hba1c: SEVERE_HBA1C_THRESHOLD,
    promote: Drug::Insulin,
};

/// Second-line preference order for a patient
pub fn second_line_preferences(group: PatientGroup, hba1c: f64) -> Vec<Drug> {
    let mut preferences: Vec<Drug> = SECOND_LINE_RULES
        .iter()
        .find(|rule| rule.group == group)
        .map(|rule| rule.preferences.to_vec())
        .unwrap_or_default();

    let severe = SEVERE_HYPERGLYCEMIA_RULE;
    if hba1c >= severe.min_hba1c && !preferences.contains(&severe.promote) {
        preferences.insert(0, severe.promote);
    }

    preferences
}

/// Rationale attached to a second-line recommendation
pub fn second_line_rationale(drug: Drug) -> &'static str {
    match drug {
        Drug::Empagliflozin => "SGLT-2 inhibitor with cardiovascular benefits",
        Drug::Dapagliflozin => "SGLT-2 inhibitor with renal and cardiovascular benefits",
        Drug::Sitagliptin => "DPP-4 inhibitor with low hypoglycemia risk",
        Drug::Pioglitazone => "Thiazolidinedione improving insulin sensitivity",
        Drug::Gliclazide => "Sulfonylurea with established efficacy",
        Drug::Insulin => "Required for severe hyperglycemia (HbA1c ≥10%)",
        other => class_rationale(other.class()),
    }
}

fn class_rationale(class: DrugClass) -> &'static str {
    match class {
        DrugClass::Biguanides => FIRST_LINE_RATIONALE,
        DrugClass::Sulfonylureas => "Sulfonylurea with established efficacy",
        DrugClass::Dpp4Inhibitors => "DPP-4 inhibitor with low hypoglycemia risk",
        DrugClass::Sglt2Inhibitors => "SGLT-2 inhibitor with cardiovascular benefits",
        DrugClass::AlphaGlucosidaseInhibitors => "Alpha-glucosidase inhibitor lowering postprandial glucose",
        DrugClass::Thiazolidinediones => "Thiazolidinedione improving insulin sensitivity",
        DrugClass::Glp1Agonists => "GLP-1 receptor agonist with weight and cardiovascular benefits",
        DrugClass::Meglitinides => "Short-acting secretagogue for postprandial control",
        DrugClass::Insulin => "Required for severe hyperglycemia (HbA1c ≥10%)",
    }
}
