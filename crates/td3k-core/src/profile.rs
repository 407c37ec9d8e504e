//! Clinical Profile Extraction
//!
//! Converts a patient record and its latest lab panel into a fixed-length
//! feature vector, each value min-max normalized into [0, 1] against a
//! clinical range table.

use crate::patient::{AnalysisSnapshot, PatientRecord, Sex};
use crate::{Result, Td3kError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Number of features in a clinical profile
pub const PROFILE_LEN: usize = 12;

/// Prescribed-drug count that maps to 1.0
pub const MEDICATION_COUNT_CAP: f64 = 6.0;

/// mg/dL to mmol/L for HDL/LDL cholesterol
pub const CHOLESTEROL_MG_DL_TO_MMOL: f64 = 0.02586;

/// mg/dL to mmol/L for triglycerides
pub const TRIGLYCERIDES_MG_DL_TO_MMOL: f64 = 0.01129;

/// Lipid readings above this are taken to be in mg/dL
const LIPID_UNIT_CUTOFF: f64 = 10.0;

/// Inclusive clinical range used for min-max scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRange {
    pub min: f64,
    pub max: f64,
}

impl ClinicalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ClinicalRange { min, max }
    }

    /// Scale into [0, 1], clamping out-of-range values
    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Clinical range table
pub mod ranges {
    use super::ClinicalRange;

    pub const AGE: ClinicalRange = ClinicalRange::new(21.0, 100.0);
    pub const SYSTOLIC_PRESSURE: ClinicalRange = ClinicalRange::new(80.0, 250.0);
    pub const DIASTOLIC_PRESSURE: ClinicalRange = ClinicalRange::new(50.0, 150.0);
    pub const CHOLESTEROL_HDL: ClinicalRange = ClinicalRange::new(0.5, 3.0);
    pub const CHOLESTEROL_LDL: ClinicalRange = ClinicalRange::new(1.0, 5.0);
    pub const TRIGLYCERIDES: ClinicalRange = ClinicalRange::new(0.5, 10.0);
    pub const HBA1C: ClinicalRange = ClinicalRange::new(4.0, 15.0);
    pub const DISEASE_DURATION: ClinicalRange = ClinicalRange::new(0.0, 30.0);
}

/// Values substituted for missing lab fields
pub mod defaults {
    pub const SYSTOLIC_PRESSURE: f64 = 130.0;
    pub const DIASTOLIC_PRESSURE: f64 = 80.0;
    pub const CHOLESTEROL_HDL: f64 = 1.2;
    pub const CHOLESTEROL_LDL: f64 = 2.6;
    pub const TRIGLYCERIDES: f64 = 1.7;
    pub const HBA1C: f64 = 7.0;
    pub const DISEASE_DURATION: f64 = 5.0;
}

/// Feature weights, in profile order
pub const FEATURE_WEIGHTS: [f64; PROFILE_LEN] = [
    0.0821, // age
    0.0543, // sex
    0.1187, // systolic pressure
    0.0976, // diastolic pressure
    0.1045, // HDL
    0.1034, // LDL
    0.0812, // triglycerides
    0.2456, // HbA1c
    0.0634, // hyperlipidemia
    0.0587, // hypertension
    0.1134, // disease duration
    0.0771, // medication count
];

/// A clinical profile feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Age,
    Sex,
    SystolicPressure,
    DiastolicPressure,
    CholesterolHdl,
    CholesterolLdl,
    Triglycerides,
    Hba1c,
    Hyperlipidemia,
    Hypertension,
    DiseaseDuration,
    MedicationCount,
}

impl Feature {
    /// Features in vector order
    pub const ALL: [Feature; PROFILE_LEN] = [
        Feature::Age,
        Feature::Sex,
        Feature::SystolicPressure,
        Feature::DiastolicPressure,
        Feature::CholesterolHdl,
        Feature::CholesterolLdl,
        Feature::Triglycerides,
        Feature::Hba1c,
        Feature::Hyperlipidemia,
        Feature::Hypertension,
        Feature::DiseaseDuration,
        Feature::MedicationCount,
    ];

    /// Position in the profile vector
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn weight(&self) -> f64 {
        FEATURE_WEIGHTS[self.index()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Age => "age",
            Feature::Sex => "sex",
            Feature::SystolicPressure => "systolic_pressure",
            Feature::DiastolicPressure => "diastolic_pressure",
            Feature::CholesterolHdl => "cholesterol_hdl",
            Feature::CholesterolLdl => "cholesterol_ldl",
            Feature::Triglycerides => "triglycerides",
            Feature::Hba1c => "hba1c",
            Feature::Hyperlipidemia => "hyperlipidemia",
            Feature::Hypertension => "hypertension",
            Feature::DiseaseDuration => "disease_duration",
            Feature::MedicationCount => "medication_count",
        }
    }

    /// Range for continuous features; binary features have none
    pub fn range(&self) -> Option<ClinicalRange> {
        match self {
            Feature::Age => Some(ranges::AGE),
            Feature::SystolicPressure => Some(ranges::SYSTOLIC_PRESSURE),
            Feature::DiastolicPressure => Some(ranges::DIASTOLIC_PRESSURE),
            Feature::CholesterolHdl => Some(ranges::CHOLESTEROL_HDL),
            Feature::CholesterolLdl => Some(ranges::CHOLESTEROL_LDL),
            Feature::Triglycerides => Some(ranges::TRIGLYCERIDES),
            Feature::Hba1c => Some(ranges::HBA1C),
            Feature::DiseaseDuration => Some(ranges::DISEASE_DURATION),
            Feature::MedicationCount => Some(ClinicalRange::new(0.0, MEDICATION_COUNT_CAP)),
            Feature::Sex | Feature::Hyperlipidemia | Feature::Hypertension => None,
        }
    }
}

/// Min-max normalize `value` into [0, 1]
///
/// A degenerate range (max == min) maps every value to 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn lipid_mmol(value: Option<f64>, mg_dl_factor: f64, default: f64) -> f64 {
    match present(value) {
        Some(v) if v > LIPID_UNIT_CUTOFF => v * mg_dl_factor,
        Some(v) => v,
        None => default,
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

/// Normalized 12-feature clinical vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalProfile {
    values: Vec<f64>,
}

impl ClinicalProfile {
    /// Wrap already-normalized values
    pub fn from_values(values: Vec<f64>) -> Self {
        ClinicalProfile { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a single feature
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values.get(feature.index()).copied()
    }
}

/// Raw clinical values of a matched patient, reported alongside its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalDetails {
    pub age: i32,
    pub sex: Sex,
    pub systolic_pressure: Option<f64>,
    pub diastolic_pressure: Option<f64>,
    pub cholesterol_hdl: Option<f64>,
    pub cholesterol_ldl: Option<f64>,
    pub triglycerides: Option<f64>,
    pub hba1c: Option<f64>,
    pub has_hyperlipidemia: bool,
    pub has_hypertension: bool,
    pub disease_duration: Option<f64>,
}

impl ClinicalDetails {
    pub fn new(patient: &PatientRecord, snapshot: &AnalysisSnapshot, reference_year: i32) -> Self {
        ClinicalDetails {
            age: reference_year - patient.birth_year,
            sex: patient.sex,
            systolic_pressure: snapshot.systolic_pressure,
            diastolic_pressure: snapshot.diastolic_pressure,
            cholesterol_hdl: snapshot.cholesterol_hdl,
            cholesterol_ldl: snapshot.cholesterol_ldl,
            triglycerides: snapshot.triglycerides,
            hba1c: snapshot.valid_hba1c(),
            has_hyperlipidemia: snapshot.has_hyperlipidemia,
            has_hypertension: snapshot.has_hypertension,
            disease_duration: snapshot.disease_duration,
        }
    }
}

/// Builds clinical profiles relative to a reference year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileExtractor {
    reference_year: i32,
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self::current()
    }
}

impl ProfileExtractor {
    pub fn new(reference_year: i32) -> Self {
        ProfileExtractor { reference_year }
    }

    /// Extractor anchored to the current calendar year
    pub fn current() -> Self {
        Self::new(chrono::Utc::now().year())
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Profile from the patient's latest snapshot
    pub fn extract(&self, patient: &PatientRecord) -> Result<ClinicalProfile> {
        let snapshot = patient
            .latest_analysis()
            .ok_or_else(|| Td3kError::MissingAnalysisData(patient.id.clone()))?;
        Ok(self.extract_with(patient, snapshot))
    }

    /// Profile from an explicit snapshot
    pub fn extract_with(&self, patient: &PatientRecord, snapshot: &AnalysisSnapshot) -> ClinicalProfile {
        let age = f64::from(self.reference_year - patient.birth_year);

        let systolic = present(snapshot.systolic_pressure).unwrap_or(defaults::SYSTOLIC_PRESSURE);
        let diastolic = present(snapshot.diastolic_pressure).unwrap_or(defaults::DIASTOLIC_PRESSURE);
        let hdl = lipid_mmol(snapshot.cholesterol_hdl, CHOLESTEROL_MG_DL_TO_MMOL, defaults::CHOLESTEROL_HDL);
        let ldl = lipid_mmol(snapshot.cholesterol_ldl, CHOLESTEROL_MG_DL_TO_MMOL, defaults::CHOLESTEROL_LDL);
        let triglycerides = lipid_mmol(
            snapshot.triglycerides,
            TRIGLYCERIDES_MG_DL_TO_MMOL,
            defaults::TRIGLYCERIDES,
        );
        let hba1c = snapshot.valid_hba1c().unwrap_or(defaults::HBA1C);
        let duration = self.disease_duration(patient, snapshot);
        let medication_count = patient.medications.prescribed_count() as f64;

        let values = vec![
            ranges::AGE.normalize(age),
            patient.sex.encode(),
            ranges::SYSTOLIC_PRESSURE.normalize(systolic),
            ranges::DIASTOLIC_PRESSURE.normalize(diastolic),
            ranges::CHOLESTEROL_HDL.normalize(hdl),
            ranges::CHOLESTEROL_LDL.normalize(ldl),
            ranges::TRIGLYCERIDES.normalize(triglycerides),
            ranges::HBA1C.normalize(hba1c),
            flag(snapshot.has_hyperlipidemia),
            flag(snapshot.has_hypertension),
            ranges::DISEASE_DURATION.normalize(duration),
            normalize(medication_count, 0.0, MEDICATION_COUNT_CAP),
        ];

        ClinicalProfile::from_values(values)
    }

    fn disease_duration(&self, patient: &PatientRecord, snapshot: &AnalysisSnapshot) -> f64 {
        snapshot
            .disease_duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .or_else(|| {
                patient
                    .diagnosis_year
                    .map(|year| f64::from(self.reference_year - year))
            })
            .unwrap_or(defaults::DISEASE_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drugs::{Drug, Intensity};
    use crate::patient::MedicationSet;

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(21.0, 21.0, 100.0), 0.0);
        assert_eq!(normalize(100.0, 21.0, 100.0), 1.0);
        assert_eq!(normalize(250.0, 21.0, 100.0), 1.0);
        assert_eq!(normalize(-3.0, 0.0, 30.0), 0.0);
        assert_eq!(normalize(42.0, 5.0, 5.0), 0.5);
    }

    #[test]
    fn test_weights_cover_every_feature() {
        assert_eq!(FEATURE_WEIGHTS.len(), Feature::ALL.len());
        assert!(FEATURE_WEIGHTS.iter().all(|w| *w >= 0.0));
        assert_eq!(Feature::Hba1c.weight(), 0.2456);
        assert_eq!(Feature::MedicationCount.index(), PROFILE_LEN - 1);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let extractor = ProfileExtractor::new(2024);
        let patient = PatientRecord::new("p", 1964, Sex::Female)
            .with_analysis(AnalysisSnapshot::default());

        let profile = extractor.extract(&patient).unwrap();

        assert_eq!(profile.len(), PROFILE_LEN);
        assert!((profile.get(Feature::Age).unwrap() - 39.0 / 79.0).abs() < 1e-12);
        assert_eq!(profile.get(Feature::Sex), Some(0.0));
        assert!((profile.get(Feature::SystolicPressure).unwrap() - 50.0 / 170.0).abs() < 1e-12);
        assert!((profile.get(Feature::Hba1c).unwrap() - 3.0 / 11.0).abs() < 1e-12);
        assert!((profile.get(Feature::DiseaseDuration).unwrap() - 5.0 / 30.0).abs() < 1e-12);
        assert_eq!(profile.get(Feature::MedicationCount), Some(0.0));
    }

    #[test]
    fn test_lipids_in_mg_dl_are_converted() {
        let extractor = ProfileExtractor::new(2024);
        let mmol = PatientRecord::new("a", 1970, Sex::Male)
            .with_analysis(AnalysisSnapshot::default().with_lipids(1.0, 3.0, 2.0));
        let mg_dl = PatientRecord::new("b", 1970, Sex::Male).with_analysis(
            AnalysisSnapshot::default().with_lipids(
                1.0 / CHOLESTEROL_MG_DL_TO_MMOL,
                3.0 / CHOLESTEROL_MG_DL_TO_MMOL,
                2.0 / TRIGLYCERIDES_MG_DL_TO_MMOL,
            ),
        );

        let a = extractor.extract(&mmol).unwrap();
        let b = extractor.extract(&mg_dl).unwrap();

        for feature in [Feature::CholesterolHdl, Feature::CholesterolLdl, Feature::Triglycerides] {
            let diff = a.get(feature).unwrap() - b.get(feature).unwrap();
            assert!(diff.abs() < 1e-9, "{}", feature.name());
        }
    }

    #[test]
    fn test_duration_from_diagnosis_year() {
        let extractor = ProfileExtractor::new(2024);
        let patient = PatientRecord::new("p", 1960, Sex::Male)
            .with_diagnosis_year(2012)
            .with_analysis(AnalysisSnapshot::default());

        let profile = extractor.extract(&patient).unwrap();
        assert!((profile.get(Feature::DiseaseDuration).unwrap() - 12.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_medication_count_capped() {
        let extractor = ProfileExtractor::new(2024);
        let meds = Drug::ALL
            .iter()
            .fold(MedicationSet::new(), |set, drug| set.with(*drug, Intensity::M));
        let patient = PatientRecord::new("p", 1960, Sex::Male)
            .with_medications(meds)
            .with_analysis(AnalysisSnapshot::default());

        let profile = extractor.extract(&patient).unwrap();
        assert_eq!(profile.get(Feature::MedicationCount), Some(1.0));
    }

    #[test]
    fn test_missing_analysis_is_error() {
        let extractor = ProfileExtractor::new(2024);
        let patient = PatientRecord::new("empty", 1960, Sex::Male);

        assert!(matches!(
            extractor.extract(&patient),
            Err(Td3kError::MissingAnalysisData(id)) if id == "empty"
        ));
    }

    #[test]
    fn test_comorbidity_flags() {
        let extractor = ProfileExtractor::new(2024);
        let patient = PatientRecord::new("p", 1960, Sex::Male)
            .with_analysis(AnalysisSnapshot::default().with_comorbidities(true, false));

        let profile = extractor.extract(&patient).unwrap();
        assert_eq!(profile.get(Feature::Hyperlipidemia), Some(1.0));
        assert_eq!(profile.get(Feature::Hypertension), Some(0.0));
    }
}
