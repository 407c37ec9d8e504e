//! Patient Records
//!
//! Read-only input to every computation pass: demographics, dated lab
//! panels and the current medication set.

use crate::drugs::{Drug, Intensity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Patient identifier
pub type PatientId = String;

/// Biological sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Numeric encoding used by the clinical profile (male = 1)
    pub fn encode(&self) -> f64 {
        match self {
            Sex::Male => 1.0,
            Sex::Female => 0.0,
        }
    }
}

/// A dated laboratory panel
///
/// Lipids are expected in mmol/L; values above 10 are read as mg/dL and
/// converted when the profile is extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSnapshot {
    pub date: Option<NaiveDate>,
    pub systolic_pressure: Option<f64>,
    pub diastolic_pressure: Option<f64>,
    pub cholesterol_hdl: Option<f64>,
    pub cholesterol_ldl: Option<f64>,
    pub triglycerides: Option<f64>,
    /// Glycated hemoglobin (%)
    pub hba1c: Option<f64>,
    pub has_hyperlipidemia: bool,
    pub has_hypertension: bool,
    /// Years since diagnosis as recorded on the panel
    pub disease_duration: Option<f64>,
}

impl AnalysisSnapshot {
    /// Empty snapshot taken on `date`
    pub fn on(date: NaiveDate) -> Self {
        AnalysisSnapshot {
            date: Some(date),
            ..AnalysisSnapshot::default()
        }
    }

    pub fn with_hba1c(mut self, hba1c: f64) -> Self {
        self.hba1c = Some(hba1c);
        self
    }

    pub fn with_blood_pressure(mut self, systolic: f64, diastolic: f64) -> Self {
        self.systolic_pressure = Some(systolic);
        self.diastolic_pressure = Some(diastolic);
        self
    }

    pub fn with_lipids(mut self, hdl: f64, ldl: f64, triglycerides: f64) -> Self {
        self.cholesterol_hdl = Some(hdl);
        self.cholesterol_ldl = Some(ldl);
        self.triglycerides = Some(triglycerides);
        self
    }

    pub fn with_comorbidities(mut self, hyperlipidemia: bool, hypertension: bool) -> Self {
        self.has_hyperlipidemia = hyperlipidemia;
        self.has_hypertension = hypertension;
        self
    }

    pub fn with_disease_duration(mut self, years: f64) -> Self {
        self.disease_duration = Some(years);
        self
    }

    /// Recorded HbA1c, ignoring non-positive placeholders
    pub fn valid_hba1c(&self) -> Option<f64> {
        self.hba1c.filter(|v| v.is_finite() && *v > 0.0)
    }
}

/// Per-drug medication record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub prescribed: bool,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub dosage_mg: Option<f64>,
}

impl MedicationEntry {
    pub fn prescribed(intensity: Intensity) -> Self {
        MedicationEntry {
            prescribed: true,
            intensity: Some(intensity),
            dosage_mg: None,
        }
    }
}

/// A drug a patient is actually taking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrescribedDrug {
    pub drug: Drug,
    pub intensity: Intensity,
}

impl PrescribedDrug {
    pub fn new(drug: Drug, intensity: Intensity) -> Self {
        PrescribedDrug { drug, intensity }
    }
}

/// A patient's medications keyed by drug
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicationSet(BTreeMap<Drug, MedicationEntry>);

impl MedicationSet {
    pub fn new() -> Self {
        MedicationSet::default()
    }

    /// Add a prescribed drug at the given intensity
    pub fn with(mut self, drug: Drug, intensity: Intensity) -> Self {
        self.0.insert(drug, MedicationEntry::prescribed(intensity));
        self
    }

    pub fn insert(&mut self, drug: Drug, entry: MedicationEntry) {
        self.0.insert(drug, entry);
    }

    pub fn get(&self, drug: Drug) -> Option<&MedicationEntry> {
        self.0.get(&drug)
    }

    /// Prescribed drugs; unrecorded intensity reads as M
    pub fn prescribed(&self) -> impl Iterator<Item = PrescribedDrug> + '_ {
        self.0
            .iter()
            .filter(|(_, entry)| entry.prescribed)
            .map(|(drug, entry)| PrescribedDrug::new(*drug, entry.intensity.unwrap_or_default()))
    }

    pub fn prescribed_count(&self) -> usize {
        self.prescribed().count()
    }

    pub fn is_prescribed(&self, drug: Drug) -> bool {
        self.0.get(&drug).map(|e| e.prescribed).unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Demographics, lab history and medications of one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub birth_year: i32,
    pub sex: Sex,
    #[serde(default)]
    pub diagnosis_year: Option<i32>,
    #[serde(default)]
    pub analyses: Vec<AnalysisSnapshot>,
    #[serde(default)]
    pub medications: MedicationSet,
}

impl PatientRecord {
    pub fn new(id: impl Into<PatientId>, birth_year: i32, sex: Sex) -> Self {
        PatientRecord {
            id: id.into(),
            birth_year,
            sex,
            diagnosis_year: None,
            analyses: Vec::new(),
            medications: MedicationSet::default(),
        }
    }

    pub fn with_diagnosis_year(mut self, year: i32) -> Self {
        self.diagnosis_year = Some(year);
        self
    }

    pub fn with_analysis(mut self, snapshot: AnalysisSnapshot) -> Self {
        self.analyses.push(snapshot);
        self
    }

    pub fn with_medications(mut self, medications: MedicationSet) -> Self {
        self.medications = medications;
        self
    }

    pub fn has_analysis(&self) -> bool {
        !self.analyses.is_empty()
    }

    /// Most recent snapshot
    ///
    /// The snapshot with the greatest date wins. Undated snapshots only
    /// count when no snapshot carries a date, in which case the last one
    /// stored is used.
    pub fn latest_analysis(&self) -> Option<&AnalysisSnapshot> {
        self.analyses
            .iter()
            .filter(|s| s.date.is_some())
            .max_by_key(|s| s.date)
            .or_else(|| self.analyses.last())
    }

    /// Dated HbA1c readings in chronological order
    pub fn hba1c_history(&self) -> Vec<f64> {
        let mut readings: Vec<(NaiveDate, f64)> = self
            .analyses
            .iter()
            .filter_map(|s| Some((s.date?, s.valid_hba1c()?)))
            .collect();
        readings.sort_by_key(|(date, _)| *date);
        readings.into_iter().map(|(_, v)| v).collect()
    }
}
