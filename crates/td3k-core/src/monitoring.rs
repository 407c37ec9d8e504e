//! Follow-up monitoring plan for the target patient.

use crate::patient::AnalysisSnapshot;
use crate::profile::defaults;
use serde::{Deserialize, Serialize};

/// Blood pressure goal (mmHg), both values exclusive upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressureTarget {
    pub systolic_below: u16,
    pub diastolic_below: u16,
}

/// Testing interval and treatment targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringPlan {
    pub hba1c_test_interval_months: u8,
    /// Target HbA1c is below this value (%)
    pub hba1c_target_below: f64,
    pub blood_pressure: BloodPressureTarget,
    pub glucose_target: String,
    pub lipid_target: String,
}

impl MonitoringPlan {
    pub const GLUCOSE_TARGET: &'static str = "Fasting 80-130 mg/dL, postprandial <180 mg/dL";
    pub const LIPID_TARGET: &'static str = "LDL <100 mg/dL (or <70 mg/dL with high cardiovascular risk)";

    /// Plan derived from the patient's latest snapshot
    pub fn for_snapshot(snapshot: &AnalysisSnapshot) -> Self {
        let hba1c = snapshot.valid_hba1c().unwrap_or(defaults::HBA1C);

        let blood_pressure = if snapshot.has_hypertension {
            BloodPressureTarget {
                systolic_below: 130,
                diastolic_below: 80,
            }
        } else {
            BloodPressureTarget {
                systolic_below: 140,
                diastolic_below: 90,
            }
        };

        MonitoringPlan {
            hba1c_test_interval_months: if hba1c > 8.0 { 3 } else { 6 },
            hba1c_target_below: if hba1c > 9.0 { 8.0 } else { 7.0 },
            blood_pressure,
            glucose_target: Self::GLUCOSE_TARGET.to_string(),
            lipid_target: Self::LIPID_TARGET.to_string(),
        }
    }

    /// Human-readable HbA1c target, e.g. `<7.0%`
    pub fn hba1c_target_label(&self) -> String {
        format!("<{:.1}%", self.hba1c_target_below)
    }
}
