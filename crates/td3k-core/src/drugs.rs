//! Antidiabetic Drug Taxonomy
//!
//! The closed set of medications the engine recognizes, their therapeutic
//! class, maximum daily dose and L/M/H intensity tiers. Insulin is tracked
//! as a binary variable and has no tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognized antidiabetic medication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drug {
    Metformin,
    Gliclazide,
    Glipizide,
    Tolbutamide,
    Sitagliptin,
    Vildagliptin,
    Linagliptin,
    Saxagliptin,
    Empagliflozin,
    Dapagliflozin,
    Canagliflozin,
    Acarbose,
    Pioglitazone,
    Rosiglitazone,
    Exenatide,
    Liraglutide,
    Repaglinide,
    Nateglinide,
    Insulin,
}

/// Therapeutic class of a drug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrugClass {
    Biguanides,
    Sulfonylureas,
    Dpp4Inhibitors,
    Sglt2Inhibitors,
    AlphaGlucosidaseInhibitors,
    Thiazolidinediones,
    Glp1Agonists,
    Meglitinides,
    Insulin,
}

impl DrugClass {
    /// Human-readable class name
    pub fn label(&self) -> &'static str {
        match self {
            DrugClass::Biguanides => "Biguanides",
            DrugClass::Sulfonylureas => "Sulfonylureas",
            DrugClass::Dpp4Inhibitors => "DPP-4 Inhibitors",
            DrugClass::Sglt2Inhibitors => "SGLT-2 Inhibitors",
            DrugClass::AlphaGlucosidaseInhibitors => "Alpha-glucosidase Inhibitors",
            DrugClass::Thiazolidinediones => "Thiazolidinediones",
            DrugClass::Glp1Agonists => "GLP-1 Agonists",
            DrugClass::Meglitinides => "Meglitinides",
            DrugClass::Insulin => "Insulin",
        }
    }
}

/// Dosing intensity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Intensity {
    #[serde(alias = "low")]
    L,
    #[default]
    #[serde(alias = "medium")]
    M,
    #[serde(alias = "high")]
    H,
}

impl Intensity {
    pub fn label(&self) -> &'static str {
        match self {
            Intensity::L => "L",
            Intensity::M => "M",
            Intensity::H => "H",
        }
    }
}

/// How a drug is dosed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dosing {
    /// Daily dose in mg for each intensity tier
    Tiered {
        max_daily_mg: f64,
        low: f64,
        medium: f64,
        high: f64,
    },
    /// Prescribed or not; no tiers
    Binary,
}

/// Concrete dosage attached to a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dosage {
    Milligrams(f64),
    Binary,
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dosage::Milligrams(mg) => write!(f, "{mg} mg"),
            Dosage::Binary => write!(f, "Binary"),
        }
    }
}

const fn tiered(max_daily_mg: f64, low: f64, medium: f64, high: f64) -> Dosing {
    Dosing::Tiered {
        max_daily_mg,
        low,
        medium,
        high,
    }
}

impl Drug {
    /// Every recognized drug, grouped by class
    pub const ALL: [Drug; 19] = [
        Drug::Metformin,
        Drug::Gliclazide,
        Drug::Glipizide,
        Drug::Tolbutamide,
        Drug::Sitagliptin,
        Drug::Vildagliptin,
        Drug::Linagliptin,
        Drug::Saxagliptin,
        Drug::Empagliflozin,
        Drug::Dapagliflozin,
        Drug::Canagliflozin,
        Drug::Acarbose,
        Drug::Pioglitazone,
        Drug::Rosiglitazone,
        Drug::Exenatide,
        Drug::Liraglutide,
        Drug::Repaglinide,
        Drug::Nateglinide,
        Drug::Insulin,
    ];

    /// Lower-case drug name as stored in patient records
    pub fn name(&self) -> &'static str {
        match self {
            Drug::Metformin => "metformin",
            Drug::Gliclazide => "gliclazide",
            Drug::Glipizide => "glipizide",
            Drug::Tolbutamide => "tolbutamide",
            Drug::Sitagliptin => "sitagliptin",
            Drug::Vildagliptin => "vildagliptin",
            Drug::Linagliptin => "linagliptin",
            Drug::Saxagliptin => "saxagliptin",
            Drug::Empagliflozin => "empagliflozin",
            Drug::Dapagliflozin => "dapagliflozin",
            Drug::Canagliflozin => "canagliflozin",
            Drug::Acarbose => "acarbose",
            Drug::Pioglitazone => "pioglitazone",
            Drug::Rosiglitazone => "rosiglitazone",
            Drug::Exenatide => "exenatide",
            Drug::Liraglutide => "liraglutide",
            Drug::Repaglinide => "repaglinide",
            Drug::Nateglinide => "nateglinide",
            Drug::Insulin => "insulin",
        }
    }

    pub fn class(&self) -> DrugClass {
        match self {
            Drug::Metformin => DrugClass::Biguanides,
            Drug::Gliclazide | Drug::Glipizide | Drug::Tolbutamide => DrugClass::Sulfonylureas,
            Drug::Sitagliptin | Drug::Vildagliptin | Drug::Linagliptin | Drug::Saxagliptin => {
                DrugClass::Dpp4Inhibitors
            }
            Drug::Empagliflozin | Drug::Dapagliflozin | Drug::Canagliflozin => {
                DrugClass::Sglt2Inhibitors
            }
            Drug::Acarbose => DrugClass::AlphaGlucosidaseInhibitors,
            Drug::Pioglitazone | Drug::Rosiglitazone => DrugClass::Thiazolidinediones,
            Drug::Exenatide | Drug::Liraglutide => DrugClass::Glp1Agonists,
            Drug::Repaglinide | Drug::Nateglinide => DrugClass::Meglitinides,
            Drug::Insulin => DrugClass::Insulin,
        }
    }

    /// Maximum daily dose and intensity tiers (mg)
    pub fn dosing(&self) -> Dosing {
        match self {
            Drug::Metformin => tiered(3000.0, 1000.0, 2000.0, 3000.0),
            Drug::Gliclazide => tiered(320.0, 107.0, 213.0, 320.0),
            Drug::Glipizide => tiered(30.0, 10.0, 20.0, 30.0),
            Drug::Tolbutamide => tiered(3000.0, 1000.0, 2000.0, 3000.0),
            Drug::Sitagliptin => tiered(100.0, 33.0, 67.0, 100.0),
            Drug::Vildagliptin => tiered(100.0, 33.0, 67.0, 100.0),
            Drug::Linagliptin => tiered(5.0, 5.0, 5.0, 5.0),
            Drug::Saxagliptin => tiered(5.0, 2.5, 5.0, 5.0),
            Drug::Empagliflozin => tiered(25.0, 8.0, 17.0, 25.0),
            Drug::Dapagliflozin => tiered(10.0, 3.0, 7.0, 10.0),
            Drug::Canagliflozin => tiered(300.0, 100.0, 200.0, 300.0),
            Drug::Acarbose => tiered(300.0, 100.0, 200.0, 300.0),
            Drug::Pioglitazone => tiered(45.0, 15.0, 30.0, 45.0),
            Drug::Rosiglitazone => tiered(8.0, 3.0, 6.0, 8.0),
            Drug::Exenatide => tiered(20.0, 5.0, 10.0, 20.0),
            Drug::Liraglutide => tiered(1.8, 0.6, 1.2, 1.8),
            Drug::Repaglinide => tiered(16.0, 4.0, 8.0, 16.0),
            Drug::Nateglinide => tiered(540.0, 180.0, 360.0, 540.0),
            Drug::Insulin => Dosing::Binary,
        }
    }

    /// Dosage for a given intensity tier
    pub fn dosage(&self, intensity: Intensity) -> Dosage {
        match self.dosing() {
            Dosing::Tiered {
                low, medium, high, ..
            } => Dosage::Milligrams(match intensity {
                Intensity::L => low,
                Intensity::M => medium,
                Intensity::H => high,
            }),
            Dosing::Binary => Dosage::Binary,
        }
    }

    /// Maximum daily dose in mg, `None` for binary drugs
    pub fn max_daily_mg(&self) -> Option<f64> {
        match self.dosing() {
            Dosing::Tiered { max_daily_mg, .. } => Some(max_daily_mg),
            Dosing::Binary => None,
        }
    }
}

impl fmt::Display for Drug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized medication name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown drug: {0}")]
pub struct UnknownDrug(pub String);

impl FromStr for Drug {
    type Err = UnknownDrug;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Drug::ALL
            .iter()
            .copied()
            .find(|drug| drug.name() == needle)
            .ok_or_else(|| UnknownDrug(s.to_string()))
    }
}
