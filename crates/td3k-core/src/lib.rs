//! T-D3K Core - Patient Similarity & Medication Recommendation
//!
//! Pure Rust implementation of the T-D3K method (Trajectory + Data-driven
//! Domain Knowledge) for type 2 diabetes: previously recorded patients are
//! ranked by clinical and glycemic-trajectory similarity to a target
//! patient, and the medications of the closest matches are turned into
//! guideline-adjusted recommendations.
//!
//! # Features
//!
//! - 12-feature normalized clinical profiles with a fixed clinical range table
//! - Weighted-distance (D3K) similarity with hand-specified feature weights
//! - HbA1c trajectory encoding (N/A/U/D) compared via n-gram cosine similarity
//! - Medication aggregation and ADA/EASD guideline reordering
//! - Offline evaluation metrics (hit ratio, recall, precision, MRR)
//!
//! # Example
//!
//! ```rust
//! use td3k_core::{
//!     AnalysisSnapshot, EngineConfig, InMemoryRepository, PatientRecord, Sex, Td3kEngine,
//! };
//!
//! let snapshot = AnalysisSnapshot {
//!     hba1c: Some(7.2),
//!     disease_duration: Some(5.0),
//!     ..AnalysisSnapshot::default()
//! };
//!
//! let mut repo = InMemoryRepository::new();
//! repo.insert(PatientRecord::new("target", 1970, Sex::Male).with_analysis(snapshot.clone()));
//! repo.insert(PatientRecord::new("match", 1970, Sex::Male).with_analysis(snapshot));
//!
//! let config = EngineConfig::default().with_reference_year(2024);
//! let engine = Td3kEngine::new(repo, config).unwrap();
//!
//! let results = engine.compute_similarity("target").unwrap();
//! assert_eq!(results[0].patient_id, "match");
//! assert!((results[0].d3k - 1.0).abs() < 1e-9);
//! ```

pub mod aggregate;
pub mod config;
pub mod d3k;
pub mod drugs;
pub mod engine;
pub mod evaluation;
pub mod guidelines;
pub mod monitoring;
pub mod patient;
pub mod profile;
pub mod recommend;
pub mod repository;
pub mod similarity;
pub mod trajectory;

// Re-export commonly used types for convenience
pub use aggregate::{aggregate_candidates, medication_usage, MedicationCandidate, MedicationUsage};
pub use config::{ConfigError, EngineConfig};
pub use d3k::D3kCalculator;
pub use drugs::{Dosage, Drug, DrugClass, Intensity};
pub use engine::Td3kEngine;
pub use evaluation::{evaluate, EvaluationMetrics, EvaluationSummary, HoldOutEvaluator, HoldOutOutcome};
pub use guidelines::{EvidenceLevel, HbA1cStatus, PatientGroup, TreatmentLine};
pub use monitoring::MonitoringPlan;
pub use patient::{AnalysisSnapshot, MedicationEntry, MedicationSet, PatientId, PatientRecord, PrescribedDrug, Sex};
pub use profile::{ClinicalDetails, ClinicalProfile, Feature, ProfileExtractor};
pub use recommend::{Recommendation, RecommendationRanker, RecommendationReport};
pub use repository::{InMemoryRepository, PatientRepository, RepositoryError};
pub use similarity::{SimilarityRanker, SimilarityResult, SimilarityStats};
pub use trajectory::{Trajectory, TrajectoryEncoder, TrajectorySymbol};

/// Methodology label attached to every recommendation report
pub const METHODOLOGY: &str = "T-D3K Algorithm (Trajectory + Data-driven Domain Knowledge)";

/// Errors produced by the similarity and recommendation pipeline
#[derive(Debug, thiserror::Error)]
pub enum Td3kError {
    #[error("patient not found: {0}")]
    PatientNotFound(PatientId),

    #[error("patient {0} has no analysis data to compare against")]
    NoComparisonData(PatientId),

    #[error("patient {0} has no analysis snapshot")]
    MissingAnalysisData(PatientId),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Td3kError>;
