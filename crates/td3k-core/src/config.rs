//! Engine Configuration
//!
//! All tunable parameters of a similarity and recommendation pass. The
//! defaults reproduce the published T-D3K constants; a JSON file can
//! override any subset of them.

use crate::profile::ProfileExtractor;
use crate::trajectory::{TrajectoryEncoder, DEFAULT_NGRAM_SIZE, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerance for the alpha + beta = 1 check
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Invalid engine parameters
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a finite non-negative weight, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("alpha + beta must equal 1.0, got {0}")]
    WeightSum(f64),

    #[error("trajectory threshold must be non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("n-gram size must be at least 1")]
    InvalidNgramSize,

    #[error("minimum score must lie in [0, 1], got {0}")]
    InvalidMinScore(f64),

    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters of the T-D3K pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Weight of the D3K component in the combined score
    pub alpha: f64,
    /// Weight of the trajectory component in the combined score
    pub beta: f64,
    /// Largest HbA1c change still encoded as stable
    pub trajectory_threshold: f64,
    pub ngram_size: usize,
    /// Number of top matches feeding the recommendation
    pub top_k: usize,
    /// Matches must score strictly above this to be used
    pub min_score: f64,
    pub max_recommendations: usize,
    /// Score populations on the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
    /// Year used for age and disease duration; current year when unset
    pub reference_year: Option<i32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            alpha: 0.5,
            beta: 0.5,
            trajectory_threshold: DEFAULT_THRESHOLD,
            ngram_size: DEFAULT_NGRAM_SIZE,
            top_k: 10,
            min_score: 0.1,
            max_recommendations: 10,
            parallel: true,
            reference_year: None,
        }
    }
}

impl EngineConfig {
    /// Set the D3K/trajectory blend; beta becomes `1 - alpha`
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self.beta = 1.0 - alpha;
        self
    }

    pub fn with_trajectory_threshold(mut self, threshold: f64) -> Self {
        self.trajectory_threshold = threshold;
        self
    }

    pub fn with_ngram_size(mut self, n: usize) -> Self {
        self.ngram_size = n;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_max_recommendations(mut self, max: usize) -> Self {
        self.max_recommendations = max;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Check every parameter
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let sum = self.alpha + self.beta;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }
        if !self.trajectory_threshold.is_finite() || self.trajectory_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.trajectory_threshold));
        }
        if self.ngram_size == 0 {
            return Err(ConfigError::InvalidNgramSize);
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::InvalidMinScore(self.min_score));
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroLimit("top_k"));
        }
        if self.max_recommendations == 0 {
            return Err(ConfigError::ZeroLimit("max_recommendations"));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn trajectory_encoder(&self) -> TrajectoryEncoder {
        TrajectoryEncoder::new(self.trajectory_threshold, self.ngram_size)
    }

    pub fn profile_extractor(&self) -> ProfileExtractor {
        match self.reference_year {
            Some(year) => ProfileExtractor::new(year),
            None => ProfileExtractor::current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.ngram_size, 6);
        assert_eq!(config.top_k, 10);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_alpha(0.7)
            .with_ngram_size(3)
            .with_top_k(5)
            .with_reference_year(2024);

        assert!((config.beta - 0.3).abs() < 1e-12);
        assert_eq!(config.ngram_size, 3);
        assert_eq!(config.profile_extractor().reference_year(), 2024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let mut config = EngineConfig::default();
        config.beta = 0.6;
        assert!(matches!(config.validate(), Err(ConfigError::WeightSum(_))));

        let config = EngineConfig::default().with_alpha(-0.2);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeight { name: "alpha", .. })));

        let config = EngineConfig::default().with_trajectory_threshold(-1.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        let config = EngineConfig::default().with_ngram_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNgramSize)));

        let config = EngineConfig::default().with_min_score(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMinScore(_))));

        let config = EngineConfig::default().with_top_k(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLimit("top_k"))));
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = EngineConfig::from_json_str(r#"{"trajectory_threshold": 0.3, "top_k": 20}"#).unwrap();

        assert_eq!(config.trajectory_threshold, 0.3);
        assert_eq!(config.top_k, 20);
        assert_eq!(config.ngram_size, DEFAULT_NGRAM_SIZE);
        assert_eq!(config.trajectory_encoder().threshold(), 0.3);
    }

    #[test]
    fn test_json_validation_and_parse_errors() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"alpha": 0.9}"#),
            Err(ConfigError::WeightSum(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/td3k.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
