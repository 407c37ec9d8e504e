//! D3K Similarity
//!
//! Weighted Euclidean distance between two clinical profiles, mapped into
//! (0, 1] via `exp(-distance)`. Identical profiles score exactly 1.0.

use crate::profile::{ClinicalProfile, FEATURE_WEIGHTS};
use crate::{Result, Td3kError};

/// Weighted Euclidean distance: `sqrt(sum(w * (a - b)^2))`
pub fn weighted_distance(a: &[f64], b: &[f64], weights: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Td3kError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if weights.len() != a.len() {
        return Err(Td3kError::DimensionMismatch {
            expected: weights.len(),
            got: a.len(),
        });
    }

    let squared: f64 = a
        .iter()
        .zip(b)
        .zip(weights)
        .map(|((x, y), w)| w * (x - y).powi(2))
        .sum();

    Ok(squared.sqrt())
}

/// Similarity in (0, 1] that decreases monotonically with distance
pub fn d3k_similarity(a: &[f64], b: &[f64], weights: &[f64]) -> Result<f64> {
    Ok((-weighted_distance(a, b, weights)?).exp())
}

/// D3K calculator over a fixed feature weight table
#[derive(Debug, Clone, PartialEq)]
pub struct D3kCalculator {
    weights: Vec<f64>,
}

impl Default for D3kCalculator {
    fn default() -> Self {
        D3kCalculator {
            weights: FEATURE_WEIGHTS.to_vec(),
        }
    }
}

impl D3kCalculator {
    /// Calculator with custom weights, rejecting negative or non-finite values
    pub fn with_weights(weights: Vec<f64>) -> Option<Self> {
        if weights.iter().all(|w| w.is_finite() && *w >= 0.0) {
            Some(D3kCalculator { weights })
        } else {
            None
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn distance(&self, a: &ClinicalProfile, b: &ClinicalProfile) -> Result<f64> {
        weighted_distance(a.as_slice(), b.as_slice(), &self.weights)
    }

    pub fn similarity(&self, a: &ClinicalProfile, b: &ClinicalProfile) -> Result<f64> {
        d3k_similarity(a.as_slice(), b.as_slice(), &self.weights)
    }
}
