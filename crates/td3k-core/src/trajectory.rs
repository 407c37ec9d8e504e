//! HbA1c Trajectory Encoding
//!
//! A patient's chronologically ordered HbA1c readings are reduced to a
//! symbol string, one symbol per consecutive pair:
//!
//! - `N` stable and the earlier reading lies in the normal band
//! - `A` stable outside the normal band
//! - `U` rising by more than the stability threshold
//! - `D` falling by more than the stability threshold
//!
//! Two trajectories are compared by cosine similarity over overlapping
//! n-gram frequencies.
//!
//! # Example
//!
//! ```rust
//! use td3k_core::TrajectoryEncoder;
//!
//! let encoder = TrajectoryEncoder::default();
//! let trajectory = encoder.encode(&[8.5, 7.8, 6.8, 6.9]).unwrap();
//! assert_eq!(trajectory.as_str(), "DDN");
//! ```

use crate::profile::ClinicalRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Change in HbA1c (percentage points) still considered stable
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default n-gram width
pub const DEFAULT_NGRAM_SIZE: usize = 6;

/// Normal HbA1c band (%)
pub const NORMAL_BAND: ClinicalRange = ClinicalRange::new(4.0, 7.0);

/// Score used when either patient has fewer than two dated readings
pub const NEUTRAL_SIMILARITY: f64 = 0.5;

/// One step of an HbA1c trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrajectorySymbol {
    /// Stable, normal
    Normal,
    /// Stable, abnormal
    Abnormal,
    /// Rising
    Up,
    /// Falling
    Down,
}

impl TrajectorySymbol {
    pub fn as_char(&self) -> char {
        match self {
            TrajectorySymbol::Normal => 'N',
            TrajectorySymbol::Abnormal => 'A',
            TrajectorySymbol::Up => 'U',
            TrajectorySymbol::Down => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(TrajectorySymbol::Normal),
            'A' => Some(TrajectorySymbol::Abnormal),
            'U' => Some(TrajectorySymbol::Up),
            'D' => Some(TrajectorySymbol::Down),
            _ => None,
        }
    }
}

/// Encoded trajectory over {N, A, U, D}
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trajectory(String);

impl Trajectory {
    /// Parse a symbol string, rejecting anything outside {N, A, U, D}
    pub fn parse(s: &str) -> Option<Self> {
        if s.chars().all(|c| TrajectorySymbol::from_char(c).is_some()) {
            Some(Trajectory(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = TrajectorySymbol> + '_ {
        self.0.chars().filter_map(TrajectorySymbol::from_char)
    }

    /// Overlapping n-grams of width `n`
    pub fn ngrams(&self, n: usize) -> Vec<&str> {
        ngrams(&self.0, n)
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Overlapping substrings of width `n`
///
/// A non-empty string shorter than `n` is its own single n-gram; an empty
/// string has none. Input must be ASCII.
pub fn ngrams(s: &str, n: usize) -> Vec<&str> {
    let n = n.max(1);
    if s.is_empty() {
        return Vec::new();
    }
    if s.len() < n {
        return vec![s];
    }
    (0..=s.len() - n).map(|i| &s[i..i + n]).collect()
}

/// Cosine similarity between two n-gram multisets
///
/// Returns 0.0 if either side is empty.
pub fn ngram_cosine(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut counts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for gram in a {
        counts.entry(*gram).or_default().0 += 1.0;
    }
    for gram in b {
        counts.entry(*gram).or_default().1 += 1.0;
    }

    let (dot, norm_a, norm_b) = counts
        .values()
        .fold((0.0, 0.0, 0.0), |(dot, na, nb), (ca, cb)| {
            (dot + ca * cb, na + ca * ca, nb + cb * cb)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).min(1.0)
}

/// Encodes HbA1c histories and compares the resulting trajectories
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEncoder {
    threshold: f64,
    ngram_size: usize,
    normal_band: ClinicalRange,
}

impl Default for TrajectoryEncoder {
    fn default() -> Self {
        TrajectoryEncoder {
            threshold: DEFAULT_THRESHOLD,
            ngram_size: DEFAULT_NGRAM_SIZE,
            normal_band: NORMAL_BAND,
        }
    }
}

impl TrajectoryEncoder {
    pub fn new(threshold: f64, ngram_size: usize) -> Self {
        TrajectoryEncoder {
            threshold,
            ngram_size,
            ..Self::default()
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }

    /// Symbol for the step from `from` to `to`
    pub fn classify(&self, from: f64, to: f64) -> TrajectorySymbol {
        let delta = to - from;
        if delta.abs() <= self.threshold {
            if self.normal_band.contains(from) {
                TrajectorySymbol::Normal
            } else {
                TrajectorySymbol::Abnormal
            }
        } else if delta > 0.0 {
            TrajectorySymbol::Up
        } else {
            TrajectorySymbol::Down
        }
    }

    /// Encode chronologically ordered readings; `None` with fewer than two
    pub fn encode(&self, readings: &[f64]) -> Option<Trajectory> {
        if readings.len() < 2 {
            return None;
        }
        let symbols = readings
            .windows(2)
            .map(|pair| self.classify(pair[0], pair[1]).as_char())
            .collect();
        Some(Trajectory(symbols))
    }

    /// N-gram cosine similarity of two trajectories
    pub fn similarity(&self, a: &Trajectory, b: &Trajectory) -> f64 {
        ngram_cosine(&a.ngrams(self.ngram_size), &b.ngrams(self.ngram_size))
    }

    /// Compare two reading histories, falling back to the neutral score
    /// when either cannot be encoded
    pub fn compare_histories(&self, a: &[f64], b: &[f64]) -> f64 {
        match (self.encode(a), self.encode(b)) {
            (Some(ta), Some(tb)) => self.similarity(&ta, &tb),
            _ => NEUTRAL_SIMILARITY,
        }
    }
}
