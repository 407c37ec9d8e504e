//! Property-based tests for the similarity measures
//!
//! Verifies range, symmetry and determinism guarantees over randomly
//! generated profiles, trajectories and patients.

use proptest::prelude::*;
use td3k_core::d3k::d3k_similarity;
use td3k_core::profile::{normalize, ClinicalProfile, FEATURE_WEIGHTS, PROFILE_LEN};
use td3k_core::similarity::sort_by_score;
use td3k_core::trajectory::{ngram_cosine, ngrams};
use td3k_core::{
    AnalysisSnapshot, D3kCalculator, EngineConfig, PatientRecord, ProfileExtractor, Sex,
    SimilarityRanker, TrajectoryEncoder,
};

fn symbols() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop_oneof![Just('N'), Just('A'), Just('U'), Just('D')], 0..20)
        .prop_map(|chars| chars.into_iter().collect())
}

fn patient_strategy(id: &'static str) -> impl Strategy<Value = PatientRecord> {
    (
        1920..2003i32,
        any::<bool>(),
        proptest::collection::vec(3.0..16.0f64, 1..8),
        60.0..260.0f64,
        40.0..160.0f64,
        0.1..400.0f64,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(move |(birth_year, male, readings, sys, dia, ldl, hld, htn)| {
            let sex = if male { Sex::Male } else { Sex::Female };
            readings.iter().enumerate().fold(
                PatientRecord::new(id, birth_year, sex),
                |patient, (i, hba1c)| {
                    let date = chrono::NaiveDate::from_ymd_opt(2015 + i as i32, 3, 1).unwrap();
                    patient.with_analysis(
                        AnalysisSnapshot::on(date)
                            .with_hba1c(*hba1c)
                            .with_blood_pressure(sys, dia)
                            .with_lipids(1.2, ldl, 1.7)
                            .with_comorbidities(hld, htn),
                    )
                },
            )
        })
}

proptest! {
    /// D3K similarity always lies in (0, 1]
    #[test]
    fn d3k_in_unit_interval(
        a in proptest::collection::vec(0.0..=1.0f64, PROFILE_LEN),
        b in proptest::collection::vec(0.0..=1.0f64, PROFILE_LEN),
    ) {
        let sim = d3k_similarity(&a, &b, &FEATURE_WEIGHTS).unwrap();
        prop_assert!(sim > 0.0 && sim <= 1.0, "d3k out of range: {}", sim);
    }

    /// Identical profiles score exactly 1.0
    #[test]
    fn d3k_identity(a in proptest::collection::vec(0.0..=1.0f64, PROFILE_LEN)) {
        let profile = ClinicalProfile::from_values(a);
        prop_assert_eq!(D3kCalculator::default().similarity(&profile, &profile).unwrap(), 1.0);
    }

    /// Normalizing an already-normalized value changes nothing
    #[test]
    fn normalization_idempotent(value in -500.0..500.0f64, min in -50.0..50.0f64, width in 0.1..300.0f64) {
        let once = normalize(value, min, min + width);
        prop_assert!((0.0..=1.0).contains(&once));
        prop_assert_eq!(normalize(once, 0.0, 1.0), once);
    }

    /// Every extracted feature is normalized
    #[test]
    fn profile_features_normalized(patient in patient_strategy("p")) {
        let profile = ProfileExtractor::new(2024).extract(&patient).unwrap();
        prop_assert_eq!(profile.len(), PROFILE_LEN);
        for v in profile.as_slice() {
            prop_assert!((0.0..=1.0).contains(v), "feature out of range: {}", v);
        }
    }

    /// Encoding the same readings twice yields the same trajectory
    #[test]
    fn trajectory_encoding_deterministic(readings in proptest::collection::vec(3.0..16.0f64, 0..12)) {
        let encoder = TrajectoryEncoder::default();
        let first = encoder.encode(&readings);
        prop_assert_eq!(first.clone(), encoder.encode(&readings));
        if let Some(t) = first {
            prop_assert_eq!(t.len(), readings.len() - 1);
        }
    }

    /// N-gram cosine is symmetric and bounded
    #[test]
    fn ngram_cosine_symmetric(a in symbols(), b in symbols(), n in 1usize..8) {
        let ga = ngrams(&a, n);
        let gb = ngrams(&b, n);
        let ab = ngram_cosine(&ga, &gb);
        prop_assert_eq!(ab, ngram_cosine(&gb, &ga));
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    /// Combined scores stay in [0, 1] and come back sorted
    #[test]
    fn combined_score_bounded(target in patient_strategy("t"), a in patient_strategy("a"), b in patient_strategy("b")) {
        let ranker = SimilarityRanker::new(&EngineConfig::default().with_reference_year(2024)).unwrap();
        let results = ranker.rank(&target, &[a, b]).unwrap();

        prop_assert_eq!(results.len(), 2);
        for r in &results {
            prop_assert!((0.0..=1.0).contains(&r.score), "score out of range: {}", r.score);
        }
        prop_assert!(results[0].score >= results[1].score);
    }

    /// Sorting keeps the input order of equal scores
    #[test]
    fn ranking_stable(scores in proptest::collection::vec(prop_oneof![Just(0.3), Just(0.9)], 1..12)) {
        let ranker = SimilarityRanker::new(&EngineConfig::default().with_reference_year(2024)).unwrap();
        let base = PatientRecord::new("x", 1970, Sex::Male).with_analysis(AnalysisSnapshot::default());
        let template = ranker.score_pair(&base, &base).unwrap();

        let mut results: Vec<_> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut r = template.clone();
                r.patient_id = format!("{i:02}");
                r.score = *s;
                r
            })
            .collect();
        sort_by_score(&mut results);

        for pair in results.windows(2) {
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].patient_id < pair[1].patient_id);
            }
        }
    }
}
