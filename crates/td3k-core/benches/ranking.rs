//! Benchmarks for similarity ranking and recommendation
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use td3k_core::{
    AnalysisSnapshot, Drug, EngineConfig, InMemoryRepository, Intensity, MedicationSet, PatientRecord,
    Sex, SimilarityRanker, Td3kEngine, TrajectoryEncoder,
};

/// Deterministic synthetic population
fn population(size: usize) -> Vec<PatientRecord> {
    (0..size)
        .map(|i| {
            let base = 6.0 + (i % 50) as f64 * 0.1;
            let meds = match i % 3 {
                0 => MedicationSet::new().with(Drug::Metformin, Intensity::M),
                1 => MedicationSet::new()
                    .with(Drug::Metformin, Intensity::H)
                    .with(Drug::Sitagliptin, Intensity::M),
                _ => MedicationSet::new().with(Drug::Empagliflozin, Intensity::L),
            };
            (0..6)
                .fold(
                    PatientRecord::new(format!("p{i}"), 1940 + (i % 60) as i32, Sex::Female),
                    |p, visit| {
                        let date = NaiveDate::from_ymd_opt(2018 + visit, 1, 1).unwrap();
                        p.with_analysis(
                            AnalysisSnapshot::on(date)
                                .with_hba1c(base + (visit % 3) as f64 * 0.4)
                                .with_blood_pressure(120.0 + (i % 40) as f64, 80.0)
                                .with_comorbidities(i % 2 == 0, i % 5 == 0),
                        )
                    },
                )
                .with_medications(meds)
        })
        .collect()
}

fn bench_trajectory(c: &mut Criterion) {
    let encoder = TrajectoryEncoder::default();
    let a: Vec<f64> = (0..24).map(|i| 7.0 + (i % 4) as f64 * 0.6).collect();
    let b: Vec<f64> = (0..24).map(|i| 8.5 - (i % 5) as f64 * 0.3).collect();

    c.bench_function("trajectory_compare_24", |bench| {
        bench.iter(|| encoder.compare_histories(black_box(&a), black_box(&b)))
    });
}

fn bench_ranking(c: &mut Criterion) {
    let config = EngineConfig::default().with_reference_year(2024);
    let ranker = SimilarityRanker::new(&config).unwrap();

    let mut group = c.benchmark_group("rank");
    for size in [100usize, 1_000, 5_000] {
        let pop = population(size + 1);
        let (target, rest) = pop.split_first().unwrap();
        group.bench_with_input(BenchmarkId::new("population", size), rest, |b, rest| {
            b.iter(|| ranker.rank(black_box(target), black_box(rest)))
        });
    }
    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let repo = InMemoryRepository::from_records(population(1_000));
    let engine = Td3kEngine::new(repo, EngineConfig::default().with_reference_year(2024)).unwrap();
    let results = engine.compute_similarity("p0").unwrap();

    c.bench_function("recommend_top10", |b| {
        b.iter(|| engine.recommend_medications(black_box("p0"), black_box(&results), 10))
    });
}

criterion_group!(benches, bench_trajectory, bench_ranking, bench_recommend);
criterion_main!(benches);
