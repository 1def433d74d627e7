//! Benchmarks for connectivity and HIP scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use riverscape_hip::{
    ConnectivityParams, GradientThresholdSet, HipScorer, LifeStage, NetworkModel, PathAggregator,
    ProfileKey, ProfileLibrary, Reach, ReachConnectivity, ReachId,
};

/// `trees` binary trees of `per_tree` reaches, slopes varying with position
fn create_network(trees: i64, per_tree: i64) -> NetworkModel {
    let mut reaches = Vec::with_capacity((trees * per_tree) as usize);
    for tree in 0..trees {
        let base = tree * per_tree;
        for k in 0..per_tree {
            reaches.push(Reach {
                downstream: if k == 0 { None } else { Some(ReachId(base + (k - 1) / 2)) },
                slope_pct: Some(((k * 7 + tree * 3) % 23) as f64 * 0.9),
                mean_flow_cms: Some(600.0 / (k + 1) as f64),
                vwi: Some(((k * 13) % 40) as f64),
                barrier: (k + tree) % 211 == 0 && k > 0,
                ..Reach::new(base + k)
            });
        }
    }
    NetworkModel::new(reaches).unwrap()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("connectivity/aggregate");
    for reaches in [10_000i64, 100_000, 400_000] {
        let net = create_network(64, reaches / 64);
        let aggregator = PathAggregator::default();
        group.bench_with_input(BenchmarkId::new("sequential", reaches), &reaches, |b, _| {
            b.iter(|| aggregator.aggregate(black_box(&net)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", reaches), &reaches, |b, _| {
            b.iter(|| aggregator.aggregate_parallel(black_box(&net)).unwrap())
        });
    }
    group.finish();
}

fn bench_threshold_count(c: &mut Criterion) {
    // Cost should barely move with the number of thresholds
    let mut group = c.benchmark_group("connectivity/thresholds");
    let net = create_network(64, 1_500);
    for high in [5u32, 20, 100] {
        let aggregator = PathAggregator::new(ConnectivityParams {
            thresholds: GradientThresholdSet::from_range(1, high),
            ..ConnectivityParams::default()
        });
        group.bench_with_input(BenchmarkId::from_parameter(high), &high, |b, _| {
            b.iter(|| aggregator.aggregate(black_box(&net)).unwrap())
        });
    }
    group.finish();
}

fn bench_score_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("suitability/score_network");
    let library = ProfileLibrary::builtin();
    let profile = library
        .get(&ProfileKey::new("Coho salmon", LifeStage::Rearing))
        .unwrap();
    for reaches in [10_000i64, 100_000] {
        let net = create_network(64, reaches / 64);
        let table = PathAggregator::default().aggregate(&net).unwrap();
        let conn = ReachConnectivity::combine(&net, &table, None).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(reaches), &reaches, |b, _| {
            let scorer = HipScorer::new(&net, Some(conn.as_slice()));
            b.iter(|| scorer.score_network(black_box(profile)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_threshold_count, bench_score_network);
criterion_main!(benches);
