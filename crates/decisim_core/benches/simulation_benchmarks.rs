//! Criterion benchmarks for decisim_core
//!
//! Run with: cargo bench -p decisim_core

use std::convert::Infallible;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use decisim_core::analysis::{SensitivityMethod, StatisticsAggregator, analyze};
use decisim_core::{Assumption, CorrelationMatrix, SimulationConfig, Trial, simulate};

fn revenue_assumptions() -> Vec<Assumption> {
    vec![
        Assumption::normal("market_size", 1_000_000.0, 200_000.0),
        Assumption::beta("conversion_rate", 2.0, 98.0),
        Assumption::triangular("price", 40.0, 50.0, 70.0),
        Assumption::gamma("fixed_costs", 4.0, 50_000.0),
    ]
}

fn profit(t: &Trial<'_>) -> Result<f64, Infallible> {
    let v = t.values();
    Ok(v[0] * v[1] * v[2] - v[3])
}

fn bench_independent(c: &mut Criterion) {
    let mut group = c.benchmark_group("independent");
    let assumptions = revenue_assumptions();

    for trials in [1_000, 10_000, 100_000].iter() {
        let config = SimulationConfig::new(*trials).with_seed(42);
        group.bench_with_input(BenchmarkId::new("trials", trials), trials, |b, _| {
            b.iter(|| simulate(black_box(&assumptions), None, black_box(&config), profit))
        });
    }

    group.finish();
}

fn bench_correlated(c: &mut Criterion) {
    let assumptions = revenue_assumptions();
    let names = assumptions.iter().map(|a| a.name.clone()).collect();
    let matrix = CorrelationMatrix::from_pairs(
        names,
        [("market_size", "conversion_rate", -0.3), ("price", "conversion_rate", -0.5)],
    )
    .unwrap();
    let config = SimulationConfig::new(10_000).with_seed(42);

    c.bench_function("correlated_10k", |b| {
        b.iter(|| {
            simulate(
                black_box(&assumptions),
                Some(black_box(&matrix)),
                black_box(&config),
                profit,
            )
        })
    });
}

fn bench_parallel_vs_serial(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");
    let assumptions = revenue_assumptions();
    let serial = SimulationConfig::new(100_000).with_seed(42);
    let parallel = serial.clone().with_parallel(true);

    group.bench_function("serial", |b| {
        b.iter(|| simulate(black_box(&assumptions), None, black_box(&serial), profit))
    });
    group.bench_function("parallel", |b| {
        b.iter(|| simulate(black_box(&assumptions), None, black_box(&parallel), profit))
    });

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let assumptions = revenue_assumptions();
    let run = simulate(&assumptions, None, &SimulationConfig::new(100_000).with_seed(42), profit)
        .unwrap();
    let aggregator = StatisticsAggregator::default();

    c.bench_function("statistics_100k", |b| {
        b.iter(|| aggregator.summarize(black_box(&run.outcomes)))
    });
    c.bench_function("spearman_100k", |b| {
        b.iter(|| {
            analyze(
                black_box(&run.samples),
                black_box(&run.outcomes),
                SensitivityMethod::Spearman,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_independent,
    bench_correlated,
    bench_parallel_vs_serial,
    bench_analysis,
);
criterion_main!(benches);
