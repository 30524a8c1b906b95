//! Criterion benchmarks for Heston autocallable pricing.
//!
//! Benchmarks cover:
//! - Correlated normal generation
//! - Single path simulation against grid refinement
//! - Full pricing against path count, plain and antithetic

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::market_data::MarketEnvironment;
use pricer_core::types::Date;
use pricer_models::instruments::AutocallableNote;
use pricer_models::models::{HestonModel, HestonParameters};
use pricer_pricing::mc::{HestonPathSimulator, MonteCarloConfig, MonteCarloPricer, TimeGrid};
use pricer_pricing::rng::{CorrelatedNormals, PricerRng};

fn env() -> MarketEnvironment {
    MarketEnvironment::builder(Date::from_ymd(2024, 7, 20).unwrap(), 79.98)
        .risk_free_rate(0.02)
        .dividend_yield(0.028)
        .build()
        .unwrap()
}

fn params() -> HestonParameters {
    HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap()
}

/// Five-year semiannual memory note.
fn note() -> AutocallableNote {
    let start = Date::from_ymd(2024, 7, 20).unwrap();
    let dates = (1..=10)
        .map(|k| start.add_months(6 * k).unwrap())
        .collect();
    AutocallableNote::phoenix(dates, 1_000_000.0, 79.98, 0.04, 0.7, 0.6)
        .memory(true)
        .build()
        .unwrap()
}

fn bench_correlated_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlated_normals");
    let normals = CorrelatedNormals::new(-0.6).unwrap();

    for n_pairs in [1_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("fill", n_pairs), &n_pairs, |b, &n| {
            let mut rng = PricerRng::from_seed(42);
            let mut buffer = vec![0.0; 2 * n];
            b.iter(|| {
                normals.fill(&mut rng, &mut buffer);
                black_box(buffer[0])
            });
        });
    }

    group.finish();
}

fn bench_path_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("heston_path");
    let env = env();
    let sim = HestonPathSimulator::new(HestonModel::new(params()).unwrap(), &env).unwrap();
    let times: Vec<f64> = (1..=10).map(|k| 0.5 * k as f64).collect();

    for steps_per_year in [12, 52, 252] {
        let grid = TimeGrid::new(&times, steps_per_year).unwrap();
        group.bench_with_input(
            BenchmarkId::new("steps_per_year", steps_per_year),
            &grid,
            |b, grid| {
                let mut rng = PricerRng::from_seed(42);
                b.iter(|| black_box(sim.simulate(grid, &mut rng).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("autocallable_pricing");
    group.sample_size(10); // full pricing calls are slow

    let env = env();
    let note = note();
    let params = params();

    for n_paths in [1_000, 10_000, 100_000] {
        for antithetic in [false, true] {
            let label = if antithetic { "antithetic" } else { "plain" };
            let config = MonteCarloConfig::builder()
                .n_paths(n_paths)
                .antithetic(antithetic)
                .seed(42)
                .build()
                .unwrap();
            let pricer = MonteCarloPricer::new(config).unwrap();

            group.bench_with_input(BenchmarkId::new(label, n_paths), &n_paths, |b, _| {
                b.iter(|| black_box(pricer.price(&params, &env, &note).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_correlated_normals,
    bench_path_simulation,
    bench_pricing
);
criterion_main!(benches);
