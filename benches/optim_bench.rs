//! Criterion benchmarks for moses-optim.
//!
//! Synthetic problems (OneMax over bits, Sphere over contin knobs) measure
//! neighborhood and optimizer overhead independent of any scorer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use moses_optim::neighborhood::{count_neighborhood_size, generate_all_in_neighborhood};
use moses_optim::optimization::hill_climbing::{HcConfig, HillClimbing};
use moses_optim::optimization::particle_swarm::{ParticleSwarm, PsConfig};
use moses_optim::optimization::{OptimConfig, Optimizer};
use moses_optim::random::create_rng;
use moses_optim::representation::{ContinSpec, Deme, DiscSpec, FieldSet, Instance};
use moses_optim::scoring::CompositeScore;
use std::sync::Arc;

fn onemax(fs: &FieldSet, inst: &Instance) -> CompositeScore {
    CompositeScore::from_raw(fs.bits(inst).filter(|&b| b).count() as f64)
}

fn sphere(fs: &FieldSet, inst: &Instance) -> CompositeScore {
    CompositeScore::from_raw(-fs.contins(inst).map(|x| x * x).sum::<f64>())
}

fn mixed(n: usize) -> FieldSet {
    FieldSet::new()
        .with_spec(ContinSpec::default(), n / 10)
        .with_spec(DiscSpec::new(5), n / 5)
        .with_spec(DiscSpec::bit(), n)
}

// ===========================================================================
// Neighborhoods
// ===========================================================================

fn bench_count_neighborhood(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_neighborhood");

    for &n in &[50usize, 200, 1000] {
        let fs = mixed(n);
        let center = fs.default_instance();
        group.bench_with_input(BenchmarkId::from_parameter(n), &(fs, center), |b, (fs, center)| {
            b.iter(|| {
                let total = count_neighborhood_size(black_box(fs), black_box(center), 3, 1_000_000);
                black_box(total)
            })
        });
    }
    group.finish();
}

fn bench_generate_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_all_dist2");
    group.sample_size(20);

    for &n in &[20usize, 60] {
        let fs = mixed(n);
        let center = fs.default_instance();
        group.bench_with_input(BenchmarkId::from_parameter(n), &(fs, center), |b, (fs, center)| {
            b.iter(|| {
                let mut out = Vec::new();
                generate_all_in_neighborhood(black_box(fs), 2, black_box(center), &mut out);
                black_box(out.len())
            })
        });
    }
    group.finish();
}

// ===========================================================================
// Optimizers
// ===========================================================================

fn bench_hc_onemax(c: &mut Criterion) {
    let mut group = c.benchmark_group("hc_onemax");
    group.sample_size(10);

    for &n in &[32usize, 128] {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), n));
        let optim = OptimConfig::default()
            .with_target_score(n as f64)
            .with_parallel(false);
        let hc = HillClimbing::new(optim, HcConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &(fs, hc), |b, (fs, hc)| {
            b.iter(|| {
                let mut deme = Deme::new(Arc::clone(fs));
                let stats = hc.search(&mut deme, None, &onemax, 100_000, None, &mut create_rng(42));
                black_box(stats)
            })
        });
    }
    group.finish();
}

fn bench_pso_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("pso_sphere");
    group.sample_size(10);

    for &dim in &[5usize, 20] {
        let fs = Arc::new(FieldSet::new().with_spec(ContinSpec::default(), dim));
        let optim = OptimConfig::default().with_parallel(false);
        let pso = ParticleSwarm::new(optim, PsConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(dim), &(fs, pso), |b, (fs, pso)| {
            b.iter(|| {
                let mut deme = Deme::new(Arc::clone(fs));
                let stats = pso.search(&mut deme, None, &sphere, 5_000, None, &mut create_rng(42));
                black_box(stats)
            })
        });
    }
    group.finish();
}

fn init_logging(_: &mut Criterion) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

criterion_group!(
    benches,
    init_logging,
    bench_count_neighborhood,
    bench_generate_all,
    bench_hc_onemax,
    bench_pso_sphere
);
criterion_main!(benches);
