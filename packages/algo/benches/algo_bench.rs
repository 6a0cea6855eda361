//! Benchmark suite for calibra-algo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use calibra_algo::rating::compute_delta;
use calibra_algo::selection::pick_candidate;

fn bench_compute_delta(c: &mut Criterion) {
    c.bench_function("compute_delta", |b| {
        b.iter(|| compute_delta(black_box(1200), black_box(1350), black_box(true)))
    });
}

fn bench_pick_candidate(c: &mut Criterion) {
    let candidates: Vec<i32> = (0..2_000).map(|i| i * 3).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    c.bench_function("pick_candidate/2000", |b| {
        b.iter(|| pick_candidate(black_box(1500), &candidates, 200, &mut rng).map(|p| *p.candidate))
    });
}

criterion_group!(benches, bench_compute_delta, bench_pick_candidate);
criterion_main!(benches);
