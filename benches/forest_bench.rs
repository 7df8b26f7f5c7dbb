//! Criterion benchmarks for taiga: commit (tree regrowth) and inference.

use std::collections::BTreeMap;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use taiga::Forest;

fn make_regression(n: usize, seed: u64) -> Vec<(String, BTreeMap<u32, f64>, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let x = rng.r#gen::<f64>() * 10.0;
            let features = BTreeMap::from([
                (0, x),
                (1, rng.r#gen::<f64>()),
                (3, rng.r#gen::<f64>()),
            ]);
            (format!("s{i}"), features, 2.0 * x + rng.r#gen::<f64>())
        })
        .collect()
}

fn populated_uncommitted(tree_count: usize, n: usize) -> Forest {
    let mut forest = Forest::new(tree_count).unwrap();
    for (id, features, target) in make_regression(n, 42) {
        forest.add(id, features, target).unwrap();
    }
    forest
}

fn bench_commit(c: &mut Criterion) {
    c.bench_function("commit_500x3_20trees", |b| {
        b.iter_batched(
            || populated_uncommitted(20, 500),
            |mut forest| forest.commit(),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_classify(c: &mut Criterion) {
    let mut forest = populated_uncommitted(20, 500);
    forest.commit();
    let probe = BTreeMap::from([(0, 5.0), (1, 0.5)]);

    c.bench_function("classify_500x3_20trees", |b| {
        b.iter(|| forest.classify(&probe));
    });
}

fn bench_codec_round_trip(c: &mut Criterion) {
    let mut forest = populated_uncommitted(20, 500);
    forest.commit();

    c.bench_function("codec_round_trip_500x3_20trees", |b| {
        b.iter(|| {
            let bytes = forest.to_bytes().unwrap();
            Forest::from_bytes(&bytes).unwrap()
        });
    });
}

criterion_group!(benches, bench_commit, bench_classify, bench_codec_round_trip);
criterion_main!(benches);
