use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ranked_bptree::RankedTree;
use std::collections::BTreeMap;

const N: usize = 10_000;

// ─── Helper functions to generate key sequences ─────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

// ─── Insert ─────────────────────────────────────────────────────────────────

fn bench_insert_ordered(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_ordered");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| {
            let mut tree = RankedTree::new();
            for i in 0..N as i64 {
                tree.insert(i, i);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for i in 0..N as i64 {
                map.insert(i, i);
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_reverse");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| {
            let mut tree = RankedTree::new();
            for i in (0..N as i64).rev() {
                tree.insert(i, i);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for i in (0..N as i64).rev() {
                map.insert(i, i);
            }
            map
        });
    });

    group.finish();
}

fn bench_insert_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let mut group = c.benchmark_group("insert_random");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| {
            let mut tree = RankedTree::new();
            for &k in &keys {
                tree.insert(k, k);
            }
            tree
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &k in &keys {
                map.insert(k, k);
            }
            map
        });
    });

    group.finish();
}

// ─── Lookup ─────────────────────────────────────────────────────────────────

fn bench_get_random(c: &mut Criterion) {
    let keys = random_keys(N);
    let tree: RankedTree<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let map: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

    let mut group = c.benchmark_group("get_random");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for k in &keys {
                sum = sum.wrapping_add(*tree.get(k).unwrap());
            }
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for k in &keys {
                sum = sum.wrapping_add(*map.get(k).unwrap());
            }
            sum
        });
    });

    group.finish();
}

fn bench_get_by_index(c: &mut Criterion) {
    let tree: RankedTree<i64, i64> = ordered_keys(N).into_iter().map(|k| (k, k)).collect();
    let map: BTreeMap<i64, i64> = ordered_keys(N).into_iter().map(|k| (k, k)).collect();

    let mut group = c.benchmark_group("get_by_index");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for i in (0..N).step_by(97) {
                sum = sum.wrapping_add(*tree.get_by_index(i).unwrap().1);
            }
            sum
        });
    });

    // BTreeMap has no rank index; the nearest equivalent is a linear walk.
    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for i in (0..N).step_by(97) {
                sum = sum.wrapping_add(*map.values().nth(i).unwrap());
            }
            sum
        });
    });

    group.finish();
}

// ─── Remove ─────────────────────────────────────────────────────────────────

fn bench_remove_random(c: &mut Criterion) {
    let keys = random_keys(N);

    let mut group = c.benchmark_group("remove_random");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter_batched(
            || keys.iter().map(|&k| (k, k)).collect::<RankedTree<i64, i64>>(),
            |mut tree| {
                for k in &keys {
                    tree.remove(k);
                }
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter_batched(
            || keys.iter().map(|&k| (k, k)).collect::<BTreeMap<i64, i64>>(),
            |mut map| {
                for k in &keys {
                    map.remove(k);
                }
                map
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_remove_at_front(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_at_front");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter_batched(
            || ordered_keys(N).into_iter().map(|k| (k, k)).collect::<RankedTree<i64, i64>>(),
            |mut tree| {
                while tree.remove_at(0).is_ok() {}
                tree
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter_batched(
            || ordered_keys(N).into_iter().map(|k| (k, k)).collect::<BTreeMap<i64, i64>>(),
            |mut map| {
                while map.pop_first().is_some() {}
                map
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ─── Iterate ────────────────────────────────────────────────────────────────

fn bench_iter_skip(c: &mut Criterion) {
    let tree: RankedTree<i64, i64> = ordered_keys(N).into_iter().map(|k| (k, k)).collect();
    let map: BTreeMap<i64, i64> = ordered_keys(N).into_iter().map(|k| (k, k)).collect();

    let mut group = c.benchmark_group("iter_skip_half");

    group.bench_function(BenchmarkId::new("RankedTree", N), |b| {
        b.iter(|| tree.values().skip(N / 2).fold(0i64, |acc, v| acc.wrapping_add(*v)));
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| map.values().skip(N / 2).fold(0i64, |acc, v| acc.wrapping_add(*v)));
    });

    group.finish();
}

criterion_group!(insert_benches, bench_insert_ordered, bench_insert_reverse, bench_insert_random,);

criterion_group!(lookup_benches, bench_get_random, bench_get_by_index,);

criterion_group!(remove_benches, bench_remove_random, bench_remove_at_front,);

criterion_group!(iter_benches, bench_iter_skip,);

criterion_main!(insert_benches, lookup_benches, remove_benches, iter_benches);
