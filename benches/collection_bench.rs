//! Benchmarks for the core collection operations.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use persimmon::{PersistentHashMap, PersistentSequencedMap, PersistentTreeMap, PersistentVector};
use std::hint::black_box;

const SIZE: i64 = 10_000;

fn bench_hashmap(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("hashmap");

    group.bench_function("insert_persistent", |bencher| {
        bencher.iter(|| {
            let mut map = PersistentHashMap::new();
            for key in 0..SIZE {
                map = map.insert(key, key);
            }
            black_box(map)
        });
    });

    group.bench_function("insert_transient", |bencher| {
        bencher.iter(|| {
            let mut transient = PersistentHashMap::new().transient();
            for key in 0..SIZE {
                transient.insert(key, key);
            }
            black_box(transient.persistent())
        });
    });

    let map: PersistentHashMap<i64, i64> = (0..SIZE).map(|key| (key, key)).collect();
    group.bench_function("get", |bencher| {
        bencher.iter(|| {
            for key in 0..SIZE {
                black_box(map.get(&key));
            }
        });
    });

    group.bench_function("remove", |bencher| {
        bencher.iter_batched(
            || map.clone(),
            |mut map| {
                for key in 0..SIZE {
                    map = map.remove(&key);
                }
                black_box(map)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_vector(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("vector");

    group.bench_function("push_back", |bencher| {
        bencher.iter(|| {
            let mut vector = PersistentVector::new();
            for value in 0..SIZE {
                vector = vector.push_back(value);
            }
            black_box(vector)
        });
    });

    group.bench_function("push_front", |bencher| {
        bencher.iter(|| {
            let mut vector = PersistentVector::new();
            for value in 0..SIZE {
                vector = vector.push_front(value);
            }
            black_box(vector)
        });
    });

    let vector: PersistentVector<i64> = (0..SIZE).collect();
    group.bench_function("iterate", |bencher| {
        bencher.iter(|| black_box(vector.iter().sum::<i64>()));
    });

    group.finish();
}

fn bench_sequenced_map(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("sequenced_map");

    group.bench_function("insert_last", |bencher| {
        bencher.iter(|| {
            let mut map = PersistentSequencedMap::new();
            for key in 0..SIZE {
                map = map.insert_last(key, key);
            }
            black_box(map)
        });
    });

    let map: PersistentSequencedMap<i64, i64> = (0..SIZE).map(|key| (key, key)).collect();
    group.bench_function("ordered_iterate", |bencher| {
        bencher.iter(|| black_box(map.iter().map(|(_, value)| value).sum::<i64>()));
    });

    group.finish();
}

fn bench_treemap(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("treemap");

    group.bench_function("insert", |bencher| {
        bencher.iter(|| {
            let mut map = PersistentTreeMap::new();
            for key in 0..SIZE {
                map = map.insert(key, key);
            }
            black_box(map)
        });
    });

    let map: PersistentTreeMap<i64, i64> = (0..SIZE).map(|key| (key, key)).collect();
    group.bench_function("ceiling", |bencher| {
        bencher.iter(|| {
            for key in 0..SIZE {
                black_box(map.ceiling_key(&key));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_hashmap,
    bench_vector,
    bench_sequenced_map,
    bench_treemap
);
criterion_main!(benches);
