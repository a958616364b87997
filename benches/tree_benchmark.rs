use std::collections::BTreeMap;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::prelude::*;
use rbtree::RBTree;
use redwood::RedwoodMap;

const MAP_SIZE: u64 = 100_000;
const PROBES: usize = 5_000;

/// Keys `0..MAP_SIZE` in shuffled order, each paired with its square.
fn shuffled_entries() -> Vec<(u64, u64)> {
    let mut keys: Vec<u64> = (0..MAP_SIZE).collect();
    keys.shuffle(&mut rand::thread_rng());

    keys.into_iter().map(|k| (k, k * k)).collect()
}

/// `count` keys drawn uniformly from `0..2 * MAP_SIZE`, so about half miss.
fn probe_keys(count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();

    (0..count).map(|_| rng.gen_range(0..2 * MAP_SIZE)).collect()
}

fn redwood_map() -> RedwoodMap<u64, u64> {
    shuffled_entries().into_iter().collect()
}

fn btree_map() -> BTreeMap<u64, u64> {
    shuffled_entries().into_iter().collect()
}

fn insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("map insert 100K");

    group.bench_function("redwood", |b| {
        b.iter_batched(
            shuffled_entries,
            |entries| {
                let mut map = RedwoodMap::new();
                for (key, value) in entries {
                    map.insert(key, value);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("btreemap", |b| {
        b.iter_batched(
            shuffled_entries,
            |entries| entries.into_iter().collect::<BTreeMap<_, _>>(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("rbtree crate", |b| {
        b.iter_batched(
            shuffled_entries,
            |entries| entries.into_iter().collect::<RBTree<_, _>>(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("redwood presorted", |b| {
        b.iter_batched(
            || (0..MAP_SIZE).map(|k| (k, k * k)).collect::<Vec<_>>(),
            |entries| RedwoodMap::from_sorted_iter(entries).map(|map| map.len()),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("map overwrite existing keys");

    group.bench_function("redwood", |b| {
        b.iter_batched(
            || (redwood_map(), probe_keys(PROBES)),
            |(mut map, keys)| {
                keys.into_iter()
                    .filter_map(|key| map.insert(key / 2, key))
                    .count()
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("btreemap", |b| {
        b.iter_batched(
            || (btree_map(), probe_keys(PROBES)),
            |(mut map, keys)| {
                keys.into_iter()
                    .filter_map(|key| map.insert(key / 2, key))
                    .count()
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("map get");

    group.bench_function("redwood", |b| {
        b.iter_batched(
            || (redwood_map(), probe_keys(PROBES)),
            |(map, keys)| keys.iter().filter_map(|key| map.get(key)).sum::<u64>(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("btreemap", |b| {
        b.iter_batched(
            || (btree_map(), probe_keys(PROBES)),
            |(map, keys)| keys.iter().filter_map(|key| map.get(key)).sum::<u64>(),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("map remove");

    group.bench_function("redwood", |b| {
        b.iter_batched(
            || (redwood_map(), probe_keys(PROBES)),
            |(mut map, keys)| keys.iter().filter_map(|key| map.remove(key)).sum::<u64>(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("btreemap", |b| {
        b.iter_batched(
            || (btree_map(), probe_keys(PROBES)),
            |(mut map, keys)| keys.iter().filter_map(|key| map.remove(key)).sum::<u64>(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("redwood pop_first", |b| {
        b.iter_batched(
            redwood_map,
            |mut map| {
                while map.pop_first().is_some() {}
                map
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("btreemap pop_first", |b| {
        b.iter_batched(
            btree_map,
            |mut map| {
                while map.pop_first().is_some() {}
                map
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn retain(c: &mut Criterion) {
    let mut group = c.benchmark_group("map retain");

    for modulus in [2, 10] {
        group.bench_with_input(BenchmarkId::new("redwood", modulus), &modulus, |b, &m| {
            b.iter_batched(
                redwood_map,
                |mut map| {
                    map.retain(|key, _| key % m == 0);
                    map
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("btreemap", modulus), &modulus, |b, &m| {
            b.iter_batched(
                btree_map,
                |mut map| {
                    map.retain(|key, _| key % m == 0);
                    map
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("map traversal");
    let redwood = redwood_map();
    let btree = btree_map();
    let missing = MAP_SIZE * MAP_SIZE;

    group.bench_function("redwood entries", |b| {
        b.iter(|| {
            redwood
                .entries()
                .iter()
                .fold(0u64, |acc, (k, v)| acc.wrapping_add(k ^ v))
        })
    });

    group.bench_function("btreemap iter", |b| {
        b.iter(|| btree.iter().fold(0u64, |acc, (k, v)| acc.wrapping_add(k ^ v)))
    });

    group.bench_function("redwood contains_value miss", |b| {
        b.iter(|| redwood.contains_value(&missing))
    });

    group.bench_function("btreemap values contains miss", |b| {
        b.iter(|| btree.values().any(|v| *v == missing))
    });

    group.finish();
}

criterion_group!(
    benches, insertion, overwrite, lookup, removal, retain, traversal
);
criterion_main!(benches);
