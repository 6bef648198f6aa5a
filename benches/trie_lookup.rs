//! Policy-trie lookup benchmarks.
//!
//! Measures `choices_for_longest_suffix` over tries of growing size, with
//! randomized keys and histories drawn from a fixed seed.
//!
//! Run with:
//! ```bash
//! cargo bench --bench trie_lookup
//! ```

use criterion::{criterion_group, criterion_main, black_box, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use wca_rs::decision::Decision;
use wca_rs::path::Path;
use wca_rs::trie::{PolicyTrie, TrieBuilder};
use wca_rs::types::{BranchId, ContextId};

const SITES: u64 = 32;
const MAX_KEY_LEN: usize = 8;
const HISTORY_LEN: usize = 12;

fn random_path(rng: &mut ChaCha8Rng, len: usize) -> Path {
    let decisions = (0..len)
        .map(|_| {
            Decision::new(
                BranchId::new(rng.gen_range(0..SITES)),
                rng.gen_range(0..2),
                ContextId::new(0),
            )
        })
        .collect();
    Path::from_decisions(decisions)
}

fn build_trie(rng: &mut ChaCha8Rng, keys: usize) -> PolicyTrie {
    let mut builder = TrieBuilder::new();
    for _ in 0..keys {
        let len = rng.gen_range(1..=MAX_KEY_LEN);
        let key = random_path(rng, len);
        builder.put(&key, rng.gen_range(0..2));
    }
    builder.build()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("choices_for_longest_suffix");
    for &keys in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            let mut rng = ChaCha8Rng::seed_from_u64(keys as u64);
            let trie = build_trie(&mut rng, keys);
            let histories: Vec<Path> = (0..256).map(|_| random_path(&mut rng, HISTORY_LEN)).collect();
            let mut next = 0usize;
            b.iter(|| {
                let history = &histories[next % histories.len()];
                next += 1;
                black_box(trie.choices_for_longest_suffix(history))
            });
        });
    }
    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie_build");
    for &keys in &[1_000usize, 10_000] {
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            b.iter(|| {
                let mut rng = ChaCha8Rng::seed_from_u64(7);
                black_box(build_trie(&mut rng, keys))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lookup, bench_insert);
criterion_main!(benches);
