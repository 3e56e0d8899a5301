//! Benchmarks for SlotDB storage operations

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slotdb::{Config, Dictionary, StringHashSet};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn bench_config(dir: &TempDir) -> Config {
    Config::builder()
        .path(dir.path().join("bench.dat"))
        .block_size(64 * 1024)
        .truncate(true)
        .build()
}

fn bench_dictionary(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = runtime.block_on(slotdb::Store::open(bench_config(&dir))).unwrap();
    let dict = runtime.block_on(Dictionary::<i64>::create(&store)).unwrap();

    let mut group = c.benchmark_group("dictionary");

    let mut next = 1i64;
    group.bench_function("set", |b| {
        b.iter(|| {
            runtime
                .block_on(dict.set(&store, black_box(&next), next * 2))
                .unwrap();
            next += 1;
        })
    });

    for &size in &[100i64, 1000] {
        runtime.block_on(async {
            for key in 1..=size {
                dict.set(&store, &key, key).await.unwrap();
            }
        });
        group.bench_with_input(BenchmarkId::new("get", size), &size, |b, &size| {
            let mut key = 0i64;
            b.iter(|| {
                key = key % size + 1;
                black_box(runtime.block_on(dict.get(&store, &key)).unwrap());
            })
        });
    }

    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let store = runtime.block_on(slotdb::Store::open(bench_config(&dir))).unwrap();
    let strings = runtime.block_on(StringHashSet::create(&store)).unwrap();

    let mut group = c.benchmark_group("strings");

    for (name, len) in [("short", 16usize), ("long", 1024)] {
        let text = "x".repeat(len);
        group.bench_function(BenchmarkId::new("intern_release", name), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    let address = strings.new_string(&store, black_box(&text)).await.unwrap();
                    strings.release(&store, address).await.unwrap();
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dictionary, bench_strings);
criterion_main!(benches);
