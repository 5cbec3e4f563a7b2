//! Performance benchmarks for the registry.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kv_registry::{KvRegistry, RegistryConfig, SubscriptionConfig};

fn populated(keys: usize) -> KvRegistry {
    let registry = KvRegistry::new();
    for i in 0..keys {
        registry.set(format!("key-{}", i), format!("value-{}", i));
    }
    registry
}

/// Benchmark point reads against stores of varying size
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for keys in [10, 1_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            let registry = populated(keys);
            let probe = format!("key-{}", keys / 2);
            b.iter(|| {
                black_box(registry.get(&probe));
            });
        });
    }

    group.finish();
}

/// Benchmark full snapshots
fn bench_get_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_all");

    for keys in [10, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            let registry = populated(keys);
            b.iter(|| {
                black_box(registry.get_all());
            });
        });
    }

    group.finish();
}

/// Benchmark writes with varying subscriber fan-out
fn bench_set_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_fan_out");

    for subscribers in [0, 1, 16, 128] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                // Small queues so the bench measures the overflow path too
                let registry = KvRegistry::with_config(RegistryConfig {
                    subscription: SubscriptionConfig::default().buffer_size(64),
                });
                let _handles: Vec<_> = (0..subscribers).map(|_| registry.subscribe()).collect();

                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    black_box(registry.set("counter", i.to_string()));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_get, bench_get_all, bench_set_fan_out);
criterion_main!(benches);
