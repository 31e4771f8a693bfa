//! Checkout throughput benchmarks.
//!
//! - Uncontended get/return on a warm pool
//! - Shared items with several borrowers per item
//! - Contended checkouts from concurrent tasks

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use esox_resourcepool::{Pool, PoolConfig, manager};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_uncontended(c: &mut Criterion) {
    let rt = runtime();
    let pool = rt.block_on(async {
        Pool::fixed(manager::from_fn(|| async { Ok::<_, String>(vec![0u8; 64]) }), 4)
    });

    c.bench_function("checkout_uncontended", |b| {
        b.to_async(&rt).iter(|| async {
            let guard = pool.get().await.unwrap();
            black_box(guard.len());
        })
    });
}

fn bench_shared(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("checkout_shared");

    for permits in [1usize, 4, 16] {
        let pool = rt.block_on(async {
            Pool::new(
                manager::from_fn(|| async { Ok::<_, String>(0u64) }),
                PoolConfig::new().with_size_range(1, 2).with_permits_per_item(permits),
            )
        });
        group.bench_with_input(BenchmarkId::from_parameter(permits), &permits, |b, _| {
            b.to_async(&rt).iter(|| async {
                let guard = pool.get().await.unwrap();
                black_box(*guard);
            })
        });
    }
    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let rt = runtime();
    let pool = rt.block_on(async {
        Pool::new(
            manager::from_fn(|| async { Ok::<_, String>(0u64) }),
            PoolConfig::new().with_size_range(0, 4),
        )
    });

    c.bench_function("checkout_contended_32_tasks", |b| {
        b.to_async(&rt).iter(|| async {
            let mut tasks = Vec::with_capacity(32);
            for _ in 0..32 {
                let pool = pool.clone();
                tasks.push(tokio::spawn(async move {
                    let guard = pool.get().await.unwrap();
                    black_box(*guard);
                }));
            }
            for task in tasks {
                task.await.unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_uncontended, bench_shared, bench_contended);
criterion_main!(benches);
