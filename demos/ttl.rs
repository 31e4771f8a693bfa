//! Time-to-live eviction examples

use esox_resourcepool::{Pool, TimeToLiveStrategy, manager};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ResourcePool - TTL Examples ===\n");

    // Example 1: Items expire a fixed time after creation
    creation_ttl().await;

    // Example 2: Idle items above the minimum are retired
    usage_ttl().await;
}

fn numbered() -> impl esox_resourcepool::Manager<Resource = usize, Error = std::io::Error> {
    let next = Arc::new(AtomicUsize::new(0));
    manager::from_fn(move || {
        let id = next.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, std::io::Error>(id) }
    })
}

async fn creation_ttl() {
    println!("1. Creation TTL:");
    let pool = Pool::with_ttl(
        numbered(),
        1,
        2,
        Duration::from_millis(200),
        TimeToLiveStrategy::Creation,
    );

    println!("   First resource: {}", *pool.get().await.unwrap());
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("   After expiry: {}", *pool.get().await.unwrap());

    let metrics = pool.get_metrics();
    println!("   Invalidated so far: {}\n", metrics.total_invalidated);
    pool.shutdown().await;
}

async fn usage_ttl() {
    println!("2. Usage TTL:");
    let pool = Pool::with_ttl(
        numbered(),
        1,
        4,
        Duration::from_millis(200),
        TimeToLiveStrategy::Usage,
    );

    let guards = burst(&pool, 4).await;
    println!("   Items during burst: {}", pool.get_metrics().items);
    drop(guards);

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("   Items after idling: {}\n", pool.get_metrics().items);
    pool.shutdown().await;
}

async fn burst<M: esox_resourcepool::Manager>(
    pool: &Pool<M>,
    count: usize,
) -> Vec<esox_resourcepool::PoolGuard<M>> {
    let mut guards = Vec::new();
    for _ in 0..count {
        if let Ok(guard) = pool.get().await {
            guards.push(guard);
        }
    }
    guards
}
