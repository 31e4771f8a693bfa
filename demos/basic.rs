//! Basic usage examples for the resource pool

use esox_resourcepool::{Pool, PoolConfig, PoolError, manager};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn counting_manager(
    label: &'static str,
) -> impl esox_resourcepool::Manager<Resource = String, Error = std::io::Error> {
    let next = Arc::new(AtomicUsize::new(0));
    manager::from_fn(move || {
        let id = next.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, std::io::Error>(format!("{}-{}", label, id)) }
    })
}

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Fixed-size pool
    fixed_pool().await;

    // Example 2: Growing pool with shared items
    shared_items().await;

    // Example 3: Timeouts and creation failures
    errors().await;

    // Example 4: Invalidation and metrics
    invalidation().await;
}

async fn fixed_pool() {
    println!("1. Fixed Pool:");
    let pool = Pool::fixed(counting_manager("conn"), 2);

    {
        let conn = pool.get().await.unwrap();
        println!("   Got resource: {}", *conn);
        // Resource automatically returned when dropped
    }

    let metrics = pool.get_metrics();
    println!("   Items: {}, available: {}\n", metrics.items, metrics.available);
    pool.shutdown().await;
}

async fn shared_items() {
    println!("2. Shared Items:");
    let config = PoolConfig::new().with_size_range(1, 3).with_permits_per_item(2);
    let pool = Pool::new(counting_manager("session"), config);

    let a = pool.get().await.unwrap();
    let b = pool.get().await.unwrap();
    let c = pool.get().await.unwrap();
    println!("   Borrowed: {}, {}, {}", *a, *b, *c);

    let metrics = pool.get_metrics();
    println!("   Items: {}, in use: {}", metrics.items, metrics.in_use);
    println!("   Utilization: {:.1}%\n", metrics.utilization * 100.0);

    drop((a, b, c));
    pool.shutdown().await;
}

async fn errors() {
    println!("3. Errors:");
    let pool = Pool::new(
        counting_manager("slot"),
        PoolConfig::fixed(1).with_acquire_timeout(Duration::from_millis(100)),
    );

    let held = pool.get().await.unwrap();
    match pool.get().await {
        Err(PoolError::Timeout(after)) => println!("   Timed out after {:?}", after),
        Err(e) => println!("   Error: {}", e),
        Ok(_) => println!("   Unexpected checkout"),
    }
    drop(held);

    let failing = Pool::fixed(
        manager::from_fn(|| async {
            Err::<u32, _>(std::io::Error::other("connection refused"))
        }),
        1,
    );
    if let Err(e) = failing.get().await {
        println!("   Creation failed: {}\n", e);
    }

    pool.shutdown().await;
    failing.shutdown().await;
}

async fn invalidation() {
    println!("4. Invalidation and Metrics:");
    let pool = Pool::fixed(counting_manager("conn"), 1);

    let broken = pool.get().await.unwrap().clone();
    pool.invalidate(&broken).await;
    println!("   Invalidated: {}", broken);

    let replacement = pool.get().await.unwrap();
    println!("   Replacement: {}", *replacement);
    drop(replacement);

    for (key, value) in pool.export_metrics() {
        println!("   {}: {}", key, value);
    }
    println!();

    pool.shutdown().await;
}
