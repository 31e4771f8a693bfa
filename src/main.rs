// EsoxSolutions.ResourcePool
// Concurrent resource pool with scoped checkouts and time-to-live eviction

// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use esox_resourcepool::{manager, Pool, PoolConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ResourcePool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let pool = Pool::new(
        manager::from_fn(move || {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, std::io::Error>(format!("connection-{}", id)) }
        }),
        PoolConfig::new().with_size_range(1, 3),
    );

    println!("Quick Demo:");
    match pool.get().await {
        Ok(conn) => println!("  Got resource: {}", *conn),
        Err(e) => println!("  Error: {}", e),
    }

    let metrics = pool.get_metrics();
    println!("  Items after return: {} ({} available)", metrics.items, metrics.available);

    pool.shutdown().await;
    println!("  Pool shut down: {}", pool.is_shutting_down());
}
