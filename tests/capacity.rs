//! Capacity, permit accounting, shared borrowing and sizing.

mod common;

use std::time::Duration;

use common::TestManager;
use esox_resourcepool::{Pool, PoolConfig, TimeToLiveStrategy};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_return_every_permit() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::new(manager, PoolConfig::new().with_size_range(0, 4));

    let mut tasks = Vec::new();
    for _ in 0..64 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let guard = pool.get().await.unwrap();
            tokio::task::yield_now().await;

            let metrics = pool.get_metrics();
            assert!(metrics.items <= 4, "items = {}", metrics.items);
            assert!(metrics.in_use <= 4, "in_use = {}", metrics.in_use);
            drop(guard);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let metrics = pool.get_metrics();
    assert_eq!(metrics.available_permits, 4);
    assert_eq!(metrics.in_use, 0);
    assert_eq!(metrics.total_checkouts, 64);
    assert_eq!(metrics.total_returns, 64);
    assert!(ledger.created() <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_items_never_exceed_capacity() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::new(
        manager,
        PoolConfig::new().with_size_range(1, 3).with_permits_per_item(2),
    );

    let mut tasks = Vec::new();
    for _ in 0..48 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let guard = pool.get().await.unwrap();
            tokio::time::sleep(Duration::from_millis(1)).await;

            let metrics = pool.get_metrics();
            assert!(metrics.items <= 3, "items = {}", metrics.items);
            assert!(metrics.in_use <= 6, "in_use = {}", metrics.in_use);
            drop(guard);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(pool.get_metrics().available_permits, 6);
    assert!(ledger.created() <= 3);
}

#[tokio::test(start_paused = true)]
async fn permits_per_item_share_a_single_item() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::new(
        manager,
        PoolConfig::new().with_size_range(0, 1).with_permits_per_item(2),
    );

    let first = pool.get().await.unwrap();
    let second = pool.get().await.unwrap();
    assert_eq!(*first, 0);
    assert_eq!(*second, 0);
    assert_eq!(ledger.created(), 1);

    let third = pool.clone();
    let waiter = tokio::spawn(async move { *third.get().await.unwrap() });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    drop(first);
    assert_eq!(waiter.await.unwrap(), 0);
    assert_eq!(ledger.created(), 1);
    drop(second);
}

#[tokio::test(start_paused = true)]
async fn usage_ttl_shrinks_back_to_min_size() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::with_ttl(manager, 2, 5, Duration::from_secs(1), TimeToLiveStrategy::Usage);

    let mut guards = Vec::new();
    for _ in 0..5 {
        guards.push(pool.get().await.unwrap());
    }
    assert_eq!(pool.get_metrics().items, 5);
    assert_eq!(pool.get_metrics().target_size, 5);

    guards.clear();
    assert_eq!(pool.get_metrics().target_size, 2);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let metrics = pool.get_metrics();
    assert_eq!(metrics.items, 2);
    assert_eq!(metrics.total_invalidated, 3);
    assert_eq!(ledger.released(), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn pool_without_eviction_keeps_peak_size() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::new(manager, PoolConfig::new().with_size_range(2, 5));

    let mut guards = Vec::new();
    for _ in 0..5 {
        guards.push(pool.get().await.unwrap());
    }
    guards.clear();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let metrics = pool.get_metrics();
    assert_eq!(metrics.items, 5);
    assert_eq!(metrics.available, 5);
    assert!(ledger.released().is_empty());
}

#[tokio::test(start_paused = true)]
async fn pool_fills_to_min_size_in_background() {
    let (manager, ledger) = TestManager::new();
    let pool = Pool::new(manager, PoolConfig::new().with_size_range(3, 6));

    tokio::time::sleep(Duration::from_millis(10)).await;
    let metrics = pool.get_metrics();
    assert_eq!(metrics.items, 3);
    assert_eq!(metrics.available, 3);
    assert_eq!(ledger.created(), 3);
}
