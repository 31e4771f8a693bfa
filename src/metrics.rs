//! Metrics collection for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Point-in-time view of a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{manager, Pool, PoolConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pool = Pool::new(
///     manager::from_fn(|| async { Ok::<_, String>(1) }),
///     PoolConfig::new().with_max_size(3),
/// );
///
/// let guard = pool.get().await.unwrap();
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_checkouts, 1);
/// assert_eq!(metrics.in_use, 1);
/// drop(guard);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PoolMetrics {
    /// Items currently tracked by the pool
    pub items: usize,

    /// Items eligible for an immediate checkout
    pub available: usize,

    /// Items marked for removal once their borrowers return them
    pub invalidated: usize,

    /// Sum of borrow counts over all items
    pub in_use: usize,

    /// Desired item count for the current usage
    pub target_size: usize,

    /// Admission permits not held by any checkout
    pub available_permits: usize,

    /// Maximum number of items
    pub max_capacity: usize,

    /// Share of admission permits in use (0.0 to 1.0)
    pub utilization: f64,

    pub is_shutting_down: bool,

    /// Total resources created, including failed creations
    pub total_created: usize,

    /// Total resource creations that failed
    pub creation_failures: usize,

    /// Total successful checkouts
    pub total_checkouts: usize,

    /// Total checkouts returned to the pool
    pub total_returns: usize,

    /// Total items removed by invalidation
    pub total_invalidated: usize,

    /// Errors raised while releasing a resource
    pub cleanup_failures: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("items".to_string(), self.items.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("invalidated".to_string(), self.invalidated.to_string());
        metrics.insert("in_use".to_string(), self.in_use.to_string());
        metrics.insert("target_size".to_string(), self.target_size.to_string());
        metrics.insert("available_permits".to_string(), self.available_permits.to_string());
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("is_shutting_down".to_string(), self.is_shutting_down.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("creation_failures".to_string(), self.creation_failures.to_string());
        metrics.insert("total_checkouts".to_string(), self.total_checkouts.to_string());
        metrics.insert("total_returns".to_string(), self.total_returns.to_string());
        metrics.insert("total_invalidated".to_string(), self.total_invalidated.to_string());
        metrics.insert("cleanup_failures".to_string(), self.cleanup_failures.to_string());
        metrics
    }
}

/// Structural counts read under the pool's state lock
pub(crate) struct StateSnapshot {
    pub items: usize,
    pub available: usize,
    pub invalidated: usize,
    pub in_use: usize,
    pub target_size: usize,
    pub is_shutting_down: bool,
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub created: AtomicUsize,
    pub creation_failures: AtomicUsize,
    pub checkouts: AtomicUsize,
    pub returns: AtomicUsize,
    pub invalidations: AtomicUsize,
    pub cleanup_failures: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(
        &self,
        state: StateSnapshot,
        available_permits: usize,
        admission_permits: usize,
        max_capacity: usize,
    ) -> PoolMetrics {
        let utilization = if admission_permits > 0 {
            admission_permits.saturating_sub(available_permits) as f64 / admission_permits as f64
        } else {
            0.0
        };

        PoolMetrics {
            items: state.items,
            available: state.available,
            invalidated: state.invalidated,
            in_use: state.in_use,
            target_size: state.target_size,
            available_permits,
            max_capacity,
            utilization,
            is_shutting_down: state.is_shutting_down,
            total_created: self.created.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            total_checkouts: self.checkouts.load(Ordering::Relaxed),
            total_returns: self.returns.load(Ordering::Relaxed),
            total_invalidated: self.invalidations.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
        }
    }
}
