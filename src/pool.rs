//! Public pool handle and checkout guard

use crate::config::{PoolConfig, TimeToLiveStrategy};
use crate::errors::{PoolError, PoolResult};
use crate::item::PoolItem;
use crate::manager::Manager;
use crate::metrics::PoolMetrics;
use crate::pool_core::PoolCore;

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A checked-out resource that returns to the pool when dropped
///
/// With `permits_per_item > 1` several guards may point at the same
/// resource, so only shared access is handed out.
pub struct PoolGuard<M: Manager> {
    core: Arc<PoolCore<M>>,
    item: Arc<PoolItem<M>>,
    returned: bool,
}

impl<M: Manager> PoolGuard<M> {
    pub(crate) fn new(core: Arc<PoolCore<M>>, item: Arc<PoolItem<M>>) -> Self {
        Self {
            core,
            item,
            returned: false,
        }
    }

    /// Return the resource and wait until the pool has processed the return,
    /// including the removal of an invalidated item.
    pub async fn release(mut self) {
        self.returned = true;
        if let Some(handle) = self.core.return_item(self.item.id()) {
            let _ = handle.await;
        }
    }
}

impl<M: Manager> Deref for PoolGuard<M> {
    type Target = M::Resource;

    fn deref(&self) -> &Self::Target {
        self.item
            .resource()
            .expect("checked-out items always hold a resource")
    }
}

impl<M: Manager> Drop for PoolGuard<M> {
    fn drop(&mut self) {
        if !self.returned {
            self.returned = true;
            drop(self.core.return_item(self.item.id()));
        }
    }
}

impl<M> fmt::Debug for PoolGuard<M>
where
    M: Manager,
    M::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolGuard")
            .field("item", &self.item.id())
            .field("resource", &self.item.resource())
            .finish()
    }
}

/// Aborts the background tasks and shuts the pool down once the last
/// [`Pool`] handle is dropped.
struct Lifetime<M: Manager> {
    core: Arc<PoolCore<M>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<M: Manager> Drop for Lifetime<M> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        let core = Arc::clone(&self.core);
        drop(self.core.runtime().spawn(async move { core.shutdown().await }));
    }
}

/// Concurrent resource pool that grows on demand between `min_size` and
/// `max_size`, shares each item among up to `permits_per_item` borrowers and
/// optionally retires items by time-to-live.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{manager, Pool, PoolConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pool = Pool::new(
///     manager::from_fn(|| async { Ok::<_, std::io::Error>(String::from("conn")) }),
///     PoolConfig::new().with_size_range(1, 4),
/// );
///
/// {
///     let conn = pool.get().await.unwrap();
///     assert_eq!(conn.as_str(), "conn");
///     // returned to the pool when `conn` goes out of scope
/// }
///
/// pool.shutdown().await;
/// assert!(pool.get().await.unwrap_err().is_closed());
/// # }
/// ```
pub struct Pool<M: Manager> {
    core: Arc<PoolCore<M>>,
    _lifetime: Arc<Lifetime<M>>,
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            _lifetime: Arc::clone(&self._lifetime),
        }
    }
}

impl<M: Manager> fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", self.core.config())
            .field("metrics", &self.core.get_metrics())
            .finish()
    }
}

impl<M: Manager> Pool<M> {
    /// Create a pool and start filling it to `min_size` in the background.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(manager: M, config: PoolConfig) -> Self {
        let core = Arc::new(PoolCore::new(manager, config));

        let resizer = {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.resize().await })
        };
        let evictor = {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.strategy().run(&*core).await })
        };

        tracing::debug!(
            min_size = core.config().min_size,
            max_size = core.config().max_size,
            permits_per_item = core.config().permits_per_item,
            "created resource pool"
        );

        Self {
            _lifetime: Arc::new(Lifetime {
                core: Arc::clone(&core),
                tasks: vec![resizer, evictor],
            }),
            core,
        }
    }

    /// Fixed-size pool without eviction
    pub fn fixed(manager: M, size: usize) -> Self {
        Self::new(manager, PoolConfig::fixed(size))
    }

    /// Pool whose items are retired by time-to-live
    pub fn with_ttl(
        manager: M,
        min_size: usize,
        max_size: usize,
        ttl: Duration,
        strategy: TimeToLiveStrategy,
    ) -> Self {
        Self::new(
            manager,
            PoolConfig::new()
                .with_size_range(min_size, max_size)
                .with_ttl(ttl)
                .with_ttl_strategy(strategy),
        )
    }

    /// Borrow a resource, creating one if the pool has room.
    ///
    /// Waits for admission while the pool is saturated, bounded by the
    /// configured `acquire_timeout`. A failed creation is returned as
    /// [`PoolError::Creation`].
    pub async fn get(&self) -> PoolResult<PoolGuard<M>, M::Error> {
        match self.core.config().acquire_timeout {
            Some(timeout) => self.get_with_timeout(timeout).await,
            None => self.core.checkout().await,
        }
    }

    /// Borrow a resource, giving up after `timeout`
    pub async fn get_with_timeout(&self, timeout: Duration) -> PoolResult<PoolGuard<M>, M::Error> {
        tokio::time::timeout(timeout, self.core.checkout())
            .await
            .map_err(|_| PoolError::Timeout(timeout))?
    }

    /// Evict the item holding `value`.
    ///
    /// An idle item is released immediately and replaced if the pool drops
    /// below its target size; a busy one is released once its last borrower
    /// returns it. Does nothing while shutting down.
    pub async fn invalidate(&self, value: &M::Resource)
    where
        M::Resource: PartialEq,
    {
        let Some(id) = self.core.find(value) else {
            return;
        };
        let core = Arc::clone(&self.core);
        let task = self.core.runtime().spawn(async move { core.invalidate_item(id).await });
        if let Err(err) = task.await {
            tracing::warn!(item = id, error = %err, "invalidation task did not complete");
        }
    }

    /// Stop handing out resources and release every item once all borrowers
    /// have returned theirs. Idempotent.
    pub async fn shutdown(&self) {
        let core = Arc::clone(&self.core);
        let task = self.core.runtime().spawn(async move { core.shutdown().await });
        if let Err(err) = task.await {
            tracing::warn!(error = %err, "shutdown task did not complete");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.core.is_shutting_down()
    }

    pub fn config(&self) -> &PoolConfig {
        self.core.config()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.core.get_metrics()
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }
}
