//! Pool state, sizing, checkout and shutdown

use crate::config::PoolConfig;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::Strategy;
use crate::item::{ItemId, PoolItem};
use crate::manager::Manager;
use crate::metrics::{MetricsTracker, PoolMetrics, StateSnapshot};
use crate::pool::PoolGuard;

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinHandle;

struct Entry<M: Manager> {
    item: Arc<PoolItem<M>>,
    borrows: usize,
}

/// Item sets and the shutdown latch. Only ever touched under `PoolCore::state`.
struct PoolState<M: Manager> {
    items: BTreeMap<ItemId, Entry<M>>,
    // ordered so that the oldest idle item is handed out first
    available: BTreeSet<ItemId>,
    invalidated: HashSet<ItemId>,
    is_shutting_down: bool,
}

/// Result of the selection step of a checkout.
///
/// Only `Borrowed` registers a return with the caller; every other variant
/// leaves the admission permit owed back to the semaphore.
pub(crate) enum Selected<M: Manager> {
    Borrowed(Arc<PoolItem<M>>),
    Failed(M::Error),
    Closed,
}

impl<M: Manager> Selected<M> {
    pub fn owes_permit(&self) -> bool {
        !matches!(self, Selected::Borrowed(_))
    }
}

impl<M: Manager> PoolState<M> {
    fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            available: BTreeSet::new(),
            invalidated: HashSet::new(),
            is_shutting_down: false,
        }
    }

    fn current_usage(&self) -> usize {
        self.items.values().map(|entry| entry.borrows).sum()
    }

    fn target_size(&self, config: &PoolConfig) -> usize {
        if self.is_shutting_down {
            return 0;
        }
        self.current_usage()
            .div_ceil(config.permits_per_item)
            .clamp(config.min_size, config.max_size)
    }

    fn insert(&mut self, item: &Arc<PoolItem<M>>) {
        let id = item.id();
        self.items.insert(
            id,
            Entry {
                item: Arc::clone(item),
                borrows: 0,
            },
        );
        self.available.insert(id);
    }

    fn remove(&mut self, id: ItemId) -> Option<Arc<PoolItem<M>>> {
        self.available.remove(&id);
        self.invalidated.remove(&id);
        self.items.remove(&id).map(|entry| entry.item)
    }

    /// Next item to hand out, or `None` when a new one has to be allocated.
    ///
    /// With every slot in use the pool shares an invalidated item that still
    /// has spare permits rather than growing beyond `max_size`.
    fn pick(&mut self, config: &PoolConfig) -> Option<Arc<PoolItem<M>>> {
        while let Some(id) = self.available.pop_first() {
            if let Some(entry) = self.items.get(&id) {
                return Some(Arc::clone(&entry.item));
            }
        }
        if self.items.len() < config.max_size {
            return None;
        }
        self.items
            .iter()
            .find(|(id, entry)| {
                self.invalidated.contains(id)
                    && entry.borrows < config.permits_per_item
                    && !entry.item.is_failure()
            })
            .map(|(_, entry)| Arc::clone(&entry.item))
    }

    /// Purge a failed item or register one more borrow of a healthy one.
    /// `None` means the item vanished and selection has to start over.
    fn claim(&mut self, item: Arc<PoolItem<M>>, permits_per_item: usize) -> Option<Selected<M>> {
        let id = item.id();
        if item.is_failure() {
            self.remove(id);
            return item.take_failure().map(Selected::Failed);
        }

        let entry = self.items.get_mut(&id)?;
        entry.borrows += 1;
        let borrows = entry.borrows;

        self.available.remove(&id);
        if borrows < permits_per_item && !self.invalidated.contains(&id) {
            self.available.insert(id);
        }
        Some(Selected::Borrowed(item))
    }

    fn snapshot(&self, config: &PoolConfig) -> StateSnapshot {
        StateSnapshot {
            items: self.items.len(),
            available: self.available.len(),
            invalidated: self.invalidated.len(),
            in_use: self.current_usage(),
            target_size: self.target_size(config),
            is_shutting_down: self.is_shutting_down,
        }
    }
}

/// Shared pool internals behind every [`Pool`](crate::Pool) handle and
/// every outstanding [`PoolGuard`].
pub(crate) struct PoolCore<M: Manager> {
    manager: Arc<M>,
    config: PoolConfig,
    strategy: Strategy,
    state: Mutex<PoolState<M>>,
    /// Bounds concurrent checkouts to `permits_per_item * max_size`
    admission: Semaphore,
    /// Serializes allocation decisions: resize traversals and checkout selection
    resize_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
    metrics: Arc<MetricsTracker>,
    runtime: Handle,
}

impl<M: Manager> PoolCore<M> {
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(manager: M, config: PoolConfig) -> Self {
        let config = config.normalized();
        Self {
            manager: Arc::new(manager),
            strategy: Strategy::from_config(&config),
            state: Mutex::new(PoolState::new()),
            admission: Semaphore::new(config.admission_permits()),
            resize_lock: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(0),
            metrics: Arc::new(MetricsTracker::new()),
            runtime: Handle::current(),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().is_shutting_down
    }

    /// Tracked and not marked for removal
    pub fn is_pending(&self, id: ItemId) -> bool {
        let state = self.state.lock();
        state.items.contains_key(&id) && !state.invalidated.contains(&id)
    }

    /// Items beyond the target size that are not already on their way out
    pub fn excess(&self) -> isize {
        let state = self.state.lock();
        state.items.len() as isize
            - state.invalidated.len() as isize
            - state.target_size(&self.config) as isize
    }

    /// Create one item and start tracking it, whatever the creation outcome.
    ///
    /// Returns `None` when shutdown began while the resource was being
    /// created; such an item is finalized and never tracked.
    pub async fn allocate(&self) -> Option<Arc<PoolItem<M>>> {
        let outcome = self.manager.create().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let item = Arc::new(PoolItem::new(id, outcome));

        let tracked = {
            let mut state = self.state.lock();
            if !state.is_shutting_down {
                state.insert(&item);
            }
            !state.is_shutting_down
        };
        if !tracked {
            tracing::debug!(item = id, "pool shut down during creation, discarding item");
            self.retire(item).await;
            return None;
        }

        MetricsTracker::increment(&self.metrics.created);
        if item.is_failure() {
            MetricsTracker::increment(&self.metrics.creation_failures);
            tracing::debug!(item = id, "resource creation failed");
            item.finalize(&self.manager, &self.metrics).await;
        } else {
            tracing::debug!(item = id, "allocated pool item");
        }
        self.strategy.on_acquire(id);
        Some(item)
    }

    /// Allocate until the pool reaches its target size
    pub async fn resize(&self) {
        let _resizing = self.resize_lock.lock().await;
        loop {
            let reached = {
                let state = self.state.lock();
                state.items.len() >= state.target_size(&self.config)
            };
            if reached || self.allocate().await.is_none() {
                break;
            }
        }
    }

    pub async fn checkout(self: &Arc<Self>) -> PoolResult<PoolGuard<M>, M::Error> {
        if self.is_shutting_down() {
            return Err(PoolError::Closed);
        }
        // Dropping the future while waiting here owes nothing.
        let permit = self
            .admission
            .acquire()
            .await
            .map_err(|_| PoolError::Closed)?;
        let selected = self.select().await;
        self.settle(permit, selected)
    }

    async fn select(&self) -> Selected<M> {
        let _resizing = self.resize_lock.lock().await;
        loop {
            {
                let mut state = self.state.lock();
                if state.is_shutting_down {
                    return Selected::Closed;
                }
                if let Some(item) = state.pick(&self.config) {
                    match state.claim(item, self.config.permits_per_item) {
                        Some(selected) => return selected,
                        None => continue,
                    }
                }
            }

            let Some(item) = self.allocate().await else {
                return Selected::Closed;
            };
            let claimed = self.state.lock().claim(item, self.config.permits_per_item);
            if let Some(selected) = claimed {
                return selected;
            }
        }
    }

    fn settle(
        self: &Arc<Self>,
        permit: SemaphorePermit<'_>,
        selected: Selected<M>,
    ) -> PoolResult<PoolGuard<M>, M::Error> {
        if selected.owes_permit() {
            drop(permit);
        } else {
            // the guard's return releases it
            permit.forget();
        }

        match selected {
            Selected::Borrowed(item) => {
                MetricsTracker::increment(&self.metrics.checkouts);
                Ok(PoolGuard::new(Arc::clone(self), item))
            }
            Selected::Failed(err) => Err(PoolError::Creation(err)),
            Selected::Closed => Err(PoolError::Closed),
        }
    }

    /// Give back one borrow of `id`. Returns `true` when the item is marked
    /// for removal and has to go through [`invalidate_item`](Self::invalidate_item).
    fn begin_return(&self, id: ItemId) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(entry) = state.items.get_mut(&id) else {
            return false;
        };
        entry.borrows = entry.borrows.saturating_sub(1);

        if state.invalidated.contains(&id) {
            return true;
        }
        state.available.insert(id);
        false
    }

    /// Return a checked-out item and release its admission permit.
    ///
    /// The permit is released synchronously unless the item has to be
    /// invalidated first, in which case a task does both and its handle is
    /// returned.
    pub fn return_item(self: &Arc<Self>, id: ItemId) -> Option<JoinHandle<()>> {
        MetricsTracker::increment(&self.metrics.returns);
        if !self.begin_return(id) {
            self.admission.add_permits(1);
            return None;
        }

        let core = Arc::clone(self);
        Some(self.runtime.spawn(async move {
            core.invalidate_item(id).await;
            core.admission.add_permits(1);
        }))
    }

    /// Id of a live item holding `value`
    pub fn find(&self, value: &M::Resource) -> Option<ItemId>
    where
        M::Resource: PartialEq,
    {
        let state = self.state.lock();
        if state.is_shutting_down {
            return None;
        }
        state
            .items
            .values()
            .find(|entry| entry.item.resource() == Some(value))
            .map(|entry| entry.item.id())
    }

    /// Remove an idle item now, or mark a busy one for removal by its last
    /// borrower.
    pub async fn invalidate_item(&self, id: ItemId) {
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match state.items.get(&id).map(|entry| entry.borrows) {
                None => return,
                Some(0) => state.remove(id),
                Some(borrows) => {
                    tracing::debug!(item = id, borrows, "deferring invalidation of busy item");
                    state.invalidated.insert(id);
                    state.available.remove(&id);
                    None
                }
            }
        };

        if let Some(item) = removed {
            MetricsTracker::increment(&self.metrics.invalidations);
            tracing::debug!(item = id, "invalidated pool item");
            self.retire(item).await;
            self.resize().await;
        }
    }

    /// Finalize an item that is no longer tracked.
    ///
    /// The cleanup runs on its own task, so it completes even if the caller
    /// is aborted or dropped while waiting for it.
    async fn retire(&self, item: Arc<PoolItem<M>>) {
        let manager = Arc::clone(&self.manager);
        let metrics = Arc::clone(&self.metrics);
        let id = item.id();
        let task = self
            .runtime
            .spawn(async move { item.finalize(&manager, &metrics).await });
        if let Err(err) = task.await {
            tracing::warn!(item = id, error = %err, "finalizer task did not complete");
        }
    }

    /// Stop handing out items, release idle ones, wait for every borrow to
    /// come back and close admission.
    pub async fn shutdown(&self) {
        let drain = Arc::new(Semaphore::new(0));
        let (idle, busy) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.is_shutting_down {
                return;
            }
            state.is_shutting_down = true;

            let ids: Vec<ItemId> = state.items.keys().copied().collect();
            let mut idle = Vec::new();
            let mut busy = 0u32;
            for id in ids {
                let Some(entry) = state.items.get(&id) else {
                    continue;
                };
                if entry.borrows > 0 {
                    let signal = Arc::clone(&drain);
                    if entry.item.on_cleanup(Box::new(move || signal.add_permits(1))) {
                        busy += 1;
                    }
                    state.invalidated.insert(id);
                    state.available.remove(&id);
                } else if let Some(item) = state.remove(id) {
                    idle.push(item);
                }
            }
            (idle, busy)
        };

        tracing::debug!(idle = idle.len(), busy, "draining pool");
        for item in idle {
            self.retire(item).await;
        }
        if busy > 0
            && let Ok(permits) = drain.acquire_many(busy).await
        {
            permits.forget();
        }

        // wakes every caller still waiting for admission
        self.admission.close();
        tracing::debug!("pool shut down");
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        let snapshot = self.state.lock().snapshot(&self.config);
        self.metrics.get_metrics(
            snapshot,
            self.admission.available_permits(),
            self.config.admission_permits(),
            self.config.max_size,
        )
    }
}
