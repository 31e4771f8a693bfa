//! Eviction strategies for proactive item removal

use crate::config::{PoolConfig, TimeToLiveStrategy};
use crate::item::ItemId;
use crate::manager::Manager;
use crate::pool_core::PoolCore;

use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

/// Eviction strategy chosen once when the pool is created.
///
/// `on_acquire` is told about every new item; `run` is the background loop
/// that retires items and lives as long as the pool.
pub(crate) enum Strategy {
    /// No eviction; items only leave through explicit invalidation
    Noop,

    /// Items expire a fixed duration after creation
    CreationTtl(CreationTtl),

    /// Items above the target size are retired each interval
    UsageTtl(UsageTtl),
}

impl Strategy {
    pub fn from_config(config: &PoolConfig) -> Self {
        match (config.time_to_live, config.time_to_live_strategy) {
            (None, _) => Strategy::Noop,
            (Some(ttl), TimeToLiveStrategy::Creation) => {
                Strategy::CreationTtl(CreationTtl::new(ttl))
            }
            (Some(ttl), TimeToLiveStrategy::Usage) => Strategy::UsageTtl(UsageTtl::new(ttl)),
        }
    }

    pub fn on_acquire(&self, id: ItemId) {
        match self {
            Strategy::Noop => {}
            Strategy::CreationTtl(strategy) => strategy.on_acquire(id),
            Strategy::UsageTtl(strategy) => strategy.on_acquire(id),
        }
    }

    pub async fn run<M: Manager>(&self, core: &PoolCore<M>) {
        match self {
            Strategy::Noop => {}
            Strategy::CreationTtl(strategy) => strategy.run(core).await,
            Strategy::UsageTtl(strategy) => strategy.run(core).await,
        }
    }
}

pub(crate) struct CreationTtl {
    ttl: Duration,
    sender: mpsc::UnboundedSender<ItemId>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<ItemId>>,
    created_at: DashMap<ItemId, Instant>,
}

impl CreationTtl {
    fn new(ttl: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            ttl,
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            created_at: DashMap::new(),
        }
    }

    fn on_acquire(&self, id: ItemId) {
        self.created_at.insert(id, Instant::now());
        // the receiver lives as long as `self`
        let _ = self.sender.send(id);
    }

    async fn run<M: Manager>(&self, core: &PoolCore<M>) {
        let mut receiver = self.receiver.lock().await;
        while let Some(id) = receiver.recv().await {
            self.expire(core, id).await;
        }
    }

    /// Wait out the remaining lifetime of `id`, then invalidate it
    async fn expire<M: Manager>(&self, core: &PoolCore<M>, id: ItemId) {
        loop {
            let created = self.created_at.get(&id).map(|entry| *entry.value());
            let Some(created) = created.filter(|_| core.is_pending(id)) else {
                self.created_at.remove(&id);
                return;
            };

            let age = created.elapsed();
            if age >= self.ttl {
                self.created_at.remove(&id);
                tracing::debug!(item = id, ?age, "item outlived its time-to-live");
                core.invalidate_item(id).await;
                return;
            }
            sleep(self.ttl - age).await;
        }
    }
}

pub(crate) struct UsageTtl {
    interval: Duration,
    queue: SegQueue<ItemId>,
}

impl UsageTtl {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            queue: SegQueue::new(),
        }
    }

    fn on_acquire(&self, id: ItemId) {
        self.queue.push(id);
    }

    async fn run<M: Manager>(&self, core: &PoolCore<M>) {
        loop {
            sleep(self.interval).await;
            self.shrink(core).await;
        }
    }

    /// Invalidate the oldest items while the pool is above its target size.
    ///
    /// Ids of items that are already gone or on their way out are dropped
    /// from the queue on every pass, so its length stays bounded by the
    /// live items.
    async fn shrink<M: Manager>(&self, core: &PoolCore<M>) {
        let queued = self.queue.len();
        let mut pending = Vec::with_capacity(queued);
        for _ in 0..queued {
            match self.queue.pop() {
                Some(id) if core.is_pending(id) => pending.push(id),
                Some(_) => {}
                None => break,
            }
        }

        let excess = usize::try_from(core.excess()).unwrap_or(0).min(pending.len());
        let keep = pending.split_off(excess);
        for id in keep {
            self.queue.push(id);
        }

        for id in pending {
            if !core.is_pending(id) {
                continue;
            }
            tracing::debug!(item = id, "retiring excess item");
            core.invalidate_item(id).await;
        }
    }
}
