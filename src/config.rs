//! Pool configuration options

use std::time::Duration;
use tokio::sync::Semaphore;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which clock a time-to-live is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TimeToLiveStrategy {
    /// Items expire a fixed duration after they were created
    Creation,

    /// Items above the target size are retired once per interval, oldest first
    #[default]
    Usage,
}

/// Configuration for resource pool behavior
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfig, TimeToLiveStrategy};
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_size_range(2, 8)
///     .with_permits_per_item(4)
///     .with_ttl(Duration::from_secs(300))
///     .with_ttl_strategy(TimeToLiveStrategy::Creation);
///
/// assert_eq!(config.max_size, 8);
/// assert_eq!(config.permits_per_item, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Number of items the pool keeps alive even when idle
    pub min_size: usize,

    /// Upper bound on the number of items tracked by the pool
    pub max_size: usize,

    /// How many concurrent borrowers may share one item
    pub permits_per_item: usize,

    /// Time-to-live for items; `None` disables eviction
    pub time_to_live: Option<Duration>,

    /// Clock used by the time-to-live eviction
    pub time_to_live_strategy: TimeToLiveStrategy,

    /// Upper bound on how long `get` waits; `None` waits indefinitely
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: 10,
            permits_per_item: 1,
            time_to_live: None,
            time_to_live_strategy: TimeToLiveStrategy::default(),
            acquire_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a fixed-size pool without eviction
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfig;
    ///
    /// let config = PoolConfig::fixed(4);
    /// assert_eq!((config.min_size, config.max_size), (4, 4));
    /// assert!(config.time_to_live.is_none());
    /// ```
    pub fn fixed(size: usize) -> Self {
        Self::default().with_size_range(size, size)
    }

    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Set both size bounds at once
    pub fn with_size_range(mut self, min: usize, max: usize) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_permits_per_item(mut self, permits: usize) -> Self {
        self.permits_per_item = permits;
        self
    }

    /// Set time-to-live for items
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_ttl_strategy(mut self, strategy: TimeToLiveStrategy) -> Self {
        self.time_to_live_strategy = strategy;
        self
    }

    /// Set the acquire timeout applied by `get`
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Total number of concurrent checkouts the pool admits
    pub fn admission_permits(&self) -> usize {
        self.permits_per_item.saturating_mul(self.max_size)
    }

    /// Clamp out-of-range values so that `1 <= permits_per_item`,
    /// `1 <= max_size`, `min_size <= max_size` and the admission capacity
    /// fits in a semaphore.
    pub fn normalized(mut self) -> Self {
        if self.permits_per_item == 0 {
            tracing::warn!("permits_per_item must be at least 1, using 1");
            self.permits_per_item = 1;
        }
        if self.permits_per_item > Semaphore::MAX_PERMITS {
            tracing::warn!(
                permits_per_item = self.permits_per_item,
                limit = Semaphore::MAX_PERMITS,
                "permits_per_item exceeds the semaphore limit, clamping"
            );
            self.permits_per_item = Semaphore::MAX_PERMITS;
        }
        if self.max_size == 0 {
            tracing::warn!("max_size must be at least 1, using 1");
            self.max_size = 1;
        }
        let limit = Semaphore::MAX_PERMITS / self.permits_per_item;
        if self.max_size > limit {
            tracing::warn!(
                max_size = self.max_size,
                permits_per_item = self.permits_per_item,
                limit,
                "admission capacity exceeds the semaphore limit, clamping max_size"
            );
            self.max_size = limit;
        }
        if self.min_size > self.max_size {
            tracing::warn!(
                min_size = self.min_size,
                max_size = self.max_size,
                "min_size exceeds max_size, clamping"
            );
            self.min_size = self.max_size;
        }
        self
    }
}
