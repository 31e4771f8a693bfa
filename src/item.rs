//! Tracked pool items

use crate::manager::Manager;
use crate::metrics::MetricsTracker;

use parking_lot::Mutex;

pub(crate) type ItemId = u64;

/// A step appended to an item's cleanup
pub(crate) type CleanupHook = Box<dyn FnOnce() + Send>;

/// A unit tracked by the pool: the captured creation outcome plus a
/// cleanup sequence that runs exactly once.
///
/// The borrow count lives in the pool state next to the item so that it is
/// only ever touched under the state lock.
pub(crate) struct PoolItem<M: Manager> {
    id: ItemId,
    outcome: Result<M::Resource, Mutex<Option<M::Error>>>,
    // `None` once finalized
    cleanup: Mutex<Option<Vec<CleanupHook>>>,
}

impl<M: Manager> PoolItem<M> {
    pub fn new(id: ItemId, outcome: Result<M::Resource, M::Error>) -> Self {
        Self {
            id,
            outcome: outcome.map_err(|err| Mutex::new(Some(err))),
            cleanup: Mutex::new(Some(Vec::new())),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn resource(&self) -> Option<&M::Resource> {
        self.outcome.as_ref().ok()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    /// Move the creation error out. Returns `None` for successful items and
    /// for failures that were already observed.
    pub fn take_failure(&self) -> Option<M::Error> {
        match &self.outcome {
            Ok(_) => None,
            Err(slot) => slot.lock().take(),
        }
    }

    /// Append a step to the cleanup sequence. Returns `false` if the item
    /// has already been finalized, in which case the hook is dropped unrun.
    pub fn on_cleanup(&self, hook: CleanupHook) -> bool {
        match self.cleanup.lock().as_mut() {
            Some(hooks) => {
                hooks.push(hook);
                true
            }
            None => false,
        }
    }

    /// Release the underlying resource, then run appended hooks.
    ///
    /// Runs at most once; later calls return immediately.
    pub async fn finalize(&self, manager: &M, metrics: &MetricsTracker) {
        let Some(hooks) = self.cleanup.lock().take() else {
            return;
        };

        if let Ok(resource) = &self.outcome
            && let Err(err) = manager.release(resource).await
        {
            MetricsTracker::increment(&metrics.cleanup_failures);
            tracing::error!(item = self.id, error = ?err, "unhandled error in pool finalizer");
        }

        for hook in hooks {
            hook();
        }
    }
}
