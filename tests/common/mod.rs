//! Shared test resource manager that records every creation and release.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use esox_resourcepool::Manager;
use parking_lot::Mutex;

#[derive(Default)]
pub struct Ledger {
    created: AtomicU32,
    released: Mutex<Vec<u32>>,
}

impl Ledger {
    /// Number of `create` calls that completed
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    /// Released resources, sorted
    pub fn released(&self) -> Vec<u32> {
        let mut released = self.released.lock().clone();
        released.sort_unstable();
        released
    }
}

/// Hands out `0, 1, 2, ...` in creation order
pub struct TestManager {
    ledger: Arc<Ledger>,
    fail_first: u32,
    fail_release: bool,
    create_delay: Option<Duration>,
    release_delay: Option<Duration>,
}

impl TestManager {
    pub fn new() -> (Self, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::default());
        let manager = Self {
            ledger: Arc::clone(&ledger),
            fail_first: 0,
            fail_release: false,
            create_delay: None,
            release_delay: None,
        };
        (manager, ledger)
    }

    pub fn failing() -> (Self, Arc<Ledger>) {
        Self::flaky(u32::MAX)
    }

    /// The first `failures` creations fail
    pub fn flaky(failures: u32) -> (Self, Arc<Ledger>) {
        let (mut manager, ledger) = Self::new();
        manager.fail_first = failures;
        (manager, ledger)
    }

    pub fn slow(delay: Duration) -> (Self, Arc<Ledger>) {
        let (mut manager, ledger) = Self::new();
        manager.create_delay = Some(delay);
        (manager, ledger)
    }

    /// `release` takes `delay` and records the resource only once it completes
    pub fn release_after(mut self, delay: Duration) -> Self {
        self.release_delay = Some(delay);
        self
    }

    pub fn failing_release() -> (Self, Arc<Ledger>) {
        let (mut manager, ledger) = Self::new();
        manager.fail_release = true;
        (manager, ledger)
    }
}

#[async_trait]
impl Manager for TestManager {
    type Resource = u32;
    type Error = String;

    async fn create(&self) -> Result<u32, String> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        let id = self.ledger.created.fetch_add(1, Ordering::SeqCst);
        if id < self.fail_first {
            return Err(format!("connection {} refused", id));
        }
        Ok(id)
    }

    async fn release(&self, resource: &u32) -> Result<(), String> {
        if let Some(delay) = self.release_delay {
            tokio::time::sleep(delay).await;
        }
        self.ledger.released.lock().push(*resource);
        if self.fail_release {
            return Err(format!("close of {} failed", resource));
        }
        Ok(())
    }
}
