//! # EsoxSolutions.ResourcePool
//!
//! Concurrent, dynamically sized resource pool for Tokio with scoped
//! checkouts, shared borrowing and time-to-live eviction.
//!
//! ## Features
//!
//! - Pool grows on demand between `min_size` and `max_size`
//! - Automatic return of resources via RAII (Drop trait)
//! - Up to `permits_per_item` concurrent borrowers per resource
//! - Failed resource creation surfaces to the caller without poisoning the pool
//! - Explicit and deferred invalidation of resources
//! - Eviction by creation age or by usage
//! - Graceful shutdown that waits for every borrower
//! - Metrics snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{manager, Pool};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pool = Pool::fixed(manager::from_fn(|| async { Ok::<_, std::io::Error>(7) }), 2);
//! {
//!     let value = pool.get().await.unwrap();
//!     println!("Got: {}", *value);
//!     // Resource automatically returned when `value` goes out of scope
//! }
//! pool.shutdown().await;
//! # }
//! ```

mod config;
mod errors;
mod eviction;
mod item;
pub mod manager;
mod metrics;
mod pool;
mod pool_core;

pub use config::{PoolConfig, TimeToLiveStrategy};
pub use errors::{PoolError, PoolResult};
pub use manager::Manager;
pub use metrics::PoolMetrics;
pub use pool::{Pool, PoolGuard};
