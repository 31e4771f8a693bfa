//! Error types for the resource pool

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`Pool::get`](crate::Pool::get).
///
/// A failed resource creation is an ordinary outcome of a checkout, not a
/// defect of the pool: the broken item has already been purged when the
/// caller sees [`PoolError::Creation`].
#[derive(Error, Debug)]
pub enum PoolError<E> {
    #[error("Resource creation failed: {0:?}")]
    Creation(E),

    #[error("Pool is shut down")]
    Closed,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> PoolError<E> {
    /// Whether the checkout was rejected because the pool is shut down
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }

    /// The creation error, if this is a creation failure
    pub fn into_creation_error(self) -> Option<E> {
        match self {
            PoolError::Creation(err) => Some(err),
            _ => None,
        }
    }
}

pub type PoolResult<T, E> = Result<T, PoolError<E>>;
