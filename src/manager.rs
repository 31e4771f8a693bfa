//! Resource creation and release

use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// Creates the resources a [`Pool`](crate::Pool) hands out and releases
/// them once the pool retires them.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use esox_resourcepool::Manager;
///
/// struct Connections;
///
/// #[async_trait]
/// impl Manager for Connections {
///     type Resource = String;
///     type Error = std::io::Error;
///
///     async fn create(&self) -> Result<String, std::io::Error> {
///         Ok("conn".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Manager: Send + Sync + 'static {
    type Resource: Send + Sync + 'static;
    type Error: fmt::Debug + Send + Sync + 'static;

    /// Create a new resource
    async fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Release a resource the pool no longer tracks.
    ///
    /// Errors are reported through the log and never reach a caller.
    async fn release(&self, _resource: &Self::Resource) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [`Manager`] backed by a factory closure
pub struct FnManager<F> {
    factory: F,
}

/// Build a [`Manager`] from an async factory
///
/// # Examples
///
/// ```
/// use esox_resourcepool::manager;
///
/// let manager = manager::from_fn(|| async { Ok::<_, std::io::Error>(42) });
/// # let _ = manager;
/// ```
pub fn from_fn<F, Fut, T, E>(factory: F) -> FnManager<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    FnManager { factory }
}

#[async_trait]
impl<F, Fut, T, E> Manager for FnManager<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + Sync + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    type Resource = T;
    type Error = E;

    async fn create(&self) -> Result<T, E> {
        (self.factory)().await
    }
}
