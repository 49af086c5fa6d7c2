//! Release hooks for instances owned by a scope or the root container.

/// Synchronous cleanup run when the owner of an instance ends.
///
/// Scoped instances are released when their scope ends, singletons when
/// the container shuts down. Hooks run newest first.
///
/// # Examples
///
/// ```
/// use scoped_registry::{Registry, Release, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Connection {
///     closed: Arc<AtomicBool>,
/// }
///
/// impl Release for Connection {
///     fn release(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
///
/// let mut registry = Registry::new();
/// registry
///     .add_scoped::<Connection, _>(move |_| Connection { closed: flag.clone() })
///     .unwrap()
///     .releasable();
/// let container = registry.build().unwrap();
///
/// let scope = container.create_scope();
/// scope.resolve::<Connection>().unwrap();
/// scope.end();
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub trait Release: Send + Sync + 'static {
    fn release(&self);
}

/// Asynchronous cleanup, run by [`Scope::end_async`](crate::Scope::end_async)
/// and [`Container::shutdown_async`](crate::Container::shutdown_async).
///
/// A synchronous end cannot await these hooks; they are skipped with a
/// warning in that case.
///
/// # Examples
///
/// ```
/// use scoped_registry::AsyncRelease;
/// use async_trait::async_trait;
///
/// struct Client;
///
/// #[async_trait]
/// impl AsyncRelease for Client {
///     async fn release_async(&self) {
///         // flush buffers, close sockets...
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait AsyncRelease: Send + Sync + 'static {
    async fn release_async(&self);
}
