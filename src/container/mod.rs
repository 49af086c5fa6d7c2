//! The built container: root resolver, singleton cache and scope factory.

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capability::Capability;
use crate::config::ContainerOptions;
use crate::error::{ContainerError, ContainerResult};
use crate::internal::{BoxFutureUnit, Drained, Frame, ReleaseBag};
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::registration::{AnyArc, CapabilityMap, Registration, RegistrationInfo, ReleaseKind};
use crate::traits::ResolveCore;

mod context;
mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

pub(crate) use context::Owner;
use scope::EndGuard;

/// Root resolver produced by [`Registry::build`](crate::Registry::build).
///
/// A `Container` is a cheap handle (`Clone` shares the same state) that
/// owns the registrations, the singleton cache and the release hooks of
/// everything it constructed itself. It is `Send + Sync` and may be used
/// from any number of threads.
///
/// # Examples
///
/// ```
/// use scoped_registry::{Registry, Resolver};
/// use std::sync::Arc;
///
/// struct Settings { name: &'static str }
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<Settings, _>(|_| Settings { name: "demo" }).unwrap();
/// let container = registry.build().unwrap();
///
/// let handle = container.clone();
/// let from_thread = std::thread::spawn(move || handle.resolve::<Settings>().unwrap())
///     .join()
///     .unwrap();
/// assert!(Arc::ptr_eq(&from_thread, &container.resolve::<Settings>().unwrap()));
/// assert_eq!(from_thread.name, "demo");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    registrations: CapabilityMap<Registration>,
    order: Vec<Capability>,
    options: ContainerOptions,
    observers: Observers,
    root_releases: Mutex<ReleaseBag>,
    shut_down: AtomicBool,
    next_scope_id: AtomicU64,
}

impl Container {
    pub(crate) fn new(
        registrations: CapabilityMap<Registration>,
        order: Vec<Capability>,
        options: ContainerOptions,
        observers: Observers,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registrations,
                order,
                options,
                observers,
                root_releases: Mutex::new(ReleaseBag::default()),
                shut_down: AtomicBool::new(false),
                next_scope_id: AtomicU64::new(1),
            }),
        }
    }

    /// Opens a new scope.
    ///
    /// Scoped capabilities are cached per scope and released when the scope
    /// ends, either explicitly or when its last handle is dropped.
    pub fn create_scope(&self) -> Scope {
        let id = self.inner.next_scope_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(scope_id = id, "scope created");
        Scope::new(self.clone(), id)
    }

    /// Runs `f` inside a fresh scope and ends the scope afterwards.
    ///
    /// The scope is ended even if `f` panics. Async release hooks cannot be
    /// awaited here; use [`with_scope_async`](Self::with_scope_async) when
    /// scoped instances need them.
    ///
    /// # Examples
    ///
    /// ```
    /// use scoped_registry::{Registry, Resolver};
    ///
    /// struct UnitOfWork;
    ///
    /// let mut registry = Registry::new();
    /// registry.add_scoped::<UnitOfWork, _>(|_| UnitOfWork).unwrap();
    /// let container = registry.build().unwrap();
    ///
    /// let scope = container.with_scope(|scope| {
    ///     scope.resolve::<UnitOfWork>().unwrap();
    ///     scope.clone()
    /// });
    /// assert!(scope.is_ended());
    /// ```
    pub fn with_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scope) -> R,
    {
        let guard = EndGuard::new(self.create_scope());
        f(guard.scope())
    }

    /// Async variant of [`with_scope`](Self::with_scope).
    ///
    /// On normal completion the scope is ended with
    /// [`Scope::end_async`]. If the returned future is dropped early or `f`
    /// panics, the scope still ends, synchronously.
    pub async fn with_scope_async<F, Fut, R>(&self, f: F) -> R
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = R>,
    {
        let guard = EndGuard::new(self.create_scope());
        let out = f(guard.scope().clone()).await;
        guard.scope().end_async().await;
        out
    }

    /// Runs the release hooks of root-owned instances, newest first.
    ///
    /// Only the first call does anything. Async hooks are skipped with a
    /// warning; use [`shutdown_async`](Self::shutdown_async) for those.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            tracing::debug!("container already shut down");
            return;
        }
        let mut bag = mem::take(&mut *self.inner.root_releases.lock());
        let drained = bag.drain_sync();
        report_root_drain(drained);
    }

    /// Runs the release hooks of root-owned instances, awaiting async ones.
    pub async fn shutdown_async(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            tracing::debug!("container already shut down");
            return;
        }
        let mut bag = mem::take(&mut *self.inner.root_releases.lock());
        let drained = bag.drain_async().await;
        report_root_drain(drained);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    pub fn is_registered(&self, capability: &Capability) -> bool {
        self.inner.registrations.contains_key(capability)
    }

    /// Every registration, in the order it was made.
    pub fn registrations(&self) -> Vec<RegistrationInfo> {
        self.inner
            .order
            .iter()
            .filter_map(|c| self.inner.registrations.get(c))
            .map(Registration::info)
            .collect()
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    pub(crate) fn registration(&self, capability: &Capability) -> ContainerResult<&Registration> {
        self.inner
            .registrations
            .get(capability)
            .ok_or_else(|| ContainerError::UnresolvedCapability {
                name: capability.display_name(),
            })
    }

    pub(crate) fn enter<'f>(
        &self,
        parent: Option<&'f Frame<'f>>,
        capability: Capability,
    ) -> ContainerResult<Frame<'f>> {
        Frame::enter(parent, capability, self.inner.options.max_depth)
    }

    pub(crate) fn resolve_in(
        &self,
        capability: &Capability,
        parent: Option<&Frame<'_>>,
    ) -> ContainerResult<AnyArc> {
        let reg = self.registration(capability)?;
        match reg.lifetime {
            Lifetime::Singleton => self.resolve_singleton(reg, parent),
            Lifetime::Transient => {
                let frame = self.enter(parent, reg.capability)?;
                self.construct(reg, Owner::Root(self), &frame)
            }
            Lifetime::Scoped => Err(ContainerError::ScopeRequired {
                name: reg.capability.display_name(),
            }),
        }
    }

    /// Returns the cached singleton or builds it exactly once.
    ///
    /// The frame is entered before the cell is touched, so a cycle back
    /// into a singleton under construction is reported instead of blocking
    /// on its own initialisation.
    pub(crate) fn resolve_singleton(
        &self,
        reg: &Registration,
        parent: Option<&Frame<'_>>,
    ) -> ContainerResult<AnyArc> {
        if let Some(instance) = reg.singleton.get() {
            return Ok(instance.clone());
        }
        let frame = self.enter(parent, reg.capability)?;
        reg.singleton
            .get_or_try_init(|| self.construct(reg, Owner::Root(self), &frame))
            .cloned()
    }

    /// Invokes the producer and hands the release hook to the owner.
    pub(crate) fn construct(
        &self,
        reg: &Registration,
        owner: Owner<'_>,
        frame: &Frame<'_>,
    ) -> ContainerResult<AnyArc> {
        let ctx = ResolverContext::new(owner, frame);
        let observers = &self.inner.observers;
        let started = observers.constructing(&reg.capability, reg.lifetime);
        tracing::trace!(
            capability = %reg.capability,
            lifetime = %reg.lifetime,
            depth = frame.depth(),
            "constructing"
        );

        match (reg.producer)(&ctx) {
            Ok(instance) => {
                match reg.release {
                    Some(ReleaseKind::Sync(hook_for)) => {
                        if let Some(hook) = hook_for(&instance) {
                            ctx.push_sync_release(hook);
                        }
                    }
                    Some(ReleaseKind::Async(hook_for)) => {
                        if let Some(hook) = hook_for(&instance) {
                            ctx.push_async_release(hook);
                        }
                    }
                    None => {}
                }
                observers.constructed(&reg.capability, reg.lifetime, started);
                Ok(instance)
            }
            Err(source) => {
                let err = ContainerError::from_producer(&reg.capability.display_name(), source);
                observers.failed(&reg.capability, reg.lifetime, &err);
                Err(err)
            }
        }
    }
}

fn report_root_drain(drained: Drained) {
    if drained.skipped_async > 0 {
        tracing::warn!(
            skipped = drained.skipped_async,
            "async release hooks skipped by synchronous shutdown"
        );
    }
    if drained.panicked > 0 {
        tracing::warn!(panicked = drained.panicked, "release hooks panicked during shutdown");
    }
    tracing::debug!(released = drained.released, "container shut down");
}

impl ResolveCore for Container {
    fn resolve_erased(&self, capability: &Capability) -> ContainerResult<AnyArc> {
        self.resolve_in(capability, None)
    }

    fn push_sync_release(&self, hook: Box<dyn FnOnce() + Send>) {
        if self.is_shut_down() {
            hook();
            return;
        }
        self.inner.root_releases.lock().push_sync(hook);
    }

    fn push_async_release(&self, hook: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        if self.is_shut_down() {
            tracing::warn!("async release hook registered after shutdown; dropped");
            return;
        }
        self.inner.root_releases.lock().push_async(hook);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.inner.order.len())
            .field("observers", &!self.inner.observers.is_empty())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if *self.shut_down.get_mut() {
            return;
        }
        let bag = self.root_releases.get_mut();
        if bag.is_empty() {
            return;
        }
        let drained = bag.drain_sync();
        report_root_drain(drained);
    }
}
