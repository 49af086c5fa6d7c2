//! Scopes: one cache of scoped instances per unit of work.

use std::fmt;
use std::mem;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::capability::Capability;
use crate::container::{Container, Owner};
use crate::error::{ContainerError, ContainerResult};
use crate::internal::{BoxFutureUnit, Drained, Frame, ReleaseBag};
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, CapabilityMap, Registration};
use crate::traits::ResolveCore;

/// A bounded unit of work with its own cache of scoped instances.
///
/// `Scope` is a handle: clones share the same cache and the same end state.
/// The scope ends when [`end`](Self::end) or [`end_async`](Self::end_async)
/// is called, or when the last handle is dropped. Ending runs the release
/// hooks of every instance the scope owns, newest first, then drops its
/// cache.
///
/// # Examples
///
/// ```
/// use scoped_registry::{ContainerError, Registry, Resolver};
/// use std::sync::Arc;
///
/// struct RequestContext;
///
/// let mut registry = Registry::new();
/// registry.add_scoped::<RequestContext, _>(|_| RequestContext).unwrap();
/// let container = registry.build().unwrap();
///
/// let scope = container.create_scope();
/// let a = scope.resolve::<RequestContext>().unwrap();
/// let b = scope.clone().resolve::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// scope.end();
/// assert!(matches!(
///     scope.resolve::<RequestContext>(),
///     Err(ContainerError::ScopeClosed { .. })
/// ));
/// ```
#[derive(Clone)]
pub struct Scope {
    shared: Arc<ScopeShared>,
}

struct ScopeShared {
    id: u64,
    container: Container,
    state: Mutex<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    slots: CapabilityMap<Arc<OnceCell<AnyArc>>>,
    releases: ReleaseBag,
    ended: bool,
}

impl ScopeState {
    /// Marks the state ended and hands back what has to be released.
    /// `None` when it had already ended.
    fn close(&mut self) -> Option<(ReleaseBag, CapabilityMap<Arc<OnceCell<AnyArc>>>)> {
        if self.ended {
            return None;
        }
        self.ended = true;
        Some((mem::take(&mut self.releases), mem::take(&mut self.slots)))
    }
}

impl Scope {
    pub(crate) fn new(container: Container, id: u64) -> Self {
        Self {
            shared: Arc::new(ScopeShared {
                id,
                container,
                state: Mutex::new(ScopeState::default()),
            }),
        }
    }

    /// Process-unique id, also used in log events.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn is_ended(&self) -> bool {
        self.shared.state.lock().ended
    }

    /// The container this scope was created from.
    pub fn container(&self) -> &Container {
        &self.shared.container
    }

    /// Ends the scope, running sync release hooks newest first.
    ///
    /// Async hooks cannot be awaited here and are skipped with a warning.
    /// Calling `end` on a scope that has already ended does nothing.
    pub fn end(&self) {
        let closed = self.shared.state.lock().close();
        let Some((mut releases, slots)) = closed else {
            tracing::debug!(scope_id = self.id(), "scope already ended");
            return;
        };
        let drained = releases.drain_sync();
        drop(slots);
        self.shared.report(drained);
    }

    /// Ends the scope, awaiting async release hooks in order.
    pub async fn end_async(&self) {
        let closed = self.shared.state.lock().close();
        let Some((mut releases, slots)) = closed else {
            tracing::debug!(scope_id = self.id(), "scope already ended");
            return;
        };
        let drained = releases.drain_async().await;
        drop(slots);
        self.shared.report(drained);
    }

    pub(crate) fn resolve_in(
        &self,
        capability: &Capability,
        parent: Option<&Frame<'_>>,
    ) -> ContainerResult<AnyArc> {
        if self.is_ended() {
            return Err(ContainerError::ScopeClosed { scope_id: self.id() });
        }
        let container = self.container();
        let reg = container.registration(capability)?;
        match reg.lifetime {
            Lifetime::Singleton => container.resolve_singleton(reg, parent),
            Lifetime::Transient => {
                let frame = container.enter(parent, reg.capability)?;
                container.construct(reg, Owner::Scope(self), &frame)
            }
            Lifetime::Scoped => self.resolve_scoped(reg, parent),
        }
    }

    fn resolve_scoped(&self, reg: &Registration, parent: Option<&Frame<'_>>) -> ContainerResult<AnyArc> {
        let slot = {
            let mut state = self.shared.state.lock();
            if state.ended {
                return Err(ContainerError::ScopeClosed { scope_id: self.id() });
            }
            state.slots.entry(reg.capability).or_default().clone()
        };
        if let Some(instance) = slot.get() {
            return Ok(instance.clone());
        }

        let container = self.container();
        let frame = container.enter(parent, reg.capability)?;
        slot.get_or_try_init(|| container.construct(reg, Owner::Scope(self), &frame))
            .cloned()
    }
}

impl ScopeShared {
    fn report(&self, drained: Drained) {
        if drained.skipped_async > 0 {
            tracing::warn!(
                scope_id = self.id,
                skipped = drained.skipped_async,
                "async release hooks skipped; end the scope with end_async"
            );
        }
        if drained.panicked > 0 {
            tracing::warn!(scope_id = self.id, panicked = drained.panicked, "release hooks panicked");
        }
        self.container.observers().scope_ended(self.id, drained.released);
        tracing::debug!(scope_id = self.id, released = drained.released, "scope ended");
    }
}

impl Drop for ScopeShared {
    fn drop(&mut self) {
        if let Some((mut releases, slots)) = self.state.get_mut().close() {
            let drained = releases.drain_sync();
            drop(slots);
            self.report(drained);
        }
    }
}

impl ResolveCore for Scope {
    fn resolve_erased(&self, capability: &Capability) -> ContainerResult<AnyArc> {
        self.resolve_in(capability, None)
    }

    /// Hooks arriving after the scope ended run straight away.
    fn push_sync_release(&self, hook: Box<dyn FnOnce() + Send>) {
        let mut state = self.shared.state.lock();
        if !state.ended {
            state.releases.push_sync(hook);
            return;
        }
        drop(state);
        hook();
    }

    fn push_async_release(&self, hook: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        let mut state = self.shared.state.lock();
        if state.ended {
            tracing::warn!(scope_id = self.id(), "async release hook registered on an ended scope; dropped");
            return;
        }
        state.releases.push_async(hook);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Ends its scope when dropped.
pub(crate) struct EndGuard {
    scope: Scope,
}

impl EndGuard {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for EndGuard {
    fn drop(&mut self) {
        self.scope.end();
    }
}
