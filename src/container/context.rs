//! Resolver handed to producers.

use std::fmt;

use crate::capability::Capability;
use crate::container::{Container, Scope};
use crate::error::ContainerResult;
use crate::internal::{BoxFutureUnit, Frame};
use crate::registration::AnyArc;
use crate::traits::ResolveCore;

#[derive(Clone, Copy)]
pub(crate) enum Owner<'a> {
    Root(&'a Container),
    Scope(&'a Scope),
}

/// What a producer sees while it builds an instance.
///
/// Resolutions made through the context go to the owner of the instance
/// under construction: the root container for singletons (and transients
/// resolved from the root), the scope otherwise. The context also carries
/// the chain of capabilities currently being built, which is how cycles are
/// caught.
///
/// # Examples
///
/// ```
/// use scoped_registry::{Registry, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Repository { config: Arc<Config> }
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<Config, _>(|_| Config { url: "mem://".into() }).unwrap();
/// registry
///     .try_add_scoped::<Repository, _>(|ctx| {
///         assert!(ctx.scope_id().is_some());
///         Ok(Repository { config: ctx.resolve::<Config>()? })
///     })
///     .unwrap()
///     .depends_on::<Config>();
///
/// let container = registry.build().unwrap();
/// let repo = container.create_scope().resolve::<Repository>().unwrap();
/// assert_eq!(repo.config.url, "mem://");
/// ```
pub struct ResolverContext<'a> {
    owner: Owner<'a>,
    frame: &'a Frame<'a>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(owner: Owner<'a>, frame: &'a Frame<'a>) -> Self {
        Self { owner, frame }
    }

    /// The capability being constructed.
    pub fn capability(&self) -> &Capability {
        self.frame.capability()
    }

    /// Number of constructions on the chain, this one included.
    pub fn depth(&self) -> usize {
        self.frame.depth()
    }

    /// Id of the owning scope, `None` when the owner is the root container.
    pub fn scope_id(&self) -> Option<u64> {
        match self.owner {
            Owner::Root(_) => None,
            Owner::Scope(scope) => Some(scope.id()),
        }
    }
}

impl fmt::Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("capability", self.capability())
            .field("depth", &self.depth())
            .field("scope_id", &self.scope_id())
            .finish()
    }
}

impl ResolveCore for ResolverContext<'_> {
    fn resolve_erased(&self, capability: &Capability) -> ContainerResult<AnyArc> {
        match self.owner {
            Owner::Root(container) => container.resolve_in(capability, Some(self.frame)),
            Owner::Scope(scope) => scope.resolve_in(capability, Some(self.frame)),
        }
    }

    fn push_sync_release(&self, hook: Box<dyn FnOnce() + Send>) {
        match self.owner {
            Owner::Root(container) => container.push_sync_release(hook),
            Owner::Scope(scope) => scope.push_sync_release(hook),
        }
    }

    fn push_async_release(&self, hook: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        match self.owner {
            Owner::Root(container) => container.push_async_release(hook),
            Owner::Scope(scope) => scope.push_async_release(hook),
        }
    }
}
