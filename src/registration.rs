//! Registration records shared by the registry and the container.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use smallvec::SmallVec;

use crate::capability::Capability;
use crate::container::ResolverContext;
use crate::internal::BoxFutureUnit;
use crate::lifetime::Lifetime;
use crate::traits::{AsyncRelease, Release};

// Type-erased instance. Always holds an `Arc<T>` for the registered `T`.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Producer =
    Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> anyhow::Result<AnyArc> + Send + Sync>;

#[cfg(feature = "performance")]
pub(crate) type CapabilityMap<V> = HashMap<Capability, V, ahash::RandomState>;
#[cfg(not(feature = "performance"))]
pub(crate) type CapabilityMap<V> = HashMap<Capability, V>;

pub(crate) type Dependencies = SmallVec<[Capability; 4]>;

/// How an instance is handed back to its owner when the owner ends.
#[derive(Clone, Copy)]
pub(crate) enum ReleaseKind {
    Sync(fn(&AnyArc) -> Option<Box<dyn FnOnce() + Send>>),
    Async(fn(&AnyArc) -> Option<Box<dyn FnOnce() -> BoxFutureUnit + Send>>),
}

impl ReleaseKind {
    pub(crate) fn sync_for<T: ?Sized + Release>() -> Self {
        ReleaseKind::Sync(sync_hook::<T>)
    }

    pub(crate) fn async_for<T: ?Sized + AsyncRelease>() -> Self {
        ReleaseKind::Async(async_hook::<T>)
    }
}

fn sync_hook<T: ?Sized + Release>(instance: &AnyArc) -> Option<Box<dyn FnOnce() + Send>> {
    let instance = instance.downcast_ref::<Arc<T>>()?.clone();
    Some(Box::new(move || instance.release()))
}

fn async_hook<T: ?Sized + AsyncRelease>(
    instance: &AnyArc,
) -> Option<Box<dyn FnOnce() -> BoxFutureUnit + Send>> {
    let instance = instance.downcast_ref::<Arc<T>>()?.clone();
    Some(Box::new(move || -> BoxFutureUnit {
        Box::pin(async move { instance.release_async().await })
    }))
}

pub(crate) struct Registration {
    pub(crate) capability: Capability,
    pub(crate) lifetime: Lifetime,
    pub(crate) producer: Producer,
    pub(crate) dependencies: Dependencies,
    pub(crate) release: Option<ReleaseKind>,
    /// Only ever filled for singletons.
    pub(crate) singleton: OnceCell<AnyArc>,
}

impl Registration {
    pub(crate) fn new(capability: Capability, lifetime: Lifetime, producer: Producer) -> Self {
        Self {
            capability,
            lifetime,
            producer,
            dependencies: Dependencies::new(),
            release: None,
            singleton: OnceCell::new(),
        }
    }

    pub(crate) fn info(&self) -> RegistrationInfo {
        RegistrationInfo {
            name: self.capability.type_name(),
            label: self.capability.label(),
            lifetime: self.lifetime,
            dependencies: self.dependencies.iter().map(Capability::display_name).collect(),
            releasable: self.release.is_some(),
        }
    }
}

/// Read-only description of one registration, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub name: &'static str,
    pub label: Option<&'static str>,
    pub lifetime: Lifetime,
    /// Declared dependencies, in declaration order.
    pub dependencies: Vec<String>,
    pub releasable: bool,
}
