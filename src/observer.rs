//! Observation hooks for constructions and scope lifecycle.
//!
//! Observers see every producer invocation (cache hits are not reported)
//! and every scope end. They run synchronously on the resolving thread, so
//! implementations should stay cheap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capability::Capability;
use crate::error::ContainerError;
use crate::lifetime::Lifetime;

/// Receives construction and scope events.
///
/// All methods have empty defaults; implement the ones you need.
///
/// # Examples
///
/// ```
/// use scoped_registry::{Capability, Lifetime, Registry, ResolveObserver, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Constructions(AtomicUsize);
///
/// impl ResolveObserver for Constructions {
///     fn constructed(&self, _: &Capability, _: Lifetime, _: Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let counter = Arc::new(Constructions::default());
/// let mut registry = Registry::new();
/// registry.add_observer(counter.clone());
/// registry.add_singleton::<u32, _>(|_| 7).unwrap();
/// let container = registry.build().unwrap();
///
/// container.resolve::<u32>().unwrap();
/// container.resolve::<u32>().unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// ```
pub trait ResolveObserver: Send + Sync {
    /// A producer is about to run.
    fn constructing(&self, _capability: &Capability, _lifetime: Lifetime) {}

    /// A producer returned an instance.
    fn constructed(&self, _capability: &Capability, _lifetime: Lifetime, _elapsed: Duration) {}

    /// A producer failed, or one of its dependencies did.
    fn failed(&self, _capability: &Capability, _lifetime: Lifetime, _error: &ContainerError) {}

    /// A scope ended after running `released` release hooks.
    fn scope_ended(&self, _scope_id: u64, _released: usize) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResolveObserver for TracingObserver {
    fn constructing(&self, capability: &Capability, lifetime: Lifetime) {
        tracing::debug!(capability = %capability, %lifetime, "constructing");
    }

    fn constructed(&self, capability: &Capability, lifetime: Lifetime, elapsed: Duration) {
        tracing::debug!(
            capability = %capability,
            %lifetime,
            elapsed_us = elapsed.as_micros() as u64,
            "constructed"
        );
    }

    fn failed(&self, capability: &Capability, lifetime: Lifetime, error: &ContainerError) {
        tracing::warn!(capability = %capability, %lifetime, error = %error, "construction failed");
    }

    fn scope_ended(&self, scope_id: u64, released: usize) {
        tracing::debug!(scope_id, released, "scope ended");
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolveObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ResolveObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Returns the start time only when somebody is listening.
    pub(crate) fn constructing(&self, capability: &Capability, lifetime: Lifetime) -> Option<Instant> {
        if self.is_empty() {
            return None;
        }
        for o in &self.observers {
            o.constructing(capability, lifetime);
        }
        Some(Instant::now())
    }

    pub(crate) fn constructed(&self, capability: &Capability, lifetime: Lifetime, started: Option<Instant>) {
        if let Some(started) = started {
            let elapsed = started.elapsed();
            for o in &self.observers {
                o.constructed(capability, lifetime, elapsed);
            }
        }
    }

    pub(crate) fn failed(&self, capability: &Capability, lifetime: Lifetime, error: &ContainerError) {
        for o in &self.observers {
            o.failed(capability, lifetime, error);
        }
    }

    pub(crate) fn scope_ended(&self, scope_id: u64, released: usize) {
        for o in &self.observers {
            o.scope_ended(scope_id, released);
        }
    }
}
