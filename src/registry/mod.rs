//! Registration phase: collecting capabilities before the container exists.

use std::collections::hash_map::Entry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::Capability;
use crate::config::{ContainerOptions, DuplicatePolicy};
use crate::container::{Container, ResolverContext};
use crate::error::{ContainerError, ContainerResult};
use crate::lifetime::Lifetime;
use crate::observer::{Observers, ResolveObserver};
use crate::registration::{AnyArc, CapabilityMap, Registration, ReleaseKind};
use crate::traits::{AsyncRelease, Release};

mod validation;

/// Mutable table of capability → producer + lifetime.
///
/// Registrations are only possible before [`build`](Self::build), which
/// consumes the registry and hands back an immutable [`Container`].
///
/// # Examples
///
/// ```
/// use scoped_registry::{Registry, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut registry = Registry::new();
/// registry.add_instance(Database { url: "postgres://localhost".into() }).unwrap();
/// registry
///     .try_add_scoped::<UserService, _>(|r| Ok(UserService { db: r.resolve()? }))
///     .unwrap()
///     .depends_on::<Database>();
///
/// let container = registry.build().unwrap();
/// let users = container.create_scope().resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct Registry {
    registrations: CapabilityMap<Registration>,
    order: Vec<Capability>,
    rejected: Vec<Capability>,
    options: ContainerOptions,
    observers: Observers,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_options(ContainerOptions::default())
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            registrations: CapabilityMap::default(),
            order: Vec::new(),
            rejected: Vec::new(),
            options,
            observers: Observers::default(),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn is_registered(&self, capability: &Capability) -> bool {
        self.registrations.contains_key(capability)
    }

    /// Adds an observer notified of every construction and scope end.
    pub fn add_observer(&mut self, observer: Arc<dyn ResolveObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Registers `producer` for `capability` with the given lifetime.
    ///
    /// This is the general form behind every `add_*` method. A capability
    /// that is already registered is rejected with
    /// [`ContainerError::DuplicateRegistration`] unless the options say
    /// [`DuplicatePolicy::Replace`]. A rejected registration also makes
    /// [`build`](Self::build) fail, so ignoring the error does not go
    /// unnoticed.
    ///
    /// `capability` must identify instances of type `T`. Registering a
    /// producer of one type under another type's capability is accepted
    /// here but every resolution then fails with
    /// [`ContainerError::TypeMismatch`].
    pub fn register<T, F>(
        &mut self,
        capability: Capability,
        lifetime: Lifetime,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        let producer = Arc::new(move |ctx: &ResolverContext<'_>| -> anyhow::Result<AnyArc> {
            let instance: Arc<T> = producer(ctx)?;
            Ok(Arc::new(instance))
        });
        let registration = Registration::new(capability, lifetime, producer);

        match self.registrations.entry(capability) {
            Entry::Vacant(slot) => {
                self.order.push(capability);
                Ok(Declared::new(slot.insert(registration)))
            }
            Entry::Occupied(mut slot) => match self.options.duplicate_policy {
                DuplicatePolicy::Replace => {
                    tracing::debug!(capability = %capability, %lifetime, "registration replaced");
                    slot.insert(registration);
                    Ok(Declared::new(slot.into_mut()))
                }
                DuplicatePolicy::Reject => {
                    self.rejected.push(capability);
                    Err(ContainerError::DuplicateRegistration {
                        name: capability.display_name(),
                    })
                }
            },
        }
    }

    fn add_with<T, F>(
        &mut self,
        capability: Capability,
        lifetime: Lifetime,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.register(capability, lifetime, move |ctx: &ResolverContext<'_>| {
            Ok(Arc::new(producer(ctx)))
        })
    }

    fn try_add_with<T, F>(
        &mut self,
        capability: Capability,
        lifetime: Lifetime,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.register(capability, lifetime, move |ctx: &ResolverContext<'_>| {
            producer(ctx).map(Arc::new)
        })
    }

    fn add_trait_with<T, F>(
        &mut self,
        capability: Capability,
        lifetime: Lifetime,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.register(capability, lifetime, move |ctx: &ResolverContext<'_>| Ok(producer(ctx)))
    }

    /// One instance for the whole container, built on first use.
    pub fn add_singleton<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::of::<T>(), Lifetime::Singleton, producer)
    }

    /// One instance per scope.
    pub fn add_scoped<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::of::<T>(), Lifetime::Scoped, producer)
    }

    /// A new instance on every resolution.
    pub fn add_transient<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::of::<T>(), Lifetime::Transient, producer)
    }

    pub fn try_add_singleton<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.try_add_with(Capability::of::<T>(), Lifetime::Singleton, producer)
    }

    pub fn try_add_scoped<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.try_add_with(Capability::of::<T>(), Lifetime::Scoped, producer)
    }

    pub fn try_add_transient<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.try_add_with(Capability::of::<T>(), Lifetime::Transient, producer)
    }

    /// Singleton registered under a trait object capability.
    ///
    /// ```
    /// use scoped_registry::{Registry, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 42 }
    /// }
    ///
    /// let mut registry = Registry::new();
    /// registry.add_singleton_trait::<dyn Clock, _>(|_| Arc::new(Fixed) as Arc<dyn Clock>).unwrap();
    /// let container = registry.build().unwrap();
    /// assert_eq!(container.resolve::<dyn Clock>().unwrap().now(), 42);
    /// ```
    pub fn add_singleton_trait<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add_trait_with(Capability::of::<T>(), Lifetime::Singleton, producer)
    }

    pub fn add_scoped_trait<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add_trait_with(Capability::of::<T>(), Lifetime::Scoped, producer)
    }

    pub fn add_transient_trait<T, F>(&mut self, producer: F) -> ContainerResult<Declared<'_, T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add_trait_with(Capability::of::<T>(), Lifetime::Transient, producer)
    }

    /// Registers an already built value as a singleton.
    pub fn add_instance<T>(&mut self, value: T) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = Arc::new(value);
        self.register(Capability::of::<T>(), Lifetime::Singleton, move |_: &ResolverContext<'_>| {
            Ok(instance.clone())
        })
    }

    /// Singleton under `label`, resolved with
    /// [`resolve_named`](crate::Resolver::resolve_named).
    ///
    /// ```
    /// use scoped_registry::{Registry, Resolver};
    ///
    /// struct Pool { size: usize }
    ///
    /// let mut registry = Registry::new();
    /// registry.add_singleton_named::<Pool, _>("primary", |_| Pool { size: 8 }).unwrap();
    /// registry.add_singleton_named::<Pool, _>("replica", |_| Pool { size: 2 }).unwrap();
    /// let container = registry.build().unwrap();
    ///
    /// assert_eq!(container.resolve_named::<Pool>("replica").unwrap().size, 2);
    /// assert!(container.resolve::<Pool>().is_err());
    /// ```
    pub fn add_singleton_named<T, F>(
        &mut self,
        label: &'static str,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::named::<T>(label), Lifetime::Singleton, producer)
    }

    pub fn add_scoped_named<T, F>(
        &mut self,
        label: &'static str,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::named::<T>(label), Lifetime::Scoped, producer)
    }

    pub fn add_transient_named<T, F>(
        &mut self,
        label: &'static str,
        producer: F,
    ) -> ContainerResult<Declared<'_, T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_with(Capability::named::<T>(label), Lifetime::Transient, producer)
    }

    /// Checks the declared dependency graph.
    ///
    /// Reports declared dependencies that are not registered, singletons
    /// that declare a shorter-lived dependency, and declared cycles. A
    /// single problem is returned as is; several are wrapped in
    /// [`ContainerError::ValidationFailed`].
    pub fn validate(&self) -> ContainerResult<()> {
        validation::validate(&self.registrations, &self.order)
    }

    /// Freezes the registry into a [`Container`].
    ///
    /// Fails if a duplicate registration was rejected earlier, or, with
    /// [`ContainerOptions::validate_on_build`], if [`validate`](Self::validate)
    /// finds a problem.
    pub fn build(self) -> ContainerResult<Container> {
        let mut conflicts: Vec<ContainerError> = self
            .rejected
            .iter()
            .map(|c| ContainerError::DuplicateRegistration {
                name: c.display_name(),
            })
            .collect();
        match conflicts.len() {
            0 => {}
            1 => return Err(conflicts.remove(0)),
            _ => return Err(ContainerError::ValidationFailed { problems: conflicts }),
        }

        if self.options.validate_on_build {
            self.validate()?;
        }

        tracing::debug!(
            registrations = self.order.len(),
            validated = self.options.validate_on_build,
            "container built"
        );
        Ok(Container::new(
            self.registrations,
            self.order,
            self.options,
            self.observers,
        ))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.order)
            .field("options", &self.options)
            .finish()
    }
}

/// Handle to a registration just made, for attaching dependency
/// declarations and release hooks.
pub struct Declared<'a, T: ?Sized> {
    registration: &'a mut Registration,
    _instance: PhantomData<fn() -> Arc<T>>,
}

impl<'a, T> Declared<'a, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn new(registration: &'a mut Registration) -> Self {
        Self {
            registration,
            _instance: PhantomData,
        }
    }

    pub fn capability(&self) -> &Capability {
        &self.registration.capability
    }

    pub fn lifetime(&self) -> Lifetime {
        self.registration.lifetime
    }

    /// Declares that the producer resolves `D`.
    ///
    /// Declarations are not enforced at resolution time; they feed
    /// [`Registry::validate`] and [`Container::registrations`].
    pub fn depends_on<D: ?Sized + 'static>(self) -> Self {
        self.depends_on_capability(Capability::of::<D>())
    }

    pub fn depends_on_named<D: ?Sized + 'static>(self, label: &'static str) -> Self {
        self.depends_on_capability(Capability::named::<D>(label))
    }

    pub fn depends_on_capability(self, capability: Capability) -> Self {
        if !self.registration.dependencies.contains(&capability) {
            self.registration.dependencies.push(capability);
        }
        self
    }

    /// Runs [`Release::release`] on every instance when its owner ends.
    pub fn releasable(self) -> Self
    where
        T: Release,
    {
        self.registration.release = Some(ReleaseKind::sync_for::<T>());
        self
    }

    /// Runs [`AsyncRelease::release_async`] on every instance when its
    /// owner ends asynchronously.
    pub fn releasable_async(self) -> Self
    where
        T: AsyncRelease,
    {
        self.registration.release = Some(ReleaseKind::async_for::<T>());
        self
    }
}

impl<T: ?Sized> fmt::Debug for Declared<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declared")
            .field("capability", &self.registration.capability)
            .field("lifetime", &self.registration.lifetime)
            .finish()
    }
}
