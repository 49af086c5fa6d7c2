//! Resolver traits shared by the container, scopes and producer contexts.

use std::any::Any;
use std::sync::Arc;

use crate::capability::Capability;
use crate::error::{ContainerError, ContainerResult};
use crate::internal::BoxFutureUnit;
use crate::traits::{AsyncRelease, Release};

/// Object-safe resolution core.
///
/// [`Container`](crate::Container), [`Scope`](crate::Scope) and
/// [`ResolverContext`](crate::ResolverContext) implement it; everything else
/// goes through the generic [`Resolver`] methods built on top.
pub trait ResolveCore: Send + Sync {
    /// Resolves `capability` to its type-erased instance.
    ///
    /// The returned value holds an `Arc<T>` for the `T` the capability was
    /// registered with.
    fn resolve_erased(&self, capability: &Capability) -> ContainerResult<Arc<dyn Any + Send + Sync>>;

    /// Adds a synchronous release hook to whoever owns this resolver.
    fn push_sync_release(&self, hook: Box<dyn FnOnce() + Send>);

    /// Adds an asynchronous release hook to whoever owns this resolver.
    fn push_async_release(&self, hook: Box<dyn FnOnce() -> BoxFutureUnit + Send>);
}

/// Typed resolution API.
///
/// Implemented for every [`ResolveCore`], so the same calls work on the root
/// container, on a scope, and inside a producer.
///
/// # Examples
///
/// ```
/// use scoped_registry::{Registry, Resolver};
/// use std::sync::Arc;
///
/// trait Notifier: Send + Sync {
///     fn channel(&self) -> &'static str;
/// }
///
/// struct Email;
/// impl Notifier for Email {
///     fn channel(&self) -> &'static str { "email" }
/// }
///
/// struct OrderService {
///     notifier: Arc<dyn Notifier>,
/// }
///
/// let mut registry = Registry::new();
/// registry.add_transient_trait::<dyn Notifier, _>(|_| Arc::new(Email) as Arc<dyn Notifier>).unwrap();
/// registry
///     .try_add_scoped::<OrderService, _>(|r| {
///         Ok(OrderService { notifier: r.resolve::<dyn Notifier>()? })
///     })
///     .unwrap();
///
/// let container = registry.build().unwrap();
/// let scope = container.create_scope();
/// let orders = scope.resolve::<OrderService>().unwrap();
/// assert_eq!(orders.notifier.channel(), "email");
/// ```
pub trait Resolver: ResolveCore {
    /// Resolves the unlabelled capability for `T`.
    fn resolve<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_capability::<T>(&Capability::of::<T>())
    }

    /// Resolves the capability for `T` registered under `label`.
    fn resolve_named<T>(&self, label: &'static str) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_capability::<T>(&Capability::named::<T>(label))
    }

    /// Resolves an explicit capability whose instances are of type `T`.
    fn resolve_capability<T>(&self, capability: &Capability) -> ContainerResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let any = self.resolve_erased(capability)?;
        any.downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ContainerError::TypeMismatch {
                name: capability.display_name(),
            })
    }

    /// Like [`resolve`](Self::resolve), but `Ok(None)` when `T` itself is not
    /// registered. Missing dependencies of `T` are still errors.
    fn try_resolve<T>(&self) -> ContainerResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let capability = Capability::of::<T>();
        match self.resolve_capability::<T>(&capability) {
            Ok(instance) => Ok(Some(instance)),
            Err(ContainerError::UnresolvedCapability { name }) if name == capability.display_name() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves `T` or panics with the resolution error.
    ///
    /// Meant for start-up code where a missing service is a fatal
    /// misconfiguration anyway.
    ///
    /// # Panics
    ///
    /// Panics if [`resolve`](Self::resolve) fails.
    fn resolve_required<T>(&self) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.resolve::<T>() {
            Ok(instance) => instance,
            Err(e) => panic!("failed to resolve `{}`: {e}", std::any::type_name::<T>()),
        }
    }

    /// Releases `instance` when the owner of this resolver ends.
    fn register_release<T>(&self, instance: Arc<T>)
    where
        T: ?Sized + Release,
    {
        self.push_sync_release(Box::new(move || instance.release()));
    }

    /// Releases `instance` asynchronously when the owner of this resolver ends.
    fn register_async_release<T>(&self, instance: Arc<T>)
    where
        T: ?Sized + AsyncRelease,
    {
        self.push_async_release(Box::new(move || -> BoxFutureUnit {
            Box::pin(async move { instance.release_async().await })
        }));
    }
}

impl<R: ResolveCore + ?Sized> Resolver for R {}
