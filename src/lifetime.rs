//! Service lifetime definitions.

use std::fmt;
use std::str::FromStr;

use crate::error::ContainerError;

/// Reuse policy for the instances of a capability.
///
/// # Examples
///
/// ```rust
/// use scoped_registry::{Lifetime, Registry, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Request;
/// struct Token;
///
/// let mut registry = Registry::new();
/// registry.add_singleton::<Clock, _>(|_| Clock).unwrap();
/// registry.add_scoped::<Request, _>(|_| Request).unwrap();
/// registry.add_transient::<Token, _>(|_| Token).unwrap();
/// let container = registry.build().unwrap();
///
/// let a = container.create_scope();
/// let b = container.create_scope();
///
/// // Singleton: one instance everywhere
/// assert!(Arc::ptr_eq(&a.resolve::<Clock>().unwrap(), &b.resolve::<Clock>().unwrap()));
/// // Scoped: one per scope
/// assert!(Arc::ptr_eq(&a.resolve::<Request>().unwrap(), &a.resolve::<Request>().unwrap()));
/// assert!(!Arc::ptr_eq(&a.resolve::<Request>().unwrap(), &b.resolve::<Request>().unwrap()));
/// // Transient: fresh every time
/// assert!(!Arc::ptr_eq(&a.resolve::<Token>().unwrap(), &a.resolve::<Token>().unwrap()));
///
/// assert_eq!("scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Lifetime {
    /// New instance on every resolution, never cached.
    Transient,
    /// One instance per scope, released when the scope ends.
    ///
    /// Resolving a scoped capability from the root container fails with
    /// [`ContainerError::ScopeRequired`].
    Scoped,
    /// One instance per container, shared by every scope and thread.
    ///
    /// The producer receives the root container as its resolver, so a
    /// singleton cannot capture a scoped instance by accident.
    ///
    /// A singleton cycle entered from one thread is reported as
    /// [`ContainerError::CircularDependency`]. Two threads entering the same
    /// cycle from different singletons at once wait on each other's
    /// construction and never return. Declare singleton dependencies with
    /// `depends_on` and set
    /// [`ContainerOptions::validate_on_build`](crate::ContainerOptions::validate_on_build)
    /// to reject such graphs in `build()`.
    Singleton,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        }
    }

    /// Whether an instance of this lifetime may hold on to an instance of
    /// `dependency` for its whole life.
    ///
    /// Singletons may only keep singletons. Scoped and transient consumers
    /// may keep anything, since nothing they capture outlives the scope it
    /// came from.
    pub fn may_capture(&self, dependency: Lifetime) -> bool {
        match self {
            Lifetime::Singleton => dependency == Lifetime::Singleton,
            Lifetime::Scoped | Lifetime::Transient => true,
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transient" => Ok(Lifetime::Transient),
            "scoped" => Ok(Lifetime::Scoped),
            "singleton" => Ok(Lifetime::Singleton),
            other => Err(ContainerError::Config {
                message: format!("unknown lifetime `{other}`"),
            }),
        }
    }
}
