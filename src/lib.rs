//! # scoped-registry
//!
//! A service registry that hands out instances according to their lifetime,
//! with per-unit-of-work scopes and guaranteed release.
//!
//! ## Features
//!
//! - **Three lifetimes**: transient, scoped and singleton
//! - **Trait objects**: register and resolve `dyn Trait` capabilities
//! - **Labels**: several registrations of one type side by side
//! - **Thread-safe**: singletons are built at most once, even under contention
//! - **Cycle detection**: circular producers fail with the full path
//! - **Release hooks**: scoped instances are released when their scope ends,
//!   singletons when the container shuts down
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_registry::{Registry, Resolver};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct RequestContext { clock: Arc<Clock> }
//! struct Token;
//!
//! let mut registry = Registry::new();
//! registry.add_singleton::<Clock, _>(|_| Clock).unwrap();
//! registry
//!     .try_add_scoped::<RequestContext, _>(|r| Ok(RequestContext { clock: r.resolve()? }))
//!     .unwrap()
//!     .depends_on::<Clock>();
//! registry.add_transient::<Token, _>(|_| Token).unwrap();
//!
//! let container = registry.build().unwrap();
//!
//! let scope = container.create_scope();
//! let request = scope.resolve::<RequestContext>().unwrap();
//! assert!(Arc::ptr_eq(&request.clock, &container.resolve::<Clock>().unwrap()));
//! assert!(Arc::ptr_eq(&request, &scope.resolve::<RequestContext>().unwrap()));
//! assert!(!Arc::ptr_eq(&scope.resolve::<Token>().unwrap(), &scope.resolve::<Token>().unwrap()));
//! scope.end();
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: one instance per container, built with the container as
//!   resolver
//! - **Scoped**: one instance per scope; resolving it from the container
//!   itself fails with [`ContainerError::ScopeRequired`]
//! - **Transient**: a new instance on every resolution
//!
//! ## Scopes
//!
//! ```rust
//! use scoped_registry::{Registry, Release, Resolver};
//! use std::sync::{Arc, Mutex};
//!
//! struct Transaction { log: Arc<Mutex<Vec<&'static str>>> }
//!
//! impl Release for Transaction {
//!     fn release(&self) {
//!         self.log.lock().unwrap().push("rolled back");
//!     }
//! }
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let shared = log.clone();
//!
//! let mut registry = Registry::new();
//! registry
//!     .add_scoped::<Transaction, _>(move |_| Transaction { log: shared.clone() })
//!     .unwrap()
//!     .releasable();
//! let container = registry.build().unwrap();
//!
//! container.with_scope(|scope| {
//!     scope.resolve::<Transaction>().unwrap();
//! });
//! assert_eq!(*log.lock().unwrap(), vec!["rolled back"]);
//! ```
//!
//! ## Feature flags
//!
//! - `performance`: `ahash` for the registration and scope maps
//! - `config`: load [`ContainerOptions`] from JSON, YAML or the environment
//! - `axum-integration`: per-request scopes for Axum

pub mod capability;
pub mod config;
pub mod container;
pub mod error;
pub mod lifetime;
pub mod observer;
pub mod registry;
pub mod traits;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

mod internal;
mod registration;

pub use capability::Capability;
pub use config::{ContainerOptions, DuplicatePolicy, DEFAULT_MAX_DEPTH};
pub use container::{Container, ResolverContext, Scope};
pub use error::{ContainerError, ContainerResult};
pub use lifetime::Lifetime;
pub use observer::{ResolveObserver, TracingObserver};
pub use registration::RegistrationInfo;
pub use registry::{Declared, Registry};
pub use traits::{AsyncRelease, Release, ResolveCore, Resolver};
