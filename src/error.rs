//! Error types for the registry, container and scopes.

use thiserror::Error;

use crate::lifetime::Lifetime;

/// Errors raised while registering or resolving capabilities.
///
/// All variants describe programming or configuration mistakes; none of them
/// is transient and nothing in the crate retries on them.
///
/// # Examples
///
/// ```rust
/// use scoped_registry::{ContainerError, Registry, Resolver};
///
/// struct Unregistered;
///
/// let container = Registry::new().build().unwrap();
/// match container.resolve::<Unregistered>() {
///     Err(ContainerError::UnresolvedCapability { name }) => {
///         assert!(name.ends_with("Unregistered"));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Nothing is registered for the requested capability.
    #[error("no registration for capability `{name}`")]
    UnresolvedCapability { name: String },

    /// The capability was registered twice and the registry rejects overwrites.
    #[error("capability `{name}` is already registered")]
    DuplicateRegistration { name: String },

    /// A producer (transitively) requested the capability it is constructing.
    #[error("circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// The scope was already ended.
    #[error("scope {scope_id} has ended")]
    ScopeClosed { scope_id: u64 },

    /// A scoped capability was requested without an active scope.
    #[error("capability `{name}` is scoped and cannot be resolved outside a scope")]
    ScopeRequired { name: String },

    /// A declared dependency would outlive its intended lifetime.
    #[error(
        "{consumer_lifetime} `{consumer}` must not depend on {dependency_lifetime} `{dependency}`"
    )]
    LifetimeMismatch {
        consumer: String,
        consumer_lifetime: Lifetime,
        dependency: String,
        dependency_lifetime: Lifetime,
    },

    /// The resolution chain grew past the configured maximum depth.
    #[error("resolution depth {depth} exceeded")]
    DepthExceeded { depth: usize },

    /// The stored instance is not of the requested type.
    #[error("instance registered for `{name}` has a different type")]
    TypeMismatch { name: String },

    /// The producer for `name` failed.
    #[error("producer for `{name}` failed: {source}")]
    Producer {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Build-time validation found several problems.
    #[error("registry validation failed:\n{}", format_problems(problems))]
    ValidationFailed { problems: Vec<ContainerError> },

    /// Container options could not be loaded.
    #[error("invalid container options: {message}")]
    Config { message: String },
}

impl ContainerError {
    /// Wraps a producer failure, passing container errors through untouched.
    ///
    /// A producer that fails because one of its own dependencies failed
    /// already carries a precise error; wrapping it again would bury it.
    pub(crate) fn from_producer(name: &str, err: anyhow::Error) -> Self {
        match err.downcast::<ContainerError>() {
            Ok(inner) => inner,
            Err(source) => ContainerError::Producer {
                name: name.to_string(),
                source,
            },
        }
    }
}

fn format_problems(problems: &[ContainerError]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result alias used throughout the crate.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_path_is_joined() {
        let err = ContainerError::CircularDependency {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: A -> B -> A");
    }

    #[test]
    fn producer_error_keeps_nested_container_error() {
        let inner = ContainerError::ScopeRequired { name: "Req".into() };
        let err = ContainerError::from_producer("Outer", anyhow::Error::new(inner));
        assert!(matches!(err, ContainerError::ScopeRequired { ref name } if name == "Req"));
    }

    #[test]
    fn producer_error_attaches_capability() {
        let err = ContainerError::from_producer("Db", anyhow::anyhow!("connection refused"));
        match err {
            ContainerError::Producer { name, source } => {
                assert_eq!(name, "Db");
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_failure_lists_every_problem() {
        let err = ContainerError::ValidationFailed {
            problems: vec![
                ContainerError::UnresolvedCapability { name: "A".into() },
                ContainerError::LifetimeMismatch {
                    consumer: "Cache".into(),
                    consumer_lifetime: Lifetime::Singleton,
                    dependency: "Request".into(),
                    dependency_lifetime: Lifetime::Scoped,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("no registration for capability `A`"));
        assert!(text.contains("singleton `Cache` must not depend on scoped `Request`"));
    }
}
