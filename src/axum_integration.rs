//! Axum integration: one scope per inbound request.
//!
//! [`scope_per_request`] opens a [`Scope`] for every request, stores it in
//! the request extensions and ends it with [`Scope::end_async`] once the
//! response has been produced. Handlers reach the scope through the
//! [`RequestScope`] extractor, or resolve a single capability with
//! [`Inject`].
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use scoped_registry::axum_integration::{with_request_scopes, Inject};
//! use scoped_registry::Registry;
//!
//! struct RequestId(u64);
//!
//! async fn show(Inject(id): Inject<RequestId>) -> String {
//!     format!("request {}", id.0)
//! }
//!
//! # async fn run() {
//! let mut registry = Registry::new();
//! registry.add_scoped::<RequestId, _>(|ctx| RequestId(ctx.scope_id().unwrap_or(0))).unwrap();
//! let container = registry.build().unwrap();
//!
//! let app = with_request_scopes(Router::new().route("/", get(show)), container);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::container::{Container, Scope};
use crate::error::ContainerError;
use crate::traits::Resolver;

/// Middleware that runs every request inside its own scope.
///
/// Install it with [`axum::middleware::from_fn_with_state`] and the
/// container as state, or use [`with_request_scopes`].
pub async fn scope_per_request(
    State(container): State<Container>,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = container.create_scope();
    tracing::debug!(
        scope_id = scope.id(),
        method = %request.method(),
        uri = %request.uri(),
        "request scope opened"
    );
    request.extensions_mut().insert(scope.clone());

    let response = next.run(request).await;
    scope.end_async().await;
    response
}

/// Adds [`scope_per_request`] to every route of `router`.
pub fn with_request_scopes<S>(router: Router<S>, container: Container) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(container, scope_per_request))
}

/// The scope of the current request.
#[derive(Clone, Debug)]
pub struct RequestScope(pub Scope);

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = ScopeRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Scope>()
            .cloned()
            .map(RequestScope)
            .ok_or(ScopeRejection::MissingScope)
    }
}

/// Resolves `T` from the scope of the current request.
pub struct Inject<T: ?Sized>(pub Arc<T>);

#[async_trait]
impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync,
    T: ?Sized + Send + Sync + 'static,
{
    type Rejection = ScopeRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestScope(scope) = RequestScope::from_request_parts(parts, state).await?;
        Ok(Inject(scope.resolve::<T>()?))
    }
}

/// Why a handler could not get at its scope or its services.
///
/// Both cases are server-side misconfigurations and turn into a `500`.
#[derive(Debug)]
pub enum ScopeRejection {
    /// The router was not wrapped with [`scope_per_request`].
    MissingScope,
    Resolve(ContainerError),
}

impl From<ContainerError> for ScopeRejection {
    fn from(err: ContainerError) -> Self {
        ScopeRejection::Resolve(err)
    }
}

impl fmt::Display for ScopeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRejection::MissingScope => {
                f.write_str("no request scope; is the scope_per_request middleware installed?")
            }
            ScopeRejection::Resolve(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ScopeRejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeRejection::MissingScope => None,
            ScopeRejection::Resolve(err) => Some(err),
        }
    }
}

impl IntoResponse for ScopeRejection {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request scope rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
