#![cfg(feature = "axum-integration")]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use scoped_registry::axum_integration::{with_request_scopes, Inject, RequestScope};
use scoped_registry::{Container, Registry, Release, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct RequestId(u64);

struct AuditTrail {
    closed: Arc<AtomicUsize>,
}

impl Release for AuditTrail {
    fn release(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn container(closed: &Arc<AtomicUsize>) -> Container {
    let closed = closed.clone();
    let mut registry = Registry::new();
    registry
        .add_scoped::<RequestId, _>(|ctx| RequestId(ctx.scope_id().unwrap_or_default()))
        .unwrap();
    registry
        .add_scoped::<AuditTrail, _>(move |_| AuditTrail { closed: closed.clone() })
        .unwrap()
        .releasable();
    registry.build().unwrap()
}

async fn same_scope_twice(RequestScope(scope): RequestScope, Inject(id): Inject<RequestId>) -> String {
    let again = scope.resolve::<RequestId>().unwrap();
    scope.resolve::<AuditTrail>().unwrap();
    format!("{} {}", id.0, Arc::ptr_eq(&id, &again))
}

async fn fails() -> Result<String, scoped_registry::axum_integration::ScopeRejection> {
    Err(scoped_registry::ContainerError::Config { message: "nope".into() }.into())
}

fn app(container: Container) -> Router {
    with_request_scopes(
        Router::new()
            .route("/", get(same_scope_twice))
            .route("/fail", get(fails)),
        container,
    )
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn each_request_gets_its_own_scope() {
    let closed = Arc::new(AtomicUsize::new(0));
    let app = app(container(&closed));

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_text(first).await;

    let second = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let second = body_text(second).await;

    assert!(first.ends_with(" true"));
    assert!(second.ends_with(" true"));
    assert_ne!(first, second);
    // Both scopes were ended once their responses were produced.
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn error_responses_still_end_the_scope() {
    let closed = Arc::new(AtomicUsize::new(0));
    let app = app(container(&closed));

    let response = app
        .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("nope"));
}

#[tokio::test]
async fn missing_middleware_is_a_server_error() {
    let app: Router = Router::new().route("/", get(|RequestScope(_): RequestScope| async { "unreachable" }));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("scope_per_request"));
}

#[tokio::test]
async fn unresolvable_injection_is_a_server_error() {
    struct Unregistered;

    let closed = Arc::new(AtomicUsize::new(0));
    let app = with_request_scopes(
        Router::new().route("/", get(|Inject(_): Inject<Unregistered>| async { "unreachable" })),
        container(&closed),
    );

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("Unregistered"));
}

#[test]
fn rejections_are_errors_with_their_cause() {
    use scoped_registry::axum_integration::ScopeRejection;
    use scoped_registry::ContainerError;
    use std::error::Error;

    let rejection = ScopeRejection::from(ContainerError::ScopeClosed { scope_id: 7 });
    let cause = rejection.source().unwrap();
    assert!(matches!(
        cause.downcast_ref::<ContainerError>(),
        Some(ContainerError::ScopeClosed { scope_id: 7 })
    ));
    assert!(ScopeRejection::MissingScope.source().is_none());

    let wrapped: anyhow::Error = rejection.into();
    assert!(wrapped.chain().any(|e| e.to_string().contains("scope 7 has ended")));
}
