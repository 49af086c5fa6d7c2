//! One scope per HTTP request.
//!
//! ```text
//! cargo run --example request_scope --features axum-integration
//! curl localhost:3000/lifetime
//! ```

use axum::{routing::get, Json, Router};
use scoped_registry::axum_integration::{with_request_scopes, Inject, RequestScope, ScopeRejection};
use scoped_registry::{Registry, Resolver, TracingObserver};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Operation {
    id: u64,
}

impl Operation {
    fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

struct TransientOperation(Operation);
struct ScopedOperation(Operation);
struct SingletonOperation(Operation);

struct RequestContext {
    request_id: u64,
}

async fn lifetime(
    RequestScope(scope): RequestScope,
    Inject(context): Inject<RequestContext>,
) -> Result<Json<Value>, ScopeRejection> {
    let first = scope.resolve::<TransientOperation>()?;
    let second = scope.resolve::<TransientOperation>()?;
    let scoped_a = scope.resolve::<ScopedOperation>()?;
    let scoped_b = scope.resolve::<ScopedOperation>()?;
    let singleton = scope.resolve::<SingletonOperation>()?;

    Ok(Json(json!({
        "request": context.request_id,
        "transient": [first.0.id, second.0.id],
        "scoped": [scoped_a.0.id, scoped_b.0.id],
        "singleton": singleton.0.id,
    })))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,scoped_registry=debug")),
        )
        .init();

    let mut registry = Registry::new();
    registry.add_observer(Arc::new(TracingObserver));
    registry.add_transient::<TransientOperation, _>(|_| TransientOperation(Operation::new()))?;
    registry.add_scoped::<ScopedOperation, _>(|_| ScopedOperation(Operation::new()))?;
    registry.add_singleton::<SingletonOperation, _>(|_| SingletonOperation(Operation::new()))?;
    registry.add_scoped::<RequestContext, _>(|ctx| RequestContext {
        request_id: ctx.scope_id().unwrap_or_default(),
    })?;
    let container = registry.build()?;

    let app = with_request_scopes(Router::new().route("/lifetime", get(lifetime)), container.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    container.shutdown_async().await;
    Ok(())
}
