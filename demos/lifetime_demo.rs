//! Prints which instances each lifetime hands out across two scopes.
//!
//! Run with `RUST_LOG=scoped_registry=debug` to see scope and container
//! events as well.

use scoped_registry::{ContainerResult, Registry, Release, Resolver, TracingObserver};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(0x1f3a_0000);

fn short_id() -> String {
    // Spread consecutive ids so they do not read as a sequence.
    let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    format!("{:08x}", raw >> 32)
}

struct Instance {
    kind: &'static str,
    id: String,
    calls: AtomicUsize,
}

impl Instance {
    fn new(kind: &'static str) -> Self {
        let id = short_id();
        tracing::info!(kind, %id, "created new instance");
        Self {
            kind,
            id,
            calls: AtomicUsize::new(0),
        }
    }

    fn info(&self) -> String {
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{} #{} - call count: {calls}", self.kind, self.id)
    }
}

struct TransientService(Instance);
struct ScopedService(Instance);
struct SingletonService(Instance);

impl Release for ScopedService {
    fn release(&self) {
        tracing::info!(id = %self.0.id, "scoped service released");
    }
}

struct OrderProcessor {
    transient: Arc<TransientService>,
    scoped: Arc<ScopedService>,
    singleton: Arc<SingletonService>,
}

impl OrderProcessor {
    fn process(&self, order: &str) {
        println!("  processing {order}");
        println!("    {}", self.transient.0.info());
        println!("    {}", self.scoped.0.info());
        println!("    {}", self.singleton.0.info());
    }
}

fn main() -> ContainerResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut registry = Registry::new();
    registry.add_observer(Arc::new(TracingObserver));
    registry.add_transient::<TransientService, _>(|_| TransientService(Instance::new("Transient")))?;
    registry
        .add_scoped::<ScopedService, _>(|_| ScopedService(Instance::new("Scoped")))?
        .releasable();
    registry.add_singleton::<SingletonService, _>(|_| SingletonService(Instance::new("Singleton")))?;
    registry
        .try_add_transient::<OrderProcessor, _>(|r| {
            Ok(OrderProcessor {
                transient: r.resolve()?,
                scoped: r.resolve()?,
                singleton: r.resolve()?,
            })
        })?
        .depends_on::<TransientService>()
        .depends_on::<ScopedService>()
        .depends_on::<SingletonService>();
    let container = registry.build()?;

    for request in 1..=2 {
        println!("\n=== request {request} ===");
        container.with_scope(|scope| -> ContainerResult<()> {
            scope.resolve::<OrderProcessor>()?.process("ORD-001");
            scope.resolve::<OrderProcessor>()?.process("ORD-002");
            Ok(())
        })?;
    }

    println!("\nTransient: new every time. Scoped: one per request. Singleton: one for the app.");
    container.shutdown();
    Ok(())
}
