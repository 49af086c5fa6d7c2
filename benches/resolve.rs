use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scoped_registry::*;
use std::sync::Arc;

// ===== Hot paths =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.add_instance(42u64).unwrap();
    let container = registry.build().unwrap();
    let _ = container.resolve::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| black_box(container.resolve::<u64>().unwrap()))
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct Expensive {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new();
                registry
                    .add_singleton::<Expensive, _>(|_| Expensive { data: (0..1000).collect() })
                    .unwrap();
                registry.build().unwrap()
            },
            |container| black_box(container.resolve::<Expensive>().unwrap().data.len()),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_lifetimes_in_scope(c: &mut Criterion) {
    struct Payload {
        _data: [u8; 64],
    }

    let mut group = c.benchmark_group("resolve_in_scope");
    for lifetime in [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient] {
        let mut registry = Registry::new();
        registry
            .register::<Payload, _>(Capability::of::<Payload>(), lifetime, |_| {
                Ok(Arc::new(Payload { _data: [0; 64] }))
            })
            .unwrap();
        let container = registry.build().unwrap();
        let scope = container.create_scope();
        let _ = scope.resolve::<Payload>().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(lifetime), &scope, |b, scope| {
            b.iter(|| black_box(scope.resolve::<Payload>().unwrap()))
        });
    }
    group.finish();
}

fn bench_dependency_chain(c: &mut Criterion) {
    struct Leaf;
    struct Middle(#[allow(dead_code)] Arc<Leaf>);
    struct Top(#[allow(dead_code)] Arc<Middle>, #[allow(dead_code)] Arc<Leaf>);

    let mut registry = Registry::new();
    registry.add_singleton::<Leaf, _>(|_| Leaf).unwrap();
    registry.try_add_scoped::<Middle, _>(|r| Ok(Middle(r.resolve()?))).unwrap();
    registry
        .try_add_transient::<Top, _>(|r| Ok(Top(r.resolve()?, r.resolve()?)))
        .unwrap();
    let container = registry.build().unwrap();

    c.bench_function("scope_create_resolve_end", |b| {
        b.iter(|| {
            let scope = container.create_scope();
            black_box(scope.resolve::<Top>().unwrap());
            scope.end();
        })
    });
}

fn bench_contended_singleton(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.add_instance(String::from("shared")).unwrap();
    let container = registry.build().unwrap();

    c.bench_function("singleton_4_threads_x1000", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..1000 {
                            black_box(container.resolve::<String>().unwrap());
                        }
                    });
                }
            })
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_lifetimes_in_scope,
    bench_dependency_chain,
    bench_contended_singleton
);
criterion_main!(benches);
