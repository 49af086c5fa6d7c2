//! Property-based tests for lifetime identity.
//!
//! Whatever mix of resolutions happens across scopes, singletons stay one
//! instance, scoped instances stay one per scope, and transients are never
//! reused.

use proptest::prelude::*;
use scoped_registry::{Container, Registry, Resolver};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct Single;
struct PerScope;
struct Fresh;

#[derive(Debug, Clone, Copy)]
enum Step {
    Singleton(usize),
    Scoped(usize),
    Transient(usize),
}

fn step(scopes: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..scopes).prop_map(Step::Singleton),
        (0..scopes).prop_map(Step::Scoped),
        (0..scopes).prop_map(Step::Transient),
    ]
}

fn container() -> Container {
    let mut registry = Registry::new();
    registry.add_singleton::<Single, _>(|_| Single).unwrap();
    registry.add_scoped::<PerScope, _>(|_| PerScope).unwrap();
    registry.add_transient::<Fresh, _>(|_| Fresh).unwrap();
    registry.build().unwrap()
}

fn addr<T>(instance: &Arc<T>) -> usize {
    Arc::as_ptr(instance) as usize
}

proptest! {
    #[test]
    fn identities_follow_lifetimes(
        (scope_count, steps) in (1usize..6).prop_flat_map(|n| (Just(n), prop::collection::vec(step(n), 1..60)))
    ) {
        let container = container();
        let scopes: Vec<_> = (0..scope_count).map(|_| container.create_scope()).collect();

        let mut singleton = None;
        let mut scoped: HashMap<usize, Arc<PerScope>> = HashMap::new();
        let mut transients: Vec<Arc<Fresh>> = Vec::new();

        for step in steps {
            match step {
                Step::Singleton(i) => {
                    let got = scopes[i].resolve::<Single>().unwrap();
                    let first = singleton.get_or_insert_with(|| got.clone());
                    prop_assert!(Arc::ptr_eq(first, &got));
                }
                Step::Scoped(i) => {
                    let got = scopes[i].resolve::<PerScope>().unwrap();
                    let first = scoped.entry(i).or_insert_with(|| got.clone());
                    prop_assert!(Arc::ptr_eq(first, &got));
                }
                Step::Transient(i) => {
                    // Kept alive so addresses cannot be reused.
                    transients.push(scopes[i].resolve::<Fresh>().unwrap());
                }
            }
        }

        let distinct_scoped: HashSet<usize> = scoped.values().map(addr).collect();
        prop_assert_eq!(distinct_scoped.len(), scoped.len());

        let distinct_transients: HashSet<usize> = transients.iter().map(addr).collect();
        prop_assert_eq!(distinct_transients.len(), transients.len());
    }

    #[test]
    fn ended_scopes_never_resolve_again(ends in prop::collection::vec(any::<bool>(), 1..12)) {
        let container = container();
        let scopes: Vec<_> = ends.iter().map(|_| container.create_scope()).collect();
        for (scope, end) in scopes.iter().zip(&ends) {
            scope.resolve::<PerScope>().unwrap();
            if *end {
                scope.end();
            }
        }
        for (scope, end) in scopes.iter().zip(&ends) {
            prop_assert_eq!(scope.resolve::<PerScope>().is_err(), *end);
            prop_assert_eq!(scope.is_ended(), *end);
        }
    }
}
