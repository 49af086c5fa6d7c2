//! Release hooks owned by a scope or by the root container.

use futures::FutureExt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;

pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

pub(crate) enum ReleaseHook {
    Sync(Box<dyn FnOnce() + Send>),
    Async(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
}

/// What a drain of the bag did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Drained {
    pub(crate) released: usize,
    /// Async hooks dropped because the drain was synchronous.
    pub(crate) skipped_async: usize,
    pub(crate) panicked: usize,
}

/// Hooks in registration order; drained last-in first-out.
#[derive(Default)]
pub(crate) struct ReleaseBag {
    hooks: Vec<ReleaseHook>,
}

impl ReleaseBag {
    pub(crate) fn push_sync(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(ReleaseHook::Sync(f));
    }

    pub(crate) fn push_async(&mut self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.hooks.push(ReleaseHook::Async(f));
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every sync hook newest first. Async hooks cannot run here and
    /// are dropped. A panicking hook does not stop the others.
    pub(crate) fn drain_sync(&mut self) -> Drained {
        let mut drained = Drained::default();
        while let Some(hook) = self.hooks.pop() {
            match hook {
                ReleaseHook::Sync(f) => {
                    if catch_unwind(AssertUnwindSafe(f)).is_ok() {
                        drained.released += 1;
                    } else {
                        drained.panicked += 1;
                    }
                }
                ReleaseHook::Async(_) => drained.skipped_async += 1,
            }
        }
        drained
    }

    /// Runs every hook newest first, awaiting async ones in turn. A hook
    /// that panics, while building its future or while it is polled, is
    /// counted and the drain moves on.
    pub(crate) async fn drain_async(&mut self) -> Drained {
        let mut drained = Drained::default();
        while let Some(hook) = self.hooks.pop() {
            match hook {
                ReleaseHook::Sync(f) => {
                    if catch_unwind(AssertUnwindSafe(f)).is_ok() {
                        drained.released += 1;
                    } else {
                        drained.panicked += 1;
                    }
                }
                ReleaseHook::Async(f) => {
                    let finished = match catch_unwind(AssertUnwindSafe(f)) {
                        Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await.is_ok(),
                        Err(_) => false,
                    };
                    if finished {
                        drained.released += 1;
                    } else {
                        drained.panicked += 1;
                    }
                }
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Box<dyn FnOnce() + Send> {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().push(name))
    }

    #[test]
    fn sync_drain_is_lifo() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = ReleaseBag::default();
        bag.push_sync(recorder(&log, "first"));
        bag.push_sync(recorder(&log, "second"));
        bag.push_sync(recorder(&log, "third"));

        let drained = bag.drain_sync();
        assert_eq!(drained.released, 3);
        assert!(bag.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[test]
    fn sync_drain_skips_async_hooks() {
        let mut bag = ReleaseBag::default();
        bag.push_async(Box::new(|| -> BoxFutureUnit { Box::pin(async {}) }));
        bag.push_sync(Box::new(|| {}));
        let drained = bag.drain_sync();
        assert_eq!(drained, Drained { released: 1, skipped_async: 1, panicked: 0 });
    }

    #[test]
    fn panicking_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = ReleaseBag::default();
        bag.push_sync(recorder(&log, "survivor"));
        bag.push_sync(Box::new(|| panic!("release failed")));
        let drained = bag.drain_sync();
        assert_eq!(drained.panicked, 1);
        assert_eq!(drained.released, 1);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[tokio::test]
    async fn async_drain_interleaves_in_lifo_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = ReleaseBag::default();
        bag.push_sync(recorder(&log, "sync-1"));
        let l = log.clone();
        bag.push_async(Box::new(move || -> BoxFutureUnit {
            Box::pin(async move { l.lock().unwrap().push("async-2") })
        }));
        bag.push_sync(recorder(&log, "sync-3"));

        let drained = bag.drain_async().await;
        assert_eq!(drained.released, 3);
        assert_eq!(*log.lock().unwrap(), vec!["sync-3", "async-2", "sync-1"]);
    }

    #[tokio::test]
    async fn panicking_async_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = ReleaseBag::default();
        bag.push_sync(recorder(&log, "survivor"));
        bag.push_async(Box::new(|| -> BoxFutureUnit {
            Box::pin(async { panic!("async release failed") })
        }));
        bag.push_async(Box::new(|| -> BoxFutureUnit { panic!("no future") }));

        let drained = bag.drain_async().await;
        assert_eq!(drained, Drained { released: 1, skipped_async: 0, panicked: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }
}
