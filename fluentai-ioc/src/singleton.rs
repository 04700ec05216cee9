//! Memoizing factory combinator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{const_mutex, Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::error::{DiError, DiResult};
use crate::session::Session;

static NEXT_CELL: AtomicUsize = AtomicUsize::new(0);

/// Process-wide record of singleton initialization, used to refuse waits that would never end
static WAIT_GRAPH: Mutex<Option<WaitGraph>> = const_mutex(None);

#[derive(Default)]
struct WaitGraph {
    /// Cell id -> thread running its first initialization
    owners: FxHashMap<usize, ThreadId>,
    /// Blocked thread -> cell id it waits on
    waiting: FxHashMap<ThreadId, usize>,
}

impl WaitGraph {
    /// Whether `me` waiting on `cell` closes a loop of threads waiting on each other
    fn would_deadlock(&self, me: ThreadId, cell: usize) -> bool {
        let mut current = cell;
        for _ in 0..=self.waiting.len() {
            let Some(&owner) = self.owners.get(&current) else {
                return false;
            };
            if owner == me {
                return true;
            }
            match self.waiting.get(&owner) {
                Some(&next) => current = next,
                None => return false,
            }
        }
        false
    }
}

fn with_graph<R>(f: impl FnOnce(&mut WaitGraph) -> R) -> R {
    let mut graph = WAIT_GRAPH.lock();
    f(graph.get_or_insert_with(WaitGraph::default))
}

struct CellState<T: ?Sized> {
    value: Option<Arc<T>>,
    initializing: Option<ThreadId>,
}

struct SingletonCell<T: ?Sized> {
    id: usize,
    state: Mutex<CellState<T>>,
    ready: Condvar,
}

/// Clears the initializing mark and wakes waiters on every exit path, unwinding included
struct InitGuard<'a, T: ?Sized> {
    cell: &'a SingletonCell<T>,
}

impl<T: ?Sized> Drop for InitGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.cell.state.lock();
        state.initializing = None;
        with_graph(|graph| graph.owners.remove(&self.cell.id));
        self.cell.ready.notify_all();
    }
}

fn reentry_error<T: ?Sized>(session: &Session) -> DiError {
    let entry = session.current_entry();
    let path = match &entry {
        Some(entry) => format!("{} (singleton initialization)", entry),
        None => format!("{} (singleton initialization)", std::any::type_name::<T>()),
    };
    warn!("Circular dependency detected: {}", path);
    DiError::CycleDetected {
        service_type: std::any::type_name::<T>(),
        key: entry.and_then(|entry| entry.key().cloned()),
        path,
    }
}

/// Wrap `factory` so that its first successful result is reused forever after.
///
/// The cache lives in the returned closure, so once the closure is registered it is shared by
/// every session of the container. A failed first call caches nothing; the next call tries again.
///
/// Concurrent first calls run the factory once; the other callers wait for its result.
/// Re-entering the factory while it is still producing its first value fails with
/// [`DiError::CycleDetected`], and so does a wait that would close a loop of singletons being
/// initialized on different threads.
pub fn as_singleton<T, F>(factory: F) -> impl Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static,
{
    let cell: SingletonCell<T> = SingletonCell {
        id: NEXT_CELL.fetch_add(1, Ordering::Relaxed),
        state: Mutex::new(CellState {
            value: None,
            initializing: None,
        }),
        ready: Condvar::new(),
    };

    move |session: &Session| {
        let me = thread::current().id();
        let mut state = cell.state.lock();

        loop {
            if let Some(instance) = state.value.as_ref() {
                trace!("Singleton cache hit for {}", std::any::type_name::<T>());
                return Ok(instance.clone());
            }

            match state.initializing {
                None => break,
                Some(owner) if owner == me => return Err(reentry_error::<T>(session)),
                Some(_) => {
                    let refused = with_graph(|graph| {
                        if graph.would_deadlock(me, cell.id) {
                            return true;
                        }
                        graph.waiting.insert(me, cell.id);
                        false
                    });
                    if refused {
                        return Err(reentry_error::<T>(session));
                    }

                    cell.ready.wait(&mut state);
                    with_graph(|graph| graph.waiting.remove(&me));
                }
            }
        }

        state.initializing = Some(me);
        with_graph(|graph| graph.owners.insert(cell.id, me));
        drop(state);

        let _init = InitGuard { cell: &cell };
        let instance = factory(session)?;
        cell.state.lock().value = Some(instance.clone());
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ContainerBuilder, Registrar};
    use crate::extensions::RegistrarExt;
    use crate::key::Discriminator;
    use std::sync::atomic::AtomicBool;
    use std::sync::Barrier;

    #[test]
    fn test_factory_runs_once_across_sessions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut builder = ContainerBuilder::new();
        builder
            .register(as_singleton(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(String::from("shared")))
            }))
            .unwrap();
        let container = builder.build().unwrap();

        let first = container.resolve::<String>().unwrap();
        let second = container.start().resolve::<String>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_first_call_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut builder = ContainerBuilder::new();
        builder
            .register(as_singleton(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DiError::creation_failed::<u64>("not ready"))
                } else {
                    Ok(Arc::new(7u64))
                }
            }))
            .unwrap();
        let container = builder.build().unwrap();

        assert!(container.resolve::<u64>().is_err());
        assert_eq!(*container.resolve::<u64>().unwrap(), 7);
        assert_eq!(*container.resolve::<u64>().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reentry_through_fresh_session_is_a_cycle() {
        let mut builder = ContainerBuilder::new();
        let slot: Arc<Mutex<Option<crate::Container>>> = Arc::default();
        let inner = slot.clone();
        builder
            .register(as_singleton(move |_| {
                let container = inner.lock().clone().expect("container installed");
                container.resolve::<u8>()
            }))
            .unwrap();
        let container = builder.build().unwrap();
        *slot.lock() = Some(container.clone());

        let err = container.resolve::<u8>().unwrap_err();
        assert!(matches!(err, DiError::CycleDetected { key: None, .. }));
    }

    #[test]
    fn test_reentry_reports_the_registration_key() {
        let mut builder = ContainerBuilder::new();
        let slot: Arc<Mutex<Option<crate::Container>>> = Arc::default();
        let inner = slot.clone();
        builder
            .for_key("cache")
            .unwrap()
            .register_instance(move |_: &Session| {
                let container = inner.lock().clone().expect("container installed");
                container.resolve_keyed::<u8>("cache")
            })
            .unwrap();
        let container = builder.build().unwrap();
        *slot.lock() = Some(container.clone());

        let err = container.resolve_keyed::<u8>("cache").unwrap_err();
        assert!(matches!(err, DiError::CycleDetected { .. }));
        assert_eq!(err.key(), Some(&Discriminator::from("cache")));
        assert!(err.to_string().contains("Key: \"cache\""));
    }

    #[test]
    fn test_factory_panic_releases_the_cell() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut builder = ContainerBuilder::new();
        builder
            .register(as_singleton(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first initialization fails");
                }
                Ok(Arc::new(3u16))
            }))
            .unwrap();
        let container = builder.build().unwrap();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            container.resolve::<u16>()
        }));
        assert!(unwound.is_err());
        assert_eq!(*container.resolve::<u16>().unwrap(), 3);
    }

    struct Left {
        _right: Arc<Right>,
    }

    struct Right {
        _left: Arc<Left>,
    }

    #[test]
    fn test_mutual_singletons_on_two_threads_report_a_cycle() {
        let barrier = Arc::new(Barrier::new(2));
        let mut builder = ContainerBuilder::new();

        let gate = barrier.clone();
        let first = AtomicBool::new(true);
        builder
            .register(as_singleton(move |session: &Session| {
                if first.swap(false, Ordering::SeqCst) {
                    gate.wait();
                }
                Ok(Arc::new(Left {
                    _right: session.resolve::<Right>()?,
                }))
            }))
            .unwrap();

        let gate = barrier.clone();
        let first = AtomicBool::new(true);
        builder
            .register(as_singleton(move |session: &Session| {
                if first.swap(false, Ordering::SeqCst) {
                    gate.wait();
                }
                Ok(Arc::new(Right {
                    _left: session.resolve::<Left>()?,
                }))
            }))
            .unwrap();
        let container = builder.build().unwrap();

        let left = {
            let container = container.clone();
            thread::spawn(move || container.resolve::<Left>().map(|_| ()))
        };
        let right = {
            let container = container.clone();
            thread::spawn(move || container.resolve::<Right>().map(|_| ()))
        };

        for handle in [left, right] {
            let result = handle.join().expect("resolution thread finished");
            assert!(matches!(result, Err(DiError::CycleDetected { .. })));
        }
    }
}
