//! Resolution sessions
//!
//! A [`Session`] is the scope of one logical resolution chain. It tracks which entries are
//! currently being constructed so that a factory resolving itself, directly or through other
//! factories, fails with [`DiError::CycleDetected`] instead of recursing forever.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::container::ContainerInner;
use crate::error::{DiError, DiResult};
use crate::key::{Discriminator, EntryKey, TypeKey};
use crate::provider::{AnyInstance, ServiceProvider};
use crate::registry::Match;

/// Short-lived resolution scope created by [`Container::start`](crate::Container::start).
///
/// Nested resolution from inside a factory is expected; sharing one session between threads or
/// between independent top-level resolutions is not supported.
pub struct Session {
    inner: Arc<ContainerInner>,
    in_flight: RefCell<Vec<EntryKey>>,
}

impl Session {
    pub(crate) fn new(inner: Arc<ContainerInner>) -> Self {
        Self {
            inner,
            in_flight: RefCell::new(Vec::new()),
        }
    }

    /// Lazy factory for `T` registered without a discriminator
    pub fn factory_for<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Factory<'_, T>> {
        self.factory_for_entry(None)
    }

    /// Lazy factory for `T` registered under `key`
    pub fn factory_for_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<Discriminator>,
    ) -> DiResult<Factory<'_, T>> {
        self.factory_for_entry(Some(key.into()))
    }

    /// Lazy factory for `T` under an optional discriminator.
    ///
    /// Lookup happens now; nothing is constructed until [`Factory::call`].
    pub fn factory_for_entry<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: Option<Discriminator>,
    ) -> DiResult<Factory<'_, T>> {
        let lazy = self.lookup(TypeKey::of::<T>(), key.as_ref())?;
        Ok(Factory {
            lazy,
            _marker: PhantomData,
        })
    }

    /// Resolve `T` registered without a discriminator
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.factory_for::<T>()?.call()
    }

    /// Resolve `T` registered under `key`
    pub fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<Discriminator>,
    ) -> DiResult<Arc<T>> {
        self.factory_for_key::<T>(key)?.call()
    }

    pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: Option<Discriminator>,
    ) -> DiResult<Arc<T>> {
        self.factory_for_entry::<T>(key)?.call()
    }

    /// Entries currently being constructed, outermost first
    pub fn in_flight(&self) -> Vec<EntryKey> {
        self.in_flight.borrow().clone()
    }

    /// Innermost entry being constructed; for a running factory, its own registration
    pub(crate) fn current_entry(&self) -> Option<EntryKey> {
        self.in_flight.borrow().last().cloned()
    }

    /// Type-erased lookup, used by auto-wiring where parameter types are only known as keys
    pub(crate) fn lookup(
        &self,
        requested: TypeKey,
        key: Option<&Discriminator>,
    ) -> DiResult<LazyInstance<'_>> {
        let target = self.inner.registry.find(requested, key)?;
        trace!("Matched {} to {}", requested, target.entry);
        Ok(LazyInstance {
            session: self,
            requested,
            target,
        })
    }

    fn invoke(&self, requested: TypeKey, target: &Match) -> DiResult<AnyInstance> {
        let _guard = self.enter(requested, &target.entry)?;

        if let Some(usage) = &self.inner.usage {
            usage.lock().insert(target.entry.clone());
        }

        trace!("Invoking factory for {}", target.entry);
        (target.factory)(self)
    }

    fn enter(&self, requested: TypeKey, entry: &EntryKey) -> DiResult<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.borrow_mut();

        if in_flight.contains(entry) {
            let path = in_flight
                .iter()
                .chain(std::iter::once(entry))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!("Circular dependency detected: {}", path);
            return Err(DiError::CycleDetected {
                service_type: requested.name(),
                key: entry.key().cloned(),
                path,
            });
        }

        if let Some(limit) = self.inner.config.max_depth {
            if in_flight.len() >= limit {
                warn!("Resolution depth limit {} reached at {}", limit, entry);
                return Err(DiError::DepthExceeded {
                    service_type: requested.name(),
                    key: entry.key().cloned(),
                    limit,
                });
            }
        }

        in_flight.push(entry.clone());
        Ok(InFlightGuard { session: self })
    }
}

impl ServiceProvider for Session {
    fn has_service_by_entry(&self, entry: &EntryKey) -> bool {
        self.inner.registry.contains(entry)
    }
}

/// Pops the innermost in-flight entry on every exit path, unwinding included
struct InFlightGuard<'s> {
    session: &'s Session,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.borrow_mut().pop();
    }
}

/// Resolved-but-not-yet-invoked entry with its type erased
pub(crate) struct LazyInstance<'s> {
    session: &'s Session,
    requested: TypeKey,
    target: Match,
}

impl LazyInstance<'_> {
    pub(crate) fn entry(&self) -> &EntryKey {
        &self.target.entry
    }

    /// Run the underlying factory; the result holds an `Arc` of the requested type
    pub(crate) fn call(&self) -> DiResult<AnyInstance> {
        let instance = self.session.invoke(self.requested, &self.target)?;
        match &self.target.upcast {
            Some(upcast) => upcast(instance),
            None => Ok(instance),
        }
    }
}

/// Lazy per-request factory returned by [`Session::factory_for`].
///
/// Every [`call`](Factory::call) re-runs the registered factory; caching only happens when the
/// registration itself was wrapped with [`as_singleton`](crate::as_singleton).
pub struct Factory<'s, T: ?Sized> {
    lazy: LazyInstance<'s>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Factory<'_, T> {
    /// The registration this factory will invoke
    pub fn entry(&self) -> &EntryKey {
        self.lazy.entry()
    }

    pub fn call(&self) -> DiResult<Arc<T>> {
        let instance = self.lazy.call()?;
        instance
            .downcast::<Arc<T>>()
            .map(|typed| *typed)
            .map_err(|_| DiError::ArgumentMismatch {
                constructor: format!("factory for {}", self.lazy.entry()),
                index: 0,
                expected: std::any::type_name::<T>(),
            })
    }
}
