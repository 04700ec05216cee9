//! Registration conveniences layered over [`Registrar::register`]

use std::sync::Arc;

use crate::autowire::{autowired, Autowire};
use crate::builder::Registrar;
use crate::construction::ConstructionSpec;
use crate::error::DiResult;
use crate::session::Session;
use crate::singleton::as_singleton;

/// Extension methods available on the builder and on [`ForKey`](crate::ForKey) handles
pub trait RegistrarExt: Registrar + Sized {
    /// Register a factory whose first successful result is reused for the container's lifetime
    fn register_instance<T, F>(&mut self, factory: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register(as_singleton(factory))
    }

    /// Register an already-built instance
    fn register_shared<T>(&mut self, instance: Arc<T>) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register(move |_: &Session| Ok(instance.clone()))
    }

    /// Register `T` to be built from its own constructor descriptors
    fn register_type<T: Autowire>(&mut self) -> DiResult<()> {
        let factory = autowired::<T>(self.pending_key().cloned())?;
        self.register(factory)
    }

    /// Register `T`, auto-wired, as the implementation served for requests of `I`
    fn register_type_as<I, T>(&mut self, upcast: fn(Arc<T>) -> Arc<I>) -> DiResult<()>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Autowire,
    {
        let factory = autowired::<T>(self.pending_key().cloned())?;
        self.register(move |session: &Session| factory(session).map(upcast))
    }

    /// Register `T` to be built with a fixed construction specification
    fn register_constructor<T>(&mut self, spec: ConstructionSpec<T>) -> DiResult<()>
    where
        T: Send + Sync + 'static,
    {
        let key = self.pending_key().cloned();
        self.register(move |session: &Session| spec.construct(session, key.as_ref()))
    }

    /// Register `T`, built with `spec`, as the implementation served for requests of `I`
    fn register_constructor_as<I, T>(
        &mut self,
        spec: ConstructionSpec<T>,
        upcast: fn(Arc<T>) -> Arc<I>,
    ) -> DiResult<()>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let key = self.pending_key().cloned();
        self.register(move |session: &Session| spec.construct(session, key.as_ref()).map(upcast))
    }
}

impl<R: Registrar> RegistrarExt for R {}
