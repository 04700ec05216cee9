//! Service provider interfaces and erased factory types

use std::any::Any;
use std::sync::Arc;

use crate::error::DiResult;
use crate::key::{Discriminator, EntryKey};
use crate::session::Session;

/// A produced instance with its type erased; always holds an `Arc<T>`
pub type AnyInstance = Box<dyn Any + Send + Sync>;

/// Factory function as stored in the registry
pub type ErasedFactory = Arc<dyn Fn(&Session) -> DiResult<AnyInstance> + Send + Sync>;

/// Erase a typed factory so it can live in the registry
pub(crate) fn erase<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static,
{
    Arc::new(move |session: &Session| {
        factory(session).map(|instance| Box::new(instance) as AnyInstance)
    })
}

/// Exact-match registration queries; never invokes a factory
pub trait ServiceProvider {
    /// Check if a factory is registered under exactly this entry key
    fn has_service_by_entry(&self, entry: &EntryKey) -> bool;

    /// Check if `T` is registered without a discriminator
    fn has_service<T: ?Sized + 'static>(&self) -> bool
    where
        Self: Sized,
    {
        self.has_service_by_entry(&EntryKey::of::<T>(None))
    }

    /// Check if `T` is registered under `key`
    fn has_keyed_service<T: ?Sized + 'static>(&self, key: impl Into<Discriminator>) -> bool
    where
        Self: Sized,
    {
        self.has_service_by_entry(&EntryKey::of::<T>(Some(key.into())))
    }
}
