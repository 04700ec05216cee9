//! Immutable container produced by the builder

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::config::ContainerConfig;
use crate::error::DiResult;
use crate::hierarchy::TypeHierarchy;
use crate::key::{Discriminator, EntryKey};
use crate::provider::{ErasedFactory, ServiceProvider};
use crate::registry::Registry;
use crate::session::Session;

/// State shared by a container and every session started from it
pub(crate) struct ContainerInner {
    pub(crate) registry: Registry,
    pub(crate) config: ContainerConfig,
    /// Entries whose factory has run at least once, when usage tracking is on
    pub(crate) usage: Option<Mutex<FxHashSet<EntryKey>>>,
}

/// Immutable, shareable service container.
///
/// Cloning is cheap and clones share the same registry. All per-resolution state lives in the
/// [`Session`]s returned by [`Container::start`].
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub(crate) fn new(
        entries: FxHashMap<EntryKey, ErasedFactory>,
        hierarchy: TypeHierarchy,
        config: ContainerConfig,
    ) -> Self {
        let usage = config.track_usage.then(|| Mutex::new(FxHashSet::default()));
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(entries, hierarchy),
                config,
                usage,
            }),
        }
    }

    /// Create a new container builder
    pub fn builder() -> crate::builder::ContainerBuilder {
        crate::builder::ContainerBuilder::new()
    }

    /// Start a new resolution session
    pub fn start(&self) -> Session {
        Session::new(self.inner.clone())
    }

    /// One-shot resolution of `T` without a discriminator, in a fresh session
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.start().resolve::<T>()
    }

    /// One-shot resolution of `T` under `key`, in a fresh session
    pub fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<Discriminator>,
    ) -> DiResult<Arc<T>> {
        self.start().resolve_keyed::<T>(key)
    }

    pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: Option<Discriminator>,
    ) -> DiResult<Arc<T>> {
        self.start().resolve_with::<T>(key)
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Registered entry keys, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = &EntryKey> {
        self.inner.registry.entries()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same finished container
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registered entries whose factory never ran, sorted by type name.
    ///
    /// Returns `None` unless the container was built with usage tracking.
    pub fn unresolved_entries(&self) -> Option<Vec<EntryKey>> {
        let usage = self.inner.usage.as_ref()?.lock();
        let mut unresolved: Vec<EntryKey> = self
            .inner
            .registry
            .entries()
            .filter(|entry| !usage.contains(*entry))
            .cloned()
            .collect();
        unresolved.sort_by_key(ToString::to_string);
        Some(unresolved)
    }
}

impl ServiceProvider for Container {
    fn has_service_by_entry(&self, entry: &EntryKey) -> bool {
        self.inner.registry.contains(entry)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("entries", &self.inner.registry.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
