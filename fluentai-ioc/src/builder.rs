//! Container builder and its registration lifecycle
//!
//! ```text
//! Free --for_key--> KeyPending --register--> Free
//! Free --register--> Free
//! Free --finish--> Finished
//! ```
//!
//! Any other transition fails with [`DiError::InvalidBuilderState`] and leaves the builder as it
//! was.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::ContainerConfig;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::hierarchy::TypeHierarchy;
use crate::key::{Discriminator, EntryKey, TypeKey};
use crate::provider::{erase, ErasedFactory};
use crate::session::Session;

/// Lifecycle state of a [`ContainerBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Ready for a key, a registration or `finish`
    Free,
    /// A discriminator was given; the next registration consumes it
    KeyPending,
    /// The container was built; no further changes are accepted
    Finished,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderState::Free => write!(f, "Free"),
            BuilderState::KeyPending => write!(f, "KeyPending"),
            BuilderState::Finished => write!(f, "Finished"),
        }
    }
}

/// Anything registrations can be made against: the builder itself or a [`ForKey`] handle
pub trait Registrar {
    /// Discriminator the next registration will be stored under
    fn pending_key(&self) -> Option<&Discriminator>;

    /// Register an already-erased factory under `service`
    #[doc(hidden)]
    fn register_erased(&mut self, service: TypeKey, factory: ErasedFactory) -> DiResult<()>;

    /// Register `factory` as the way to produce `T` (under the pending key, if any)
    fn register<T, F>(&mut self, factory: F) -> DiResult<()>
    where
        Self: Sized,
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.register_erased(TypeKey::of::<T>(), erase(factory))
    }
}

/// Builder for constructing a service container
pub struct ContainerBuilder {
    state: BuilderState,
    pending_key: Option<Discriminator>,
    registrations: FxHashMap<EntryKey, ErasedFactory>,
    hierarchy: TypeHierarchy,
    config: ContainerConfig,
    result: Option<Container>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            state: BuilderState::Free,
            pending_key: None,
            registrations: FxHashMap::default(),
            hierarchy: TypeHierarchy::new(),
            config,
            result: None,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Number of registrations so far
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Set the discriminator for the next registration
    pub fn for_key(&mut self, key: impl Into<Discriminator>) -> DiResult<ForKey<'_>> {
        self.expect_state("set a key", &[BuilderState::Free])?;

        self.pending_key = Some(key.into());
        self.state = BuilderState::KeyPending;
        Ok(ForKey { builder: self })
    }

    /// Declare that registrations of `C` can also serve requests for `I`.
    ///
    /// `cast` is normally just `|c| c`, letting the compiler coerce `Arc<C>` to `Arc<dyn Trait>`.
    pub fn implements<C, I>(&mut self, cast: fn(Arc<C>) -> Arc<I>) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        self.expect_state(
            "declare a supertype",
            &[BuilderState::Free, BuilderState::KeyPending],
        )?;
        self.hierarchy.declare::<C, I>(cast);
        Ok(self)
    }

    /// Freeze the registrations into a [`Container`]
    pub fn finish(&mut self) -> DiResult<()> {
        self.expect_state("finish", &[BuilderState::Free])?;

        let registrations = std::mem::take(&mut self.registrations);
        let hierarchy = std::mem::take(&mut self.hierarchy);
        debug!("Finishing container with {} registrations", registrations.len());

        self.result = Some(Container::new(
            registrations,
            hierarchy,
            self.config.clone(),
        ));
        self.state = BuilderState::Finished;
        Ok(())
    }

    /// The finished container; only available after [`finish`](Self::finish)
    pub fn result(&self) -> DiResult<&Container> {
        match (&self.result, self.state) {
            (Some(container), BuilderState::Finished) => Ok(container),
            _ => Err(DiError::InvalidBuilderState {
                operation: "access the result",
                state: self.state,
            }),
        }
    }

    /// Finish and hand out the container in one step
    pub fn build(mut self) -> DiResult<Container> {
        self.finish()?;
        self.result().cloned()
    }

    fn expect_state(&self, operation: &'static str, allowed: &[BuilderState]) -> DiResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DiError::InvalidBuilderState {
                operation,
                state: self.state,
            })
        }
    }

    fn insert(&mut self, service: TypeKey, factory: ErasedFactory) -> DiResult<()> {
        self.expect_state(
            "register",
            &[BuilderState::Free, BuilderState::KeyPending],
        )?;

        let entry = EntryKey::new(service, self.pending_key.clone());
        if self.registrations.contains_key(&entry) {
            return Err(DiError::AlreadyRegistered {
                service_type: service.name(),
                key: self.pending_key.clone(),
            });
        }

        debug!("Registered {}", entry);
        self.registrations.insert(entry, factory);
        self.pending_key = None;
        self.state = BuilderState::Free;
        Ok(())
    }
}

impl Registrar for ContainerBuilder {
    fn pending_key(&self) -> Option<&Discriminator> {
        self.pending_key.as_ref()
    }

    fn register_erased(&mut self, service: TypeKey, factory: ErasedFactory) -> DiResult<()> {
        self.insert(service, factory)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("state", &self.state)
            .field("pending_key", &self.pending_key)
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// Handle returned by [`ContainerBuilder::for_key`]; the next registration uses its key
pub struct ForKey<'a> {
    builder: &'a mut ContainerBuilder,
}

impl ForKey<'_> {
    /// The discriminator pending on the builder
    pub fn key(&self) -> Option<&Discriminator> {
        self.builder.pending_key.as_ref()
    }
}

impl Registrar for ForKey<'_> {
    fn pending_key(&self) -> Option<&Discriminator> {
        self.key()
    }

    fn register_erased(&mut self, service: TypeKey, factory: ErasedFactory) -> DiResult<()> {
        self.builder.insert(service, factory)
    }
}
