//! Keyed dependency resolution for FluentAi
//!
//! Factories are registered against a type plus an optional discriminator, frozen into an
//! immutable [`Container`], and resolved through short-lived [`Session`]s that detect
//! circular dependencies. Requests for an interface are served by the single registration
//! declared assignable to it, and types can be auto-wired from constructor descriptors.
//!
//! ```
//! use fluentai_ioc::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.implements::<English, dyn Greeter>(|e| e)?;
//! builder.register(|_: &Session| Ok(Arc::new(English)))?;
//! builder.for_key("loud")?.register(|_: &Session| Ok(Arc::new("HELLO".to_string())))?;
//! builder.finish()?;
//!
//! let container = builder.result()?;
//! assert_eq!(container.resolve::<dyn Greeter>()?.greet(), "hello");
//! assert_eq!(container.resolve_keyed::<String>("loud")?.as_str(), "HELLO");
//! # Ok::<(), fluentai_ioc::DiError>(())
//! ```

pub mod autowire;
pub mod builder;
pub mod config;
pub mod construction;
pub mod container;
pub mod error;
pub mod extensions;
pub mod hierarchy;
pub mod key;
pub mod provider;
pub mod registry;
pub mod session;
pub mod singleton;

pub use autowire::{Args, Autowire, Constructor, ConstructorBuilder, Param};
pub use builder::{BuilderState, ContainerBuilder, ForKey, Registrar};
pub use config::ContainerConfig;
pub use construction::{ArgSpec, ConstructionSpec, ConstructionSpecBuilder};
pub use container::Container;
pub use error::{ConstructorFailure, DiError, DiResult};
pub use extensions::RegistrarExt;
pub use hierarchy::TypeHierarchy;
pub use key::{Discriminator, EntryKey, KeyValue, TypeKey};
pub use provider::ServiceProvider;
pub use registry::Registry;
pub use session::{Factory, Session};
pub use singleton::as_singleton;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        as_singleton, ArgSpec, Args, Autowire, BuilderState, ConstructionSpec, Constructor,
        Container, ContainerBuilder, ContainerConfig, DiError, DiResult, Discriminator, EntryKey,
        Factory, Registrar, RegistrarExt, ServiceProvider, Session,
    };
}
