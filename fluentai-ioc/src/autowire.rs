//! Auto-wiring from explicit constructor descriptors
//!
//! A type opts in by implementing [`Autowire`] and listing its constructors. At resolution time
//! the constructors are tried greediest first: the first one whose parameters all resolve
//! through the session is invoked. Lookups that fail are remembered per constructor and only
//! reported, together, when no constructor fits.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConstructorFailure, DiError, DiResult};
use crate::key::{Discriminator, TypeKey};
use crate::provider::AnyInstance;
use crate::session::{LazyInstance, Session};

type Invoke<T> = Arc<dyn Fn(&mut Args) -> DiResult<T> + Send + Sync>;

/// Types that describe how the container may construct them
pub trait Autowire: Sized + Send + Sync + 'static {
    /// Every constructor the container may use, in any order
    fn constructors() -> Vec<Constructor<Self>>;
}

/// A constructor parameter: the type to resolve and the key to resolve it under
#[derive(Clone)]
pub struct Param {
    service: TypeKey,
    key: Option<Discriminator>,
}

impl Param {
    pub fn service(&self) -> TypeKey {
        self.service
    }

    pub fn key(&self) -> Option<&Discriminator> {
        self.key.as_ref()
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.service, key),
            None => write!(f, "{}", self.service),
        }
    }
}

/// One way of building a `T`
pub struct Constructor<T> {
    name: &'static str,
    params: Vec<Param>,
    invoke: Invoke<T>,
}

impl<T: 'static> Constructor<T> {
    /// Start describing a constructor called `name`
    pub fn builder(name: &'static str) -> ConstructorBuilder<T> {
        ConstructorBuilder {
            name,
            params: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `name(TypeA, TypeB)`, used in diagnostics
    pub fn signature(&self) -> String {
        signature(self.name, self.params.iter().map(|p| p.service.name()))
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Builder returned by [`Constructor::builder`]
pub struct ConstructorBuilder<T> {
    name: &'static str,
    params: Vec<Param>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: 'static> ConstructorBuilder<T> {
    /// Next parameter, resolved without a discriminator
    pub fn param<P: ?Sized + 'static>(mut self) -> Self {
        self.params.push(Param {
            service: TypeKey::of::<P>(),
            key: None,
        });
        self
    }

    /// Next parameter, resolved under `key`
    pub fn param_keyed<P: ?Sized + 'static>(mut self, key: impl Into<Discriminator>) -> Self {
        self.params.push(Param {
            service: TypeKey::of::<P>(),
            key: Some(key.into()),
        });
        self
    }

    /// Finish with the function that builds `T` from the resolved arguments
    pub fn build<F>(self, invoke: F) -> Constructor<T>
    where
        F: Fn(&mut Args) -> DiResult<T> + Send + Sync + 'static,
    {
        Constructor {
            name: self.name,
            params: self.params,
            invoke: Arc::new(invoke),
        }
    }
}

/// Resolved constructor arguments, consumed in parameter order
pub struct Args {
    constructor: String,
    values: std::vec::IntoIter<AnyInstance>,
    index: usize,
}

impl Args {
    pub(crate) fn new(constructor: String, values: Vec<AnyInstance>) -> Self {
        Self {
            constructor,
            values: values.into_iter(),
            index: 0,
        }
    }

    /// Take the next argument as an `Arc<P>`
    pub fn next<P: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<P>> {
        let index = self.index;
        self.index += 1;

        let mismatch = || DiError::ArgumentMismatch {
            constructor: self.constructor.clone(),
            index,
            expected: std::any::type_name::<P>(),
        };

        let value = self.values.next().ok_or_else(mismatch)?;
        value
            .downcast::<Arc<P>>()
            .map(|typed| *typed)
            .map_err(|_| mismatch())
    }

    /// Arguments not yet taken
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

pub(crate) fn signature<'a>(name: &str, params: impl Iterator<Item = &'a str>) -> String {
    format!("{}({})", name, params.collect::<Vec<_>>().join(", "))
}

/// Build the resolution-time factory for `T` from its constructor list.
///
/// Fails immediately when `T` describes no constructor at all.
pub(crate) fn autowired<T: Autowire>(
    key: Option<Discriminator>,
) -> DiResult<impl Fn(&Session) -> DiResult<Arc<T>> + Send + Sync + 'static> {
    let mut constructors = T::constructors();
    if constructors.is_empty() {
        return Err(DiError::NoConstructors {
            service_type: std::any::type_name::<T>(),
            key,
        });
    }

    // Stable sort: equal arities keep their declaration order.
    constructors.sort_by(|a, b| b.arity().cmp(&a.arity()));
    let constructors = Arc::new(constructors);

    Ok(move |session: &Session| select_and_build(session, &constructors, key.as_ref()))
}

fn select_and_build<T: Autowire>(
    session: &Session,
    constructors: &[Constructor<T>],
    key: Option<&Discriminator>,
) -> DiResult<Arc<T>> {
    let sole = constructors.len() == 1;
    let mut failures = Vec::new();

    'constructors: for constructor in constructors {
        let mut lazies: Vec<LazyInstance<'_>> = Vec::with_capacity(constructor.arity());

        for (index, param) in constructor.params.iter().enumerate() {
            match session.lookup(param.service, param.key.as_ref()) {
                Ok(lazy) => lazies.push(lazy),
                Err(error) if sole => {
                    return Err(DiError::ParameterNotResolved {
                        service_type: std::any::type_name::<T>(),
                        key: key.cloned(),
                        constructor: constructor.signature(),
                        index,
                        parameter_type: param.service.name(),
                        source: Box::new(error),
                    });
                }
                Err(error) => {
                    debug!(
                        "Skipping {}: parameter {} unresolved: {}",
                        constructor.signature(),
                        index,
                        error
                    );
                    failures.push(ConstructorFailure {
                        constructor: constructor.signature(),
                        error,
                    });
                    continue 'constructors;
                }
            }
        }

        let values = lazies
            .iter()
            .map(LazyInstance::call)
            .collect::<DiResult<Vec<_>>>()?;
        let mut args = Args::new(constructor.signature(), values);
        return (constructor.invoke)(&mut args).map(Arc::new);
    }

    Err(DiError::NoAppropriateConstructor {
        service_type: std::any::type_name::<T>(),
        key: key.cloned(),
        failures,
    })
}
