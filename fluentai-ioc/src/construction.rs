//! Hand-authored construction specifications
//!
//! Where auto-wiring picks a constructor on its own, a [`ConstructionSpec`] fixes one: each
//! argument is either a literal value or a type to resolve through the session.

use std::fmt;
use std::sync::Arc;

use crate::autowire::{signature, Args};
use crate::error::{DiError, DiResult};
use crate::key::{Discriminator, TypeKey};
use crate::provider::AnyInstance;
use crate::session::{LazyInstance, Session};

type Invoke<T> = Arc<dyn Fn(&mut Args) -> DiResult<T> + Send + Sync>;
type LiteralValue = Arc<dyn Fn() -> AnyInstance + Send + Sync>;

/// One constructor argument
#[derive(Clone)]
pub enum ArgSpec {
    /// A fixed value handed to every invocation, never touching the session
    Literal { service: TypeKey, value: LiteralValue },
    /// A dependency resolved through the owning session
    Resolve {
        service: TypeKey,
        key: Option<Discriminator>,
    },
}

impl ArgSpec {
    /// Literal argument; each invocation receives a clone of the same `Arc`
    pub fn literal<V: Send + Sync + 'static>(value: V) -> Self {
        Self::literal_shared(Arc::new(value))
    }

    pub fn literal_shared<V: ?Sized + Send + Sync + 'static>(value: Arc<V>) -> Self {
        ArgSpec::Literal {
            service: TypeKey::of::<V>(),
            value: Arc::new(move || Box::new(value.clone()) as AnyInstance),
        }
    }

    pub fn resolve<P: ?Sized + 'static>(key: Option<Discriminator>) -> Self {
        ArgSpec::Resolve {
            service: TypeKey::of::<P>(),
            key,
        }
    }

    pub fn service(&self) -> TypeKey {
        match self {
            ArgSpec::Literal { service, .. } | ArgSpec::Resolve { service, .. } => *service,
        }
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgSpec::Literal { service, .. } => write!(f, "Literal({})", service),
            ArgSpec::Resolve { service, key: None } => write!(f, "Resolve({})", service),
            ArgSpec::Resolve {
                service,
                key: Some(key),
            } => write!(f, "Resolve({}, {})", service, key),
        }
    }
}

/// A fixed constructor plus the source of each of its arguments
pub struct ConstructionSpec<T> {
    name: &'static str,
    args: Vec<ArgSpec>,
    invoke: Invoke<T>,
}

impl<T: Send + Sync + 'static> ConstructionSpec<T> {
    pub fn builder(name: &'static str) -> ConstructionSpecBuilder<T> {
        ConstructionSpecBuilder {
            name,
            args: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn signature(&self) -> String {
        signature(self.name, self.args.iter().map(|arg| arg.service().name()))
    }

    /// Produce a `T` with this specification, resolving dependencies through `session`.
    ///
    /// Every `Resolve` argument is looked up before any argument is evaluated; a failed lookup
    /// is reported as [`DiError::ParameterNotResolved`].
    pub(crate) fn construct(
        &self,
        session: &Session,
        key: Option<&Discriminator>,
    ) -> DiResult<Arc<T>> {
        enum Source<'s> {
            Literal(LiteralValue),
            Resolved(LazyInstance<'s>),
        }

        let mut sources = Vec::with_capacity(self.args.len());
        for (index, arg) in self.args.iter().enumerate() {
            match arg {
                ArgSpec::Literal { value, .. } => sources.push(Source::Literal(value.clone())),
                ArgSpec::Resolve {
                    service,
                    key: param_key,
                } => {
                    let lazy = session.lookup(*service, param_key.as_ref()).map_err(|error| {
                        DiError::ParameterNotResolved {
                            service_type: std::any::type_name::<T>(),
                            key: key.cloned(),
                            constructor: self.signature(),
                            index,
                            parameter_type: service.name(),
                            source: Box::new(error),
                        }
                    })?;
                    sources.push(Source::Resolved(lazy));
                }
            }
        }

        let values = sources
            .iter()
            .map(|source| match source {
                Source::Literal(value) => Ok(value()),
                Source::Resolved(lazy) => lazy.call(),
            })
            .collect::<DiResult<Vec<_>>>()?;

        let mut args = Args::new(self.signature(), values);
        (self.invoke)(&mut args).map(Arc::new)
    }
}

impl<T> fmt::Debug for ConstructionSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionSpec")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

/// Builder returned by [`ConstructionSpec::builder`]
pub struct ConstructionSpecBuilder<T> {
    name: &'static str,
    args: Vec<ArgSpec>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ConstructionSpecBuilder<T> {
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn literal<V: Send + Sync + 'static>(self, value: V) -> Self {
        self.arg(ArgSpec::literal(value))
    }

    pub fn literal_shared<V: ?Sized + Send + Sync + 'static>(self, value: Arc<V>) -> Self {
        self.arg(ArgSpec::literal_shared(value))
    }

    pub fn resolve<P: ?Sized + 'static>(self) -> Self {
        self.arg(ArgSpec::resolve::<P>(None))
    }

    pub fn resolve_keyed<P: ?Sized + 'static>(self, key: impl Into<Discriminator>) -> Self {
        self.arg(ArgSpec::resolve::<P>(Some(key.into())))
    }

    pub fn build<F>(self, invoke: F) -> ConstructionSpec<T>
    where
        F: Fn(&mut Args) -> DiResult<T> + Send + Sync + 'static,
    {
        ConstructionSpec {
            name: self.name,
            args: self.args,
            invoke: Arc::new(invoke),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Endpoint {
        host: Arc<String>,
        port: Arc<u16>,
    }

    #[test]
    fn test_spec_signature_and_args() {
        let spec = ConstructionSpec::<Endpoint>::builder("Endpoint::new")
            .literal(String::from("localhost"))
            .resolve_keyed::<u16>("port")
            .build(|args| {
                Ok(Endpoint {
                    host: args.next()?,
                    port: args.next()?,
                })
            });

        assert_eq!(
            spec.signature(),
            "Endpoint::new(alloc::string::String, u16)"
        );
        assert!(matches!(spec.args()[0], ArgSpec::Literal { .. }));
        assert_eq!(format!("{:?}", spec.args()[1]), "Resolve(u16, \"port\")");
    }

    #[test]
    fn test_literal_hands_out_the_same_value() {
        let shared = Arc::new(String::from("db"));
        let arg = ArgSpec::literal_shared(shared.clone());
        let ArgSpec::Literal { value, .. } = arg else {
            panic!("expected a literal");
        };

        let first = value().downcast::<Arc<String>>().unwrap();
        let second = value().downcast::<Arc<String>>().unwrap();
        assert!(Arc::ptr_eq(&first, &shared));
        assert!(Arc::ptr_eq(&second, &shared));
    }
}
