//! Declared assignability between concrete types and their supertypes

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::provider::AnyInstance;

/// Converts an erased `Arc<C>` into an erased `Arc<I>`
pub(crate) type Upcast = Arc<dyn Fn(AnyInstance) -> DiResult<AnyInstance> + Send + Sync>;

/// Table of "values of C may be handed out as I" relations.
///
/// Rust has no runtime subtyping, so every relation is declared with the cast that performs it.
/// Relations are not transitive.
#[derive(Clone, Default)]
pub struct TypeHierarchy {
    supertypes: FxHashMap<TypeKey, FxHashMap<TypeKey, Upcast>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `C` can be viewed as `I` through `cast`
    pub fn declare<C, I>(&mut self, cast: fn(Arc<C>) -> Arc<I>)
    where
        C: ?Sized + Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        let from = TypeKey::of::<C>();
        let to = TypeKey::of::<I>();
        let upcast: Upcast = Arc::new(move |instance: AnyInstance| {
            instance
                .downcast::<Arc<C>>()
                .map(|concrete| Box::new(cast(*concrete)) as AnyInstance)
                .map_err(|_| DiError::ArgumentMismatch {
                    constructor: format!("upcast to {}", to),
                    index: 0,
                    expected: from.name(),
                })
        });

        debug!("Declared {} as assignable to {}", from, to);
        self.supertypes.entry(from).or_default().insert(to, upcast);
    }

    /// Whether a registration declared as `from` satisfies a request for `to`
    pub fn is_assignable(&self, from: TypeKey, to: TypeKey) -> bool {
        from == to
            || self
                .supertypes
                .get(&from)
                .map_or(false, |targets| targets.contains_key(&to))
    }

    /// Supertypes declared for `from`
    pub fn supertypes_of(&self, from: TypeKey) -> Vec<TypeKey> {
        self.supertypes
            .get(&from)
            .map(|targets| targets.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn upcast(&self, from: TypeKey, to: TypeKey) -> Option<Upcast> {
        self.supertypes.get(&from)?.get(&to).cloned()
    }
}
