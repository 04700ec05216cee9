//! Frozen registry of factories keyed by (type, discriminator)

use rustc_hash::FxHashMap;

use crate::error::{DiError, DiResult};
use crate::hierarchy::{TypeHierarchy, Upcast};
use crate::key::{Discriminator, EntryKey, TypeKey};
use crate::provider::ErasedFactory;

/// Result of looking up a request against the registry
#[derive(Clone)]
pub(crate) struct Match {
    /// Entry that will serve the request
    pub entry: EntryKey,
    pub factory: ErasedFactory,
    /// Cast from the entry's declared type to the requested one, for polymorphic matches
    pub upcast: Option<Upcast>,
}

/// Immutable map of registrations plus the declared type hierarchy
#[derive(Default)]
pub struct Registry {
    entries: FxHashMap<EntryKey, ErasedFactory>,
    hierarchy: TypeHierarchy,
}

impl Registry {
    pub(crate) fn new(
        entries: FxHashMap<EntryKey, ErasedFactory>,
        hierarchy: TypeHierarchy,
    ) -> Self {
        Self { entries, hierarchy }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &EntryKey) -> bool {
        self.entries.contains_key(entry)
    }

    /// Registered entry keys, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = &EntryKey> {
        self.entries.keys()
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Find the single entry able to serve `requested` under `key`.
    ///
    /// An exact (type, key) registration always wins. Otherwise every entry with an equal key
    /// whose declared type is assignable to `requested` is a candidate, and anything other than
    /// exactly one candidate is an error.
    pub(crate) fn find(&self, requested: TypeKey, key: Option<&Discriminator>) -> DiResult<Match> {
        let exact = EntryKey::new(requested, key.cloned());
        if let Some(factory) = self.entries.get(&exact) {
            return Ok(Match {
                entry: exact,
                factory: factory.clone(),
                upcast: None,
            });
        }

        let mut candidates = self.entries.iter().filter(|(entry, _)| {
            entry.has_key(key) && self.hierarchy.is_assignable(entry.service(), requested)
        });

        let Some((entry, factory)) = candidates.next() else {
            return Err(DiError::NotRegistered {
                service_type: requested.name(),
                key: key.cloned(),
            });
        };

        if let Some((other, _)) = candidates.next() {
            let mut names: Vec<&'static str> = [entry, other]
                .into_iter()
                .chain(candidates.map(|(entry, _)| entry))
                .map(|entry| entry.service().name())
                .collect();
            names.sort_unstable();
            return Err(DiError::Ambiguous {
                service_type: requested.name(),
                key: key.cloned(),
                candidates: names,
            });
        }

        Ok(Match {
            entry: entry.clone(),
            factory: factory.clone(),
            upcast: self.hierarchy.upcast(entry.service(), requested),
        })
    }
}
