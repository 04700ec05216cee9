//! Registration identities: type keys, discriminators and entry keys

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use downcast_rs::{impl_downcast, Downcast};

/// Identity of a requested or declared type, interfaces (`dyn Trait`) included
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Type key for `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Values usable as a discriminator.
///
/// Implemented for every `Eq + Hash + Debug + Send + Sync + 'static` type; equality never holds
/// across different concrete types.
pub trait KeyValue: Downcast + fmt::Debug + Send + Sync {
    /// Value equality against another, possibly differently typed, key
    fn eq_key(&self, other: &dyn KeyValue) -> bool;

    /// Hash consistent with [`KeyValue::eq_key`]
    fn hash_key(&self, state: &mut dyn Hasher);
}

impl_downcast!(KeyValue);

impl<T> KeyValue for T
where
    T: Any + Eq + Hash + fmt::Debug + Send + Sync,
{
    fn eq_key(&self, other: &dyn KeyValue) -> bool {
        other.downcast_ref::<T>().map_or(false, |other| self == other)
    }

    fn hash_key(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Optional qualifier distinguishing registrations of related types
#[derive(Clone)]
pub struct Discriminator(Arc<dyn KeyValue>);

impl Discriminator {
    /// Wrap any hashable value as a discriminator
    pub fn new<V: KeyValue>(value: V) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value if it has type `V`
    pub fn downcast_ref<V: KeyValue>(&self) -> Option<&V> {
        self.0.downcast_ref::<V>()
    }
}

impl PartialEq for Discriminator {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_key(&*other.0)
    }
}

impl Eq for Discriminator {}

impl Hash for Discriminator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_key(state);
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// String slices are normalized so that "foo" and String::from("foo") name the same entry.
impl From<&str> for Discriminator {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

macro_rules! discriminator_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Discriminator {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

discriminator_from!(String, char, bool, i32, i64, u32, u64, usize);

/// Composite identity of a registration: declared type plus optional discriminator
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    service: TypeKey,
    key: Option<Discriminator>,
}

impl EntryKey {
    pub fn new(service: TypeKey, key: Option<Discriminator>) -> Self {
        Self { service, key }
    }

    /// Entry key for `T` under `key`
    pub fn of<T: ?Sized + 'static>(key: Option<Discriminator>) -> Self {
        Self::new(TypeKey::of::<T>(), key)
    }

    /// Declared type of the registration
    pub fn service(&self) -> TypeKey {
        self.service
    }

    pub fn key(&self) -> Option<&Discriminator> {
        self.key.as_ref()
    }

    /// Whether this entry was registered under exactly `key` (`None` only matches `None`)
    pub fn has_key(&self, key: Option<&Discriminator>) -> bool {
        self.key.as_ref() == key
    }
}

impl fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "EntryKey {{Type: {}, Key: {}}}", self.service, key),
            None => write!(f, "EntryKey {{Type: {}}}", self.service),
        }
    }
}
