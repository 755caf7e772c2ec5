//! Runtime type identity.
//!
//! Per-type storage and dispatch tables are keyed by [`TypeKey`]. Two
//! interchangeable strategies produce keys:
//!
//! - [`NativeTypeKeys`] derives the key from [`TypeId`].
//! - [`CountedTypeKeys`] hands out a small integer from a process-wide,
//!   monotonically increasing counter the first time a type is seen.
//!
//! The rest of the workspace only ever calls [`type_key_of`], which uses
//! [`ActiveTypeKeys`]. Enabling the `counted-type-keys` feature switches the
//! active strategy.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use parking_lot::RwLock;

/// Stable, hashable, totally ordered identity of a type.
///
/// Two keys produced for the same type by the same strategy compare equal;
/// keys of distinct types differ.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Repr);

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
enum Repr {
    Native(TypeId),
    Counted(u32),
}

impl TypeKey {
    /// Returns the key of `T` under the active strategy.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        type_key_of::<T>()
    }

    /// Returns the registration index if this key came from [`CountedTypeKeys`].
    #[must_use]
    pub fn counted_index(self) -> Option<u32> {
        match self.0 {
            Repr::Counted(index) => Some(index),
            Repr::Native(_) => None,
        }
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Native(id) => write!(f, "TypeKey({id:?})"),
            Repr::Counted(index) => write!(f, "TypeKey(#{index})"),
        }
    }
}

/// A way of mapping types to [`TypeKey`]s.
pub trait TypeKeyStrategy {
    /// Returns the key for `T`, registering it first if the strategy needs to.
    fn key_of<T: ?Sized + 'static>() -> TypeKey;
}

/// Keys derived directly from [`TypeId`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTypeKeys;

impl TypeKeyStrategy for NativeTypeKeys {
    fn key_of<T: ?Sized + 'static>() -> TypeKey {
        TypeKey(Repr::Native(TypeId::of::<T>()))
    }
}

/// Keys handed out by a process-wide registration counter.
///
/// Indices start at 1 and are assigned in first-use order. A type keeps its
/// index for the life of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountedTypeKeys;

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, u32>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl CountedTypeKeys {
    /// Returns how many types have been registered so far.
    #[must_use]
    pub fn registered_count() -> usize {
        REGISTRY.read().len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn register(id: TypeId) -> u32 {
        if let Some(&index) = REGISTRY.read().get(&id) {
            return index;
        }

        let mut registry = REGISTRY.write();
        let next = registry.len() as u32 + 1;
        // Another thread may have registered the type between the two locks.
        *registry.entry(id).or_insert(next)
    }
}

impl TypeKeyStrategy for CountedTypeKeys {
    fn key_of<T: ?Sized + 'static>() -> TypeKey {
        TypeKey(Repr::Counted(Self::register(TypeId::of::<T>())))
    }
}

/// The strategy used by [`type_key_of`].
#[cfg(not(feature = "counted-type-keys"))]
pub type ActiveTypeKeys = NativeTypeKeys;

/// The strategy used by [`type_key_of`].
#[cfg(feature = "counted-type-keys")]
pub type ActiveTypeKeys = CountedTypeKeys;

/// Returns the key for `T` under [`ActiveTypeKeys`].
#[must_use]
pub fn type_key_of<T: ?Sized + 'static>() -> TypeKey {
    ActiveTypeKeys::key_of::<T>()
}
