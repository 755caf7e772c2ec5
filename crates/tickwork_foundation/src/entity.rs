//! Entity identifiers.

use std::fmt;

/// Identifier of an entity within a single world.
///
/// Ids are handed out from a monotonically increasing counter starting at 1.
/// They are never reused for the lifetime of a world, except that resetting
/// a world restarts the counter, after which previously issued ids are
/// ambiguous.
///
/// The value `0` is reserved as [`EntityId::INVALID`] and is never assigned
/// to a real entity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved "no entity" id.
    pub const INVALID: EntityId = EntityId(0);

    /// Creates an entity id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true unless this is the reserved invalid id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Returns the id following this one.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted.
    #[must_use]
    pub const fn next(self) -> Self {
        match self.0.checked_add(1) {
            Some(raw) => Self(raw),
            None => panic!("entity id space exhausted"),
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "EntityId({})", self.0)
        } else {
            write!(f, "EntityId(invalid)")
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}
