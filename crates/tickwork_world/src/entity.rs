//! Entity handles.

use std::fmt;

use tickwork_foundation::{EntityId, Result};

use crate::component::{Component, ComponentHandle};
use crate::query::ComponentSet;
use crate::world::World;

/// A non-owning reference to an entity in a [`World`].
///
/// Handles are plain values: copying one does not keep the entity alive, and
/// a handle outlives the entity it names. The world's reset epoch is carried
/// alongside the id, so a handle issued before [`World::reset`] is never
/// confused with a new entity that happens to reuse its id.
///
/// The methods on `Entity` are shorthands for the corresponding [`World`]
/// methods.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Entity {
    id: EntityId,
    generation: u32,
}

impl Entity {
    /// The null entity. It is never alive in any world.
    pub const INVALID: Entity = Entity {
        id: EntityId::INVALID,
        generation: 0,
    };

    pub(crate) const fn new(id: EntityId, generation: u32) -> Self {
        Self { id, generation }
    }

    /// Returns this entity's id.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Returns the reset epoch of the world that issued this handle.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns true if this is the null entity.
    #[must_use]
    pub const fn is_null(self) -> bool {
        !self.id.is_valid()
    }

    /// See [`World::has`].
    #[must_use]
    pub fn has<Q: ComponentSet, D: 'static>(self, world: &World<D>) -> bool {
        world.has::<Q>(self)
    }

    /// See [`World::get`].
    #[must_use]
    pub fn get<T: Component, D: 'static>(self, world: &World<D>) -> ComponentHandle<T> {
        world.get::<T>(self)
    }

    /// See [`World::with`].
    pub fn with<Q: ComponentSet, D: 'static>(
        self,
        world: &World<D>,
        f: impl FnOnce(Q::Handles),
    ) -> bool {
        world.with::<Q>(self, f)
    }

    /// See [`World::is_pending_destroy`].
    #[must_use]
    pub fn is_pending_destroy<D: 'static>(self, world: &World<D>) -> bool {
        world.is_pending_destroy(self)
    }

    /// See [`World::assign`].
    ///
    /// # Errors
    ///
    /// Returns an error if this entity is not alive in `world`.
    pub fn assign<T: Component, D: 'static>(
        self,
        world: &mut World<D>,
        value: T,
    ) -> Result<ComponentHandle<T>> {
        world.assign(self, value)
    }

    /// See [`World::remove`].
    pub fn remove<T: Component, D: 'static>(self, world: &mut World<D>) -> bool {
        world.remove::<T>(self)
    }

    /// See [`World::remove_all`].
    pub fn remove_all<D: 'static>(self, world: &mut World<D>) -> usize {
        world.remove_all(self)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id.raw(), self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
